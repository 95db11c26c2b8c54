//! C++ emission: scope-tree walk, fragment collection, struct and
//! function rendering, multiframe state machines.

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::EmitError;
use crate::ast::{Ast, LitValue, NodeId, NodeKind};
use crate::env::Env;
use crate::multiframe::{self, CfgKind, CfgNodeId, LoweredMultiframe};
use crate::symbols::{DataType, OverloadId, ScopeId, SymbolId, SymbolKind, SymbolTable};

use super::deps::{Fragment, named_deps, sort_fragments};
use super::snippet::CppSnippet;

/// Includes requested on the command line.
#[derive(Clone, Debug, Default)]
pub struct Prologue {
    pub system_includes: Vec<String>,
    pub local_includes: Vec<String>,
}

/// Emit the whole environment as one C++ translation unit. `roots` are
/// the parsed per-source top-level blocks; their executable statements
/// (everything that is not a declaration) end up in a
/// `cels_static_init` function after the declarations.
pub fn emit_env(
    env: &Env,
    ast: &mut Ast,
    roots: &[NodeId],
    prologue: &Prologue,
) -> Result<String, EmitError> {
    let mut emitter = CppEmitter::new(env);
    let mut fragments = Vec::new();
    emitter.collect_scope(ast, env.table.root(), &Vec::new(), &mut fragments)?;

    let init = emitter.emit_static_init(ast, roots)?;
    let mut ordered = sort_fragments(&env.table, fragments)?;
    if let Some(init) = init {
        ordered.push(init);
    }

    let mut headers: IndexSet<String> = IndexSet::new();
    headers.insert("<Celesta>".to_owned());
    for include in &prologue.system_includes {
        headers.insert(format!("<{include}>"));
    }
    for include in &prologue.local_includes {
        headers.insert(format!("\"{include}\""));
    }
    for header in &emitter.required_headers {
        headers.insert(header.clone());
    }
    for fragment in &ordered {
        for header in fragment.code.headers() {
            headers.insert(normalize_header(header));
        }
    }

    let mut out = String::new();
    for header in headers {
        out.push_str(&format!("#include {header}\n"));
    }
    out.push('\n');
    out.push_str(&assemble(&ordered));
    Ok(out)
}

fn normalize_header(header: &str) -> String {
    if header.starts_with('<') || header.starts_with('"') {
        header.to_owned()
    } else {
        format!("\"{header}\"")
    }
}

/// Concatenate ordered fragments, merging runs that share a namespace.
fn assemble(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < fragments.len() {
        let namespace = &fragments[i].namespace;
        let mut body = CppSnippet::new();
        let mut j = i;
        while j < fragments.len() && &fragments[j].namespace == namespace {
            body.push_snippet(fragments[j].code.clone());
            j += 1;
        }
        if namespace.is_empty() {
            out.push_str(body.code());
        } else {
            let mut wrapped = body;
            for level in namespace.iter().rev() {
                let mut outer = CppSnippet::text(format!("namespace {level}\n{{\n"));
                outer.push_snippet(wrapped.indented());
                outer.push("}\n");
                wrapped = outer;
            }
            out.push_str(wrapped.code());
        }
        i = j;
    }
    out
}

struct CppEmitter<'a> {
    env: &'a Env,
    table: &'a SymbolTable,
    /// emission-time symbol spellings: locals, frame slots
    names: HashMap<SymbolId, String>,
    required_headers: IndexSet<String>,
}

/// Per-multiframe-overload emission state.
struct FrameCtx {
    struct_name: String,
    /// hoisted local declarations
    locals: Vec<String>,
    /// frame members to detach in `f_cleanup`
    task_slots: Vec<String>,
}

impl<'a> CppEmitter<'a> {
    fn new(env: &'a Env) -> Self {
        Self {
            env,
            table: &env.table,
            names: HashMap::new(),
            required_headers: IndexSet::new(),
        }
    }

    // --- fragment collection --------------------------------------------

    /// Top-level executable statements, wrapped into one init function.
    fn emit_static_init(
        &mut self,
        ast: &Ast,
        roots: &[NodeId],
    ) -> Result<Option<Fragment>, EmitError> {
        let mut body = CppSnippet::new();
        for &root in roots {
            for child in ast.children(root) {
                match &ast.node(child).kind {
                    NodeKind::FuncDecl { .. }
                    | NodeKind::StructDecl { .. }
                    | NodeKind::FieldDecl { .. }
                    | NodeKind::VDecl { .. }
                    | NodeKind::Package { .. } => {}
                    NodeKind::Block { children, .. } if children.is_empty() => {}
                    _ => body.push_snippet(self.emit_stmt(ast, child)?),
                }
            }
        }
        if body.code().is_empty() {
            return Ok(None);
        }
        let mut code = CppSnippet::text("inline void cels_static_init()\n{\n".to_owned());
        code.push_snippet(body.indented());
        code.push("}\n");
        Ok(Some(Fragment {
            provides: None,
            namespace: Vec::new(),
            code,
            deps: IndexSet::new(),
        }))
    }

    fn collect_scope(
        &mut self,
        ast: &mut Ast,
        scope: ScopeId,
        namespace: &[String],
        fragments: &mut Vec<Fragment>,
    ) -> Result<(), EmitError> {
        for symbol in self.table.symbols_by_sid(scope) {
            match &self.table.symbol(symbol).kind {
                SymbolKind::Primitive => {}
                SymbolKind::Struct { .. } => {
                    fragments.push(self.struct_fragment(ast, symbol, namespace)?);
                }
                SymbolKind::Function {
                    declaring: None,
                    overloads,
                } => {
                    for &overload in overloads.clone().iter() {
                        fragments.push(self.overload_fragment(ast, overload, namespace)?);
                    }
                }
                SymbolKind::Function { .. } => {} // methods live in their struct
                SymbolKind::Variable { ty } => {
                    let ty = ty.clone();
                    let mut deps = IndexSet::new();
                    named_deps(&ty, &mut deps);
                    let code = CppSnippet::text(format!(
                        "{} {};\n",
                        self.cpp_type(&ty),
                        self.table.symbol(symbol).name
                    ));
                    fragments.push(Fragment {
                        provides: Some(symbol),
                        namespace: namespace.to_vec(),
                        code,
                        deps,
                    });
                }
                SymbolKind::Param { .. } | SymbolKind::Field { .. } => {}
            }
        }

        for child in self.table.scope(scope).children.clone() {
            if self.table.scope(child).is_package {
                let mut inner = namespace.to_vec();
                inner.push(self.table.scope(child).name.clone());
                self.collect_scope(ast, child, &inner, fragments)?;
            }
        }
        Ok(())
    }

    fn struct_fragment(
        &mut self,
        ast: &mut Ast,
        symbol: SymbolId,
        namespace: &[String],
    ) -> Result<Fragment, EmitError> {
        let SymbolKind::Struct { members, .. } = &self.table.symbol(symbol).kind else {
            unreachable!("caller matched a struct");
        };
        let members = members.clone();
        let name = self.table.symbol(symbol).name.clone();

        let mut deps = IndexSet::new();
        let mut inner = CppSnippet::new();
        for member in members {
            match &self.table.symbol(member).kind {
                SymbolKind::Field { ty, .. } => {
                    let ty = ty.clone();
                    named_deps(&ty, &mut deps);
                    inner.push(&format!(
                        "{} {};\n",
                        self.cpp_type(&ty),
                        self.table.symbol(member).name
                    ));
                }
                SymbolKind::Function { overloads, .. } => {
                    for &overload in overloads.clone().iter() {
                        self.overload_signature_deps(overload, &mut deps);
                        inner.push_snippet(self.emit_overload(ast, overload)?);
                    }
                }
                _ => {}
            }
        }
        deps.shift_remove(&symbol);

        let mut code = CppSnippet::text(format!("struct {name}\n{{\n"));
        code.push_snippet(inner.indented());
        code.push("};\n\n");

        Ok(Fragment {
            provides: Some(symbol),
            namespace: namespace.to_vec(),
            code,
            deps,
        })
    }

    fn overload_fragment(
        &mut self,
        ast: &mut Ast,
        overload: OverloadId,
        namespace: &[String],
    ) -> Result<Fragment, EmitError> {
        let mut deps = IndexSet::new();
        self.overload_signature_deps(overload, &mut deps);
        let code = self.emit_overload(ast, overload)?;
        Ok(Fragment {
            provides: Some(self.table.overload(overload).function),
            namespace: namespace.to_vec(),
            code,
            deps,
        })
    }

    fn overload_signature_deps(&self, overload: OverloadId, deps: &mut IndexSet<SymbolId>) {
        let data = self.table.overload(overload);
        named_deps(&data.return_type, deps);
        for &param in &data.params {
            if let Some(ty) = self.table.symbol(param).data_type() {
                named_deps(ty, deps);
            }
        }
    }

    // --- plain functions ------------------------------------------------

    fn emit_overload(
        &mut self,
        ast: &mut Ast,
        overload: OverloadId,
    ) -> Result<CppSnippet, EmitError> {
        let data = self.table.overload(overload);
        if data.is_multiframe {
            if data.is_extern {
                // the host supplies the activation-record struct; only
                // the requested header survives
                let mut snippet = CppSnippet::new();
                if let Some(header) = data.cpp_include.clone() {
                    snippet.require(header);
                }
                return Ok(snippet);
            }
            return self.emit_multiframe(ast, overload);
        }

        let function = data.function;
        let is_method = matches!(
            self.table.symbol(function).kind,
            SymbolKind::Function {
                declaring: Some(_),
                ..
            }
        );
        let params = data.params.clone();
        let return_type = data.return_type.clone();
        let implementation = data.implementation;
        let cpp_include = data.cpp_include.clone();

        let mut snippet = CppSnippet::new();
        if let Some(header) = cpp_include {
            snippet.require(header);
        }

        let visible_params = if is_method { &params[1..] } else { &params[..] };
        // the hidden `this` keeps its own spelling
        for &param in &params {
            let name = self.table.symbol(param).name.clone();
            self.names.insert(param, name);
        }

        let mut header = format!(
            "{} {}(",
            self.cpp_type(&return_type),
            self.table.symbol(function).name
        );
        for (i, &param) in visible_params.iter().enumerate() {
            if i > 0 {
                header.push_str(", ");
            }
            let ty = self
                .table
                .symbol(param)
                .data_type()
                .cloned()
                .ok_or_else(|| EmitError::Internal("parameter without a type".to_owned()))?;
            header.push_str(&format!("{} {}", self.cpp_type(&ty), self.table.symbol(param).name));
        }
        header.push(')');
        snippet.push(&header);

        match implementation {
            Some(body) => {
                snippet.push("\n");
                let rendered = self.emit_stmt(ast, body)?;
                snippet.push_snippet(rendered);
            }
            None => snippet.push(";\n"),
        }
        snippet.push("\n");
        Ok(snippet)
    }

    // --- multiframe state machines --------------------------------------

    fn emit_multiframe(
        &mut self,
        ast: &mut Ast,
        overload: OverloadId,
    ) -> Result<CppSnippet, EmitError> {
        let data = self.table.overload(overload);
        let struct_name = self.table.symbol(data.function).name.clone();
        let params = data.params.clone();
        let return_type = data.return_type.clone();

        let lowered = multiframe::lower_overload(self.table, ast, overload)?;

        let mut inner = CppSnippet::new();

        if !params.is_empty() {
            inner.push("struct\n{\n");
            let mut fields = CppSnippet::new();
            for &param in &params {
                let name = self.table.symbol(param).name.clone();
                let ty = self
                    .table
                    .symbol(param)
                    .data_type()
                    .cloned()
                    .ok_or_else(|| EmitError::Internal("parameter without a type".to_owned()))?;
                fields.push(&format!("{} {};\n", self.cpp_type(&ty), name));
                self.names.insert(param, format!("ctx->params.{name}"));
            }
            inner.push_snippet(fields.indented());
            inner.push("} params;\n");
        }

        if return_type != self.env.dtype_void() {
            inner.push(&format!("{} return_value;\n", self.cpp_type(&return_type)));
        }

        let mut frame = FrameCtx {
            struct_name: struct_name.clone(),
            locals: Vec::new(),
            task_slots: Vec::new(),
        };

        let mut component_code = CppSnippet::new();
        for component in &lowered.components {
            component_code.push_snippet(self.emit_component(
                ast,
                &lowered,
                component.id,
                component.head,
                &mut frame,
            )?);
        }

        for local in &frame.locals {
            inner.push(local);
        }
        inner.push("\n");
        inner.push_snippet(component_code);
        inner.push_snippet(self.emit_cleanup(&frame));

        let mut snippet = CppSnippet::text(format!("struct {struct_name}\n{{\n"));
        snippet.push_snippet(inner.indented());
        snippet.push("};\n\n");
        Ok(snippet)
    }

    fn emit_component(
        &mut self,
        ast: &Ast,
        lowered: &LoweredMultiframe,
        id: u32,
        head: CfgNodeId,
        frame: &mut FrameCtx,
    ) -> Result<CppSnippet, EmitError> {
        let mut body = CppSnippet::new();
        body.push(&format!(
            "auto* ctx = ({}*)_ctx;\n",
            frame.struct_name
        ));
        body.push(&format!("goto L_{};\n", head.0));

        for node_id in lowered.cfg.reachable_from(head) {
            let node = lowered.cfg.node(node_id);
            body.push(&format!("L_{}:\n", node_id.0));
            match node.kind {
                CfgKind::Cond => {
                    let ast_id = node.ast.ok_or_else(|| {
                        EmitError::Internal("conditional node without an expression".to_owned())
                    })?;
                    let condition = self.emit_expr(ast, ast_id)?;
                    body.push(&format!(
                        "if ({}) goto L_{}; else goto L_{};\n",
                        condition, node.next[1].0, node.next[0].0
                    ));
                }
                CfgKind::Instr => {
                    if let Some(ast_id) = node.ast {
                        let rendered = self.emit_frame_stmt(ast, ast_id, frame)?;
                        body.push_snippet(rendered);
                    }
                    match node.next.first() {
                        Some(next) => body.push(&format!("goto L_{};\n", next.0)),
                        None => body.push("return;\n"),
                    }
                }
                CfgKind::Jump => {
                    let target = node.component.ok_or_else(|| {
                        EmitError::Internal("jump node without a component".to_owned())
                    })?;
                    body.push(&format!(
                        "ctrl->jump(ctx, {}::f{}); return;\n",
                        frame.struct_name, target
                    ));
                }
                CfgKind::End => {
                    body.push("f_cleanup(_ctx, ctrl);\n");
                    body.push("ctrl->ret(); return;\n");
                }
            }
        }

        let mut snippet = CppSnippet::text(format!(
            "inline static void f{id}(void* _ctx, Celesta::ExecutionController* ctrl)\n{{\n"
        ));
        snippet.push_snippet(body.indented());
        snippet.push("}\n\n");
        Ok(snippet)
    }

    fn emit_cleanup(&mut self, frame: &FrameCtx) -> CppSnippet {
        let mut body = CppSnippet::new();
        if !frame.task_slots.is_empty() {
            body.push(&format!("auto* ctx = ({}*)_ctx;\n", frame.struct_name));
            for slot in &frame.task_slots {
                body.push(&format!("ctx->{slot}.detach();\n"));
            }
        }
        let mut snippet = CppSnippet::text(
            "inline static void f_cleanup(void* _ctx, Celesta::ExecutionController*)\n{\n"
                .to_owned(),
        );
        snippet.push_snippet(body.indented());
        snippet.push("}\n");
        snippet
    }

    /// A statement inside a multiframe component: frame locals are
    /// hoisted, suspension and call halves expand to controller calls,
    /// returns write the frame's `return_value`.
    fn emit_frame_stmt(
        &mut self,
        ast: &Ast,
        id: NodeId,
        frame: &mut FrameCtx,
    ) -> Result<CppSnippet, EmitError> {
        match &ast.node(id).kind {
            NodeKind::Block { children, .. } => {
                let mut out = CppSnippet::new();
                for child in children.clone() {
                    out.push_snippet(self.emit_frame_stmt(ast, child, frame)?);
                }
                Ok(out)
            }
            NodeKind::VDecl { variable } => {
                let variable = *variable;
                let name = self.table.symbol(variable).name.clone();
                let ty = self
                    .table
                    .symbol(variable)
                    .data_type()
                    .cloned()
                    .ok_or_else(|| EmitError::Internal("variable without a type".to_owned()))?;
                if let DataType::Task(inner) = &ty {
                    frame
                        .locals
                        .push(format!("Celesta::TaskData<{}> {};\n", self.cpp_type(inner), name));
                    frame.task_slots.push(name.clone());
                } else {
                    frame
                        .locals
                        .push(format!("{} {};\n", self.cpp_type(&ty), name));
                }
                self.names.insert(variable, format!("ctx->{name}"));
                Ok(CppSnippet::new())
            }
            NodeKind::Suspend => Ok(CppSnippet::text("ctrl->suspend();\n")),
            NodeKind::Return { value } => {
                let mut out = CppSnippet::new();
                if let Some(value) = *value {
                    let rendered = self.emit_expr(ast, value)?;
                    out.push(&format!("ctx->return_value = {rendered};\n"));
                }
                out.push("f_cleanup(_ctx, ctrl);\n");
                out.push("ctrl->ret(); return;\n");
                Ok(out)
            }
            NodeKind::PreCall { call, jump, .. } => {
                let (call, jump) = (*call, *jump);
                let jump = jump.ok_or_else(|| {
                    EmitError::Internal("unassigned multiframe call jump".to_owned())
                })?;
                let NodeKind::Call { overload, args, .. } = &ast.node(call).kind else {
                    return Err(EmitError::Internal(
                        "pre-call without a call expression".to_owned(),
                    ));
                };
                let (overload, args) = (*overload, args.clone());
                let callee = self.qualified_name(self.table.overload(overload).function);
                let callee_params = self.table.overload(overload).params.clone();

                let mut out = CppSnippet::text("{\n".to_owned());
                let mut inner = CppSnippet::new();
                inner.push(&format!("auto* f = ctrl->push<{callee}>();\n"));
                for (&param, &arg) in callee_params.iter().zip(args.iter()) {
                    let value = self.emit_expr(ast, arg)?;
                    inner.push(&format!(
                        "f->params.{} = {};\n",
                        self.table.symbol(param).name,
                        value
                    ));
                }
                inner.push(&format!(
                    "ctrl->call(f, {}::f0, ctx, {}::f{});\n",
                    callee, frame.struct_name, jump
                ));
                inner.push("return;\n");
                out.push_snippet(inner.indented());
                out.push("}\n");
                Ok(out)
            }
            NodeKind::PostCall { call, lhs } => {
                let (call, lhs) = (*call, *lhs);
                let NodeKind::Call { overload, .. } = &ast.node(call).kind else {
                    return Err(EmitError::Internal(
                        "post-call without a call expression".to_owned(),
                    ));
                };
                let callee = self.qualified_name(self.table.overload(*overload).function);

                let mut out = CppSnippet::new();
                if let Some(lhs) = lhs {
                    out.push("{\n");
                    let mut inner = CppSnippet::new();
                    inner.push(&format!("auto* f = ctrl->peek<{callee}>();\n"));
                    let target = self.emit_expr(ast, lhs)?;
                    inner.push(&format!("{target} = f->return_value;\n"));
                    out.push_snippet(inner.indented());
                    out.push("}\n");
                }
                out.push("ctrl->pop();\n");
                Ok(out)
            }
            _ => self.emit_stmt(ast, id),
        }
    }

    // --- ordinary statements and expressions ----------------------------

    fn emit_stmt(&mut self, ast: &Ast, id: NodeId) -> Result<CppSnippet, EmitError> {
        match &ast.node(id).kind {
            NodeKind::Block { children, .. } => {
                let mut inner = CppSnippet::new();
                for child in children.clone() {
                    inner.push_snippet(self.emit_stmt(ast, child)?);
                }
                let mut out = CppSnippet::text("{\n".to_owned());
                out.push_snippet(inner.indented());
                out.push("}\n");
                Ok(out)
            }
            NodeKind::VDecl { variable } => {
                let variable = *variable;
                let name = self.table.symbol(variable).name.clone();
                let ty = self
                    .table
                    .symbol(variable)
                    .data_type()
                    .cloned()
                    .ok_or_else(|| EmitError::Internal("variable without a type".to_owned()))?;
                self.names.insert(variable, name.clone());
                Ok(CppSnippet::text(format!("{} {};\n", self.cpp_type(&ty), name)))
            }
            NodeKind::Assign { left, right } => {
                let left = self.emit_expr(ast, *left)?;
                let right = self.emit_expr(ast, *right)?;
                Ok(CppSnippet::text(format!("{left} = {right};\n")))
            }
            NodeKind::Return { value } => match *value {
                Some(value) => {
                    let rendered = self.emit_expr(ast, value)?;
                    Ok(CppSnippet::text(format!("return {rendered};\n")))
                }
                None => Ok(CppSnippet::text("return;\n".to_owned())),
            },
            NodeKind::While { condition, body } => {
                let condition = self.emit_expr(ast, *condition)?;
                let body = self.emit_stmt(ast, *body)?;
                let mut out = CppSnippet::text(format!("while ({condition})\n"));
                out.push_snippet(body);
                Ok(out)
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.emit_expr(ast, *condition)?;
                let then_code = self.emit_stmt(ast, *then_branch)?;
                let mut out = CppSnippet::text(format!("if ({condition})\n"));
                out.push_snippet(then_code);
                if let Some(else_branch) = *else_branch {
                    out.push("else\n");
                    out.push_snippet(self.emit_stmt(ast, else_branch)?);
                }
                Ok(out)
            }
            NodeKind::Break => Ok(CppSnippet::text("break;\n".to_owned())),
            NodeKind::Continue => Ok(CppSnippet::text("continue;\n".to_owned())),
            NodeKind::Suspend => Err(EmitError::Internal(
                "suspend outside a multiframe function".to_owned(),
            )),
            NodeKind::FuncDecl { .. } | NodeKind::StructDecl { .. } | NodeKind::FieldDecl { .. } => {
                // declarations are emitted from the scope tree, not from
                // statement position
                Ok(CppSnippet::new())
            }
            NodeKind::Package { children, .. } => {
                let mut out = CppSnippet::new();
                for child in children.clone() {
                    out.push_snippet(self.emit_stmt(ast, child)?);
                }
                Ok(out)
            }
            _ => {
                let rendered = self.emit_expr(ast, id)?;
                Ok(CppSnippet::text(format!("{rendered};\n")))
            }
        }
    }

    fn emit_expr(&mut self, ast: &Ast, id: NodeId) -> Result<String, EmitError> {
        match &ast.node(id).kind {
            NodeKind::Literal(value) => Ok(match value {
                LitValue::Int(v) => v.to_string(),
                LitValue::Dec(text) => format!("{text}f"),
                LitValue::Bool(v) => v.to_string(),
                LitValue::Str(text) => format!("{:?}", text),
            }),
            NodeKind::SymbolTerm { symbol } => Ok(self.symbol_ref(*symbol)),
            NodeKind::Binary { op, left, right } => {
                let symbol = op.symbol.clone();
                let left = self.emit_expr(ast, *left)?;
                let right = self.emit_expr(ast, *right)?;
                Ok(format!("({left} {symbol} {right})"))
            }
            NodeKind::Unary { op, operand } => {
                let spelled = match op.symbol.as_str() {
                    "not" => "!",
                    other => other,
                };
                let spelled = spelled.to_owned();
                let operand = self.emit_expr(ast, *operand)?;
                Ok(format!("({spelled}({operand}))"))
            }
            NodeKind::Assign { left, right } => {
                // assignment in expression position (loop re-reads)
                let left = self.emit_expr(ast, *left)?;
                let right = self.emit_expr(ast, *right)?;
                Ok(format!("{left} = {right}"))
            }
            NodeKind::TypeConvert { expr, to, .. } => {
                let to = to.clone();
                let inner = self.emit_expr(ast, *expr)?;
                Ok(format!("(({})({}))", self.cpp_type(&to), inner))
            }
            NodeKind::AddressOf { operand } => {
                let operand = self.emit_expr(ast, *operand)?;
                Ok(format!("&({operand})"))
            }
            NodeKind::Dereference { operand } => {
                let operand = self.emit_expr(ast, *operand)?;
                Ok(format!("*({operand})"))
            }
            NodeKind::FieldAccess { element, field } => {
                let name = self.table.symbol(*field).name.clone();
                let element = self.emit_expr(ast, *element)?;
                Ok(format!("({element}).{name}"))
            }
            NodeKind::IndexAccess { element, key, .. } => {
                let element = self.emit_expr(ast, *element)?;
                let key = self.emit_expr(ast, *key)?;
                Ok(format!("({element})[{key}]"))
            }
            NodeKind::Call { overload, args, .. } => {
                let (overload, args) = (*overload, args.clone());
                self.emit_call(ast, overload, &args)
            }
            NodeKind::TaskStart { closure } => {
                let NodeKind::Closure {
                    overload, captured, ..
                } = &ast.node(*closure).kind
                else {
                    return Err(EmitError::Internal(
                        "taskstart without a closure operand".to_owned(),
                    ));
                };
                let callee = self.qualified_name(self.table.overload(*overload).function);
                let captured = captured.clone();
                let mut rendered = Vec::with_capacity(captured.len());
                for arg in captured {
                    rendered.push(self.emit_expr(ast, arg)?);
                }
                Ok(format!(
                    "ctrl->start_task<{}>({})",
                    callee,
                    rendered.join(", ")
                ))
            }
            NodeKind::TaskReady { task } => {
                let task = self.emit_expr(ast, *task)?;
                Ok(format!("({task}).ready()"))
            }
            NodeKind::TaskResult { task } => {
                let task = self.emit_expr(ast, *task)?;
                Ok(format!("({task}).result()"))
            }
            NodeKind::Closure { .. } => Err(EmitError::Internal(
                "a closure can only be called or task-started".to_owned(),
            )),
            NodeKind::MethodAccess { .. } => Err(EmitError::Internal(
                "a method accessor can only be called".to_owned(),
            )),
            other => Err(EmitError::Internal(format!(
                "node is not an expression: {other:?}"
            ))),
        }
    }

    fn emit_call(
        &mut self,
        ast: &Ast,
        overload: OverloadId,
        args: &[NodeId],
    ) -> Result<String, EmitError> {
        let function = self.table.overload(overload).function;
        let is_method = matches!(
            self.table.symbol(function).kind,
            SymbolKind::Function {
                declaring: Some(_),
                ..
            }
        );

        if is_method {
            let (receiver, rest) = args.split_first().ok_or_else(|| {
                EmitError::Internal("method call without a receiver".to_owned())
            })?;
            // the receiver was materialised as `&object`
            let receiver_code = match &ast.node(*receiver).kind {
                NodeKind::AddressOf { operand } => self.emit_expr(ast, *operand)?,
                _ => format!("*({})", self.emit_expr(ast, *receiver)?),
            };
            let mut rendered = Vec::with_capacity(rest.len());
            for &arg in rest {
                rendered.push(self.emit_expr(ast, arg)?);
            }
            Ok(format!(
                "({}).{}({})",
                receiver_code,
                self.table.symbol(function).name,
                rendered.join(", ")
            ))
        } else {
            let mut rendered = Vec::with_capacity(args.len());
            for &arg in args {
                rendered.push(self.emit_expr(ast, arg)?);
            }
            Ok(format!(
                "{}({})",
                self.qualified_name(function),
                rendered.join(", ")
            ))
        }
    }

    // --- naming and types -----------------------------------------------

    fn symbol_ref(&self, symbol: SymbolId) -> String {
        if let Some(spelling) = self.names.get(&symbol) {
            return spelling.clone();
        }
        self.qualified_name(symbol)
    }

    /// Globally qualified C++ name: scope path with anonymous and
    /// overload scopes skipped. A symbol directly inside such a scope
    /// is spelled bare.
    fn qualified_name(&self, symbol: SymbolId) -> String {
        let data = self.table.symbol(symbol);
        let mut path = vec![data.name.clone()];
        let mut scope = Some(data.scope);
        while let Some(s) = scope {
            let scope_data = self.table.scope(s);
            if scope_data.name.starts_with('@') {
                // local to an overload or anonymous block: bare name
                return data.name.clone();
            }
            path.push(scope_data.name.clone());
            scope = scope_data.parent;
        }
        path.reverse();
        path.join("::")
    }

    fn cpp_type(&mut self, ty: &DataType) -> String {
        match ty {
            DataType::Named(symbol) => {
                let symbol = *symbol;
                if symbol == self.env.ty_int {
                    "int".to_owned()
                } else if symbol == self.env.ty_uint {
                    "unsigned int".to_owned()
                } else if symbol == self.env.ty_short {
                    "short".to_owned()
                } else if symbol == self.env.ty_ushort {
                    "unsigned short".to_owned()
                } else if symbol == self.env.ty_float {
                    "float".to_owned()
                } else if symbol == self.env.ty_bool {
                    "bool".to_owned()
                } else if symbol == self.env.ty_void {
                    "void".to_owned()
                } else if symbol == self.env.ty_string {
                    self.required_headers.insert("<string>".to_owned());
                    "std::string".to_owned()
                } else {
                    self.qualified_name(symbol)
                }
            }
            DataType::Pointer(element) => format!("{}*", self.cpp_type(element)),
            DataType::Array(element, len) => {
                self.required_headers.insert("<array>".to_owned());
                format!("std::array<{}, {}>", self.cpp_type(element), len)
            }
            DataType::Task(element) => format!("Celesta::Task<{}>", self.cpp_type(element)),
        }
    }
}
