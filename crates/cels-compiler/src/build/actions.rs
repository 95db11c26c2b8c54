//! Reduction logic: symbol creation, type checking, overload
//! resolution, implicit conversion insertion and closure lowering.

use std::collections::HashMap;

use indexmap::IndexMap;

use cels_core::Token;

use crate::ast::{LitValue, NodeId, NodeKind};
use crate::operators::Fixity;
use crate::symbols::{
    DataType, FunctionOverload, OverloadId, ScopeId, ScopeStrategy, SymbolId, SymbolKind,
};
use crate::{BuildError, TypeError};

use super::{Build, FuncSpec, SemValue};

impl Build<'_> {
    // --- node constructors ----------------------------------------------

    /// A block in the current scope; nested plain blocks are dissolved
    /// into their statements.
    pub(crate) fn make_block(&mut self, children: Vec<NodeId>) -> NodeId {
        let scope = self.current_scope();
        self.make_block_in(children, scope)
    }

    pub(crate) fn make_block_in(&mut self, children: Vec<NodeId>, scope: ScopeId) -> NodeId {
        let mut flat = Vec::with_capacity(children.len());
        self.flatten_into(&children, &mut flat);
        self.ast.add(
            NodeKind::Block {
                scope: Some(scope),
                children: flat,
            },
            None,
        )
    }

    fn flatten_into(&self, children: &[NodeId], out: &mut Vec<NodeId>) {
        for &child in children {
            match &self.ast.node(child).kind {
                NodeKind::Block { children, .. } => {
                    let inner = children.clone();
                    self.flatten_into(&inner, out);
                }
                _ => out.push(child),
            }
        }
    }

    pub(crate) fn make_simple(&mut self, kind: NodeKind) -> NodeId {
        self.ast.add(kind, None)
    }

    pub(crate) fn make_return(&mut self, value: Option<NodeId>) -> NodeId {
        self.ast.add(NodeKind::Return { value }, None)
    }

    pub(crate) fn make_while(&mut self, condition: NodeId, body: NodeId) -> NodeId {
        self.ast.add(NodeKind::While { condition, body }, None)
    }

    pub(crate) fn make_if(
        &mut self,
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    ) -> NodeId {
        self.ast.add(
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            },
            None,
        )
    }

    /// Type of an expression node; non-expressions are a builder bug
    /// surfaced as an error.
    pub(crate) fn expr_type(&self, node: NodeId) -> Result<DataType, BuildError> {
        self.ast
            .ty(node)
            .cloned()
            .ok_or_else(|| BuildError::Ast("expression expected".to_owned()))
    }

    // --- scope bookkeeping ----------------------------------------------

    pub(crate) fn reduce_push_scope(&mut self) -> Result<ScopeId, BuildError> {
        let name = self.env.next_anon_scope_name();
        Ok(self
            .scopes
            .push(&mut self.env.table, &name, ScopeStrategy::Create)?)
    }

    pub(crate) fn reduce_named_scope_push(&mut self) -> Result<(), BuildError> {
        let name = self
            .named_scopes
            .pop()
            .ok_or_else(|| BuildError::Ast("no pending scope name".to_owned()))?;
        // packages may be reopened across files
        self.scopes
            .push(&mut self.env.table, &name, ScopeStrategy::GetOrCreate)?;
        Ok(())
    }

    pub(crate) fn reduce_pop_scope(&mut self) -> Result<ScopeId, BuildError> {
        Ok(self.scopes.pop()?)
    }

    pub(crate) fn reduce_id_defines_scoped_struct(
        &mut self,
        token: &Token,
    ) -> Result<SymbolId, BuildError> {
        let name = token.text.as_str();
        let current = self.current_scope();
        let symbol = self.env.table.add_symbol(
            current,
            name,
            SymbolKind::Struct {
                inner_scope: None,
                members: Vec::new(),
            },
        )?;
        let scope = self
            .scopes
            .push(&mut self.env.table, name, ScopeStrategy::Create)?;
        self.env.table.set_associated(scope, symbol);
        if let SymbolKind::Struct { inner_scope, .. } = &mut self.env.table.symbol_mut(symbol).kind
        {
            *inner_scope = Some(scope);
        }
        Ok(symbol)
    }

    fn current_struct_context(&self) -> Result<(ScopeId, SymbolId), BuildError> {
        let scope = self.current_scope();
        let symbol = self.env.table.scope(scope).associated.ok_or_else(|| {
            TypeError::StructExpected(self.env.table.scope(scope).full_name.clone())
        })?;
        match self.env.table.symbol(symbol).kind {
            SymbolKind::Struct { .. } => Ok((scope, symbol)),
            _ => Err(TypeError::StructExpected(
                self.env.table.symbol(symbol).full_name.clone(),
            )
            .into()),
        }
    }

    // --- declarations ---------------------------------------------------

    pub(crate) fn reduce_vdecl(
        &mut self,
        name: &Token,
        ty: DataType,
    ) -> Result<NodeId, BuildError> {
        let scope = self.current_scope();
        let variable = self
            .env
            .table
            .add_symbol(scope, &name.text, SymbolKind::Variable { ty })?;
        Ok(self.ast.add(NodeKind::VDecl { variable }, None))
    }

    pub(crate) fn reduce_vdecl_with_expr(
        &mut self,
        name: &Token,
        ty: Option<DataType>,
        expr: NodeId,
    ) -> Result<NodeId, BuildError> {
        let ty = match ty {
            Some(t) => t,
            None => self.expr_type(expr)?,
        };
        let vdecl = self.reduce_vdecl(name, ty)?;
        let &NodeKind::VDecl { variable } = &self.ast.node(vdecl).kind else {
            unreachable!("reduce_vdecl builds a VDecl");
        };
        let term = self.reduce_symbol_term(variable)?;
        let assign = self.reduce_assign(term, expr)?;
        Ok(self.make_block(vec![vdecl, assign]))
    }

    pub(crate) fn reduce_package(
        &mut self,
        name: &Token,
        block: NodeId,
        scope: ScopeId,
    ) -> Result<NodeId, BuildError> {
        self.env.table.mark_package(scope);
        let children = match &self.ast.node(block).kind {
            NodeKind::Block { children, .. } => children.clone(),
            _ => return Err(BuildError::Ast("package body must be a block".to_owned())),
        };
        Ok(self.ast.add(
            NodeKind::Package {
                name: name.text.clone(),
                scope,
                children,
            },
            None,
        ))
    }

    pub(crate) fn reduce_import(&mut self, path: &Token) -> Result<NodeId, BuildError> {
        let path = self.unescape_string(&path.text)?;
        self.imports.push(path);
        Ok(self.make_block(Vec::new()))
    }

    pub(crate) fn reduce_func_decl(
        &mut self,
        overload: OverloadId,
        implementation: Option<NodeId>,
    ) -> Result<NodeId, BuildError> {
        if let Some(body) = implementation {
            self.env.table.overload_mut(overload).implementation = Some(body);
        }
        let implementation = self.env.table.overload(overload).implementation;
        Ok(self.ast.add(
            NodeKind::FuncDecl {
                overload,
                implementation,
            },
            None,
        ))
    }

    pub(crate) fn reduce_func_header(
        &mut self,
        name: &Token,
        params: Vec<(String, DataType)>,
        return_type: DataType,
        specs: Vec<FuncSpec>,
        declaring: Option<SymbolId>,
    ) -> Result<OverloadId, BuildError> {
        let current = self.current_scope();
        let func = match self.env.table.try_resolve_immediate(current, &name.text) {
            Some(existing) => match self.env.table.symbol(existing).kind {
                SymbolKind::Function { .. } => existing,
                _ => {
                    return Err(TypeError::Other(format!(
                        "{} is not a function",
                        self.env.table.symbol(existing).full_name
                    ))
                    .into());
                }
            },
            None => self.env.table.add_symbol(
                current,
                &name.text,
                SymbolKind::Function {
                    overloads: Vec::new(),
                    declaring,
                },
            )?,
        };

        let scope_name = format!(
            "@{}_ov{}",
            name.text,
            self.env.table.overload_count(func) + 1
        );
        let scope = self
            .scopes
            .push(&mut self.env.table, &scope_name, ScopeStrategy::Create)?;
        self.env.table.set_associated(scope, func);

        let mut param_ids = Vec::with_capacity(params.len());
        for (pname, pty) in params {
            param_ids.push(self.env.table.add_symbol(
                scope,
                &pname,
                SymbolKind::Param { ty: pty },
            )?);
        }

        let mut is_multiframe = false;
        let mut is_extern = false;
        let mut cpp_include = None;
        for spec in specs {
            match spec {
                FuncSpec::Multiframe => is_multiframe = true,
                FuncSpec::Extern => is_extern = true,
                FuncSpec::CppInclude(header) => cpp_include = Some(header),
            }
        }

        Ok(self.env.table.add_overload(FunctionOverload {
            function: func,
            params: param_ids,
            return_type,
            implementation: None,
            is_multiframe,
            is_extern,
            cpp_include,
        })?)
    }

    pub(crate) fn reduce_struct_method_header(
        &mut self,
        name: &Token,
        params: Vec<(String, DataType)>,
        return_type: DataType,
        specs: Vec<FuncSpec>,
    ) -> Result<OverloadId, BuildError> {
        let (_, struct_sym) = self.current_struct_context()?;
        let this_ty = DataType::Named(struct_sym).pointer_to();

        let mut full_params = Vec::with_capacity(params.len() + 1);
        full_params.push(("this".to_owned(), this_ty));
        full_params.extend(params);

        let overload =
            self.reduce_func_header(name, full_params, return_type, specs, Some(struct_sym))?;
        let func = self.env.table.overload(overload).function;
        self.env.table.add_struct_member(struct_sym, func);
        Ok(overload)
    }

    pub(crate) fn reduce_field_decl(
        &mut self,
        name: &Token,
        ty: DataType,
    ) -> Result<NodeId, BuildError> {
        let (scope, struct_sym) = self.current_struct_context()?;
        let field = self.env.table.add_symbol(
            scope,
            &name.text,
            SymbolKind::Field {
                ty,
                declaring: struct_sym,
            },
        )?;
        self.env.table.add_struct_member(struct_sym, field);
        Ok(self.ast.add(NodeKind::FieldDecl { field }, None))
    }

    pub(crate) fn reduce_struct_decl(
        &mut self,
        symbol: SymbolId,
        members: Vec<NodeId>,
    ) -> Result<NodeId, BuildError> {
        Ok(self.ast.add(NodeKind::StructDecl { symbol, members }, None))
    }

    // --- symbols and types ----------------------------------------------

    pub(crate) fn reduce_symbol(&self, path: &[String]) -> Result<SymbolId, BuildError> {
        let components: Vec<&str> = path.iter().map(String::as_str).collect();
        Ok(self
            .env
            .table
            .resolve(self.current_scope(), &components)?)
    }

    pub(crate) fn reduce_symbol_term(&mut self, symbol: SymbolId) -> Result<NodeId, BuildError> {
        match &self.env.table.symbol(symbol).kind {
            SymbolKind::Variable { ty } | SymbolKind::Param { ty } => {
                let ty = ty.clone();
                Ok(self.ast.add(NodeKind::SymbolTerm { symbol }, Some(ty)))
            }
            SymbolKind::Function { .. } => {
                let ty = self.env.dtype_function();
                Ok(self.ast.add(NodeKind::SymbolTerm { symbol }, Some(ty)))
            }
            SymbolKind::Field { .. } => {
                // a bare field inside a method body reads through `this`
                let name = self.env.table.symbol(symbol).name.clone();
                let this = self
                    .env
                    .table
                    .resolve(self.current_scope(), &["this"])
                    .map_err(|_| {
                        TypeError::Other(format!("field {name} referenced outside a method"))
                    })?;
                let this_term = self.reduce_symbol_term(this)?;
                self.reduce_pointer_member_access(this_term, &name)
            }
            _ => Err(BuildError::Ast(format!(
                "symbol is not allowed in expressions: {}",
                self.env.table.symbol(symbol).full_name
            ))),
        }
    }

    pub(crate) fn reduce_data_type_from_token(
        &self,
        token: &Token,
    ) -> Result<DataType, BuildError> {
        let symbol = self.env.table.resolve(self.current_scope(), &[&token.text])?;
        self.reduce_data_type_from_symbol(symbol)
    }

    pub(crate) fn reduce_data_type_from_symbol(
        &self,
        symbol: SymbolId,
    ) -> Result<DataType, BuildError> {
        if !self.env.table.symbol(symbol).is_type() {
            return Err(BuildError::Ast(format!(
                "invalid symbol: expected data type, got {}",
                self.env.table.symbol(symbol).full_name
            )));
        }
        Ok(DataType::Named(symbol))
    }

    pub(crate) fn reduce_data_type_array(
        &self,
        ty: DataType,
        length: &Token,
    ) -> Result<DataType, BuildError> {
        let length: u64 = length
            .text
            .parse()
            .map_err(|_| BuildError::Ast(format!("invalid array length `{}`", length.text)))?;
        Ok(ty.array_of(length))
    }

    // --- literals -------------------------------------------------------

    pub(crate) fn reduce_int_literal(&mut self, token: &Token) -> Result<NodeId, BuildError> {
        let value: i64 = token
            .text
            .parse()
            .map_err(|_| BuildError::Ast(format!("integer literal out of range: {}", token.text)))?;
        let ty = self.env.dtype_int();
        Ok(self
            .ast
            .add(NodeKind::Literal(LitValue::Int(value)), Some(ty)))
    }

    pub(crate) fn reduce_dec_literal(&mut self, token: &Token) -> NodeId {
        let ty = self.env.dtype_float();
        self.ast
            .add(NodeKind::Literal(LitValue::Dec(token.text.clone())), Some(ty))
    }

    pub(crate) fn reduce_string_literal(&mut self, token: &Token) -> Result<NodeId, BuildError> {
        let value = self.unescape_string(&token.text)?;
        let ty = self.env.dtype_string();
        Ok(self
            .ast
            .add(NodeKind::Literal(LitValue::Str(value)), Some(ty)))
    }

    pub(crate) fn reduce_bool_literal(&mut self, token: &Token) -> NodeId {
        let ty = self.env.dtype_bool();
        self.ast.add(
            NodeKind::Literal(LitValue::Bool(token.text == "true")),
            Some(ty),
        )
    }

    /// Strip the surrounding quotes of a string literal and process the
    /// standard escapes.
    pub(crate) fn unescape_string(&self, quoted: &str) -> Result<String, BuildError> {
        let inner = quoted
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .ok_or_else(|| BuildError::Ast(format!("malformed string literal: {quoted}")))?;
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => {
                    return Err(BuildError::Ast(format!(
                        "malformed string literal: {quoted}"
                    )));
                }
            }
        }
        Ok(out)
    }

    // --- expressions ----------------------------------------------------

    pub(crate) fn reduce_assign(
        &mut self,
        left: NodeId,
        right: NodeId,
    ) -> Result<NodeId, BuildError> {
        let left_ty = self.expr_type(left)?;
        let right_ty = self.expr_type(right)?;
        let right = if left_ty != right_ty {
            self.env
                .ops
                .resolve_converter(&self.env.table, &right_ty, &left_ty)?;
            self.ast.add(
                NodeKind::TypeConvert {
                    expr: right,
                    from: right_ty,
                    to: left_ty.clone(),
                },
                Some(left_ty),
            )
        } else {
            right
        };
        Ok(self.ast.add(NodeKind::Assign { left, right }, None))
    }

    pub(crate) fn reduce_binary_operator(
        &mut self,
        left: NodeId,
        op: &Token,
        right: NodeId,
    ) -> Result<NodeId, BuildError> {
        let left_ty = self.expr_type(left)?;
        let right_ty = self.expr_type(right)?;
        let op = self
            .env
            .ops
            .resolve_binary_operator(&self.env.table, &op.text, &left_ty, &right_ty)?
            .clone();
        let result = op.result.clone();
        Ok(self
            .ast
            .add(NodeKind::Binary { op, left, right }, Some(result)))
    }

    pub(crate) fn reduce_unary_operator(
        &mut self,
        op: &Token,
        operand: NodeId,
        fixity: Fixity,
    ) -> Result<NodeId, BuildError> {
        let operand_ty = self.expr_type(operand)?;
        let op = self
            .env
            .ops
            .resolve_unary_operator(&self.env.table, &op.text, &operand_ty, fixity)?
            .clone();
        let result = op.result.clone();
        Ok(self.ast.add(NodeKind::Unary { op, operand }, Some(result)))
    }

    pub(crate) fn reduce_addressof(&mut self, operand: NodeId) -> Result<NodeId, BuildError> {
        match self.ast.node(operand).kind {
            NodeKind::SymbolTerm { .. }
            | NodeKind::FieldAccess { .. }
            | NodeKind::Dereference { .. }
            | NodeKind::IndexAccess { .. } => {}
            _ => {
                return Err(TypeError::Other(
                    "cannot take the address of a temporary expression".to_owned(),
                )
                .into());
            }
        }
        let ty = self.expr_type(operand)?.pointer_to();
        Ok(self.ast.add(NodeKind::AddressOf { operand }, Some(ty)))
    }

    pub(crate) fn reduce_dereference(&mut self, operand: NodeId) -> Result<NodeId, BuildError> {
        let ty = self.expr_type(operand)?;
        let DataType::Pointer(element) = ty else {
            return Err(TypeError::DerefNonPointer.into());
        };
        Ok(self
            .ast
            .add(NodeKind::Dereference { operand }, Some(*element)))
    }

    pub(crate) fn reduce_index_access(
        &mut self,
        element: NodeId,
        key: NodeId,
    ) -> Result<NodeId, BuildError> {
        let element_ty = self.expr_type(element)?;
        let key_ty = self.expr_type(key)?;
        let indexer = self
            .env
            .ops
            .resolve_indexer(&self.env.table, &element_ty, &key_ty)?;
        let output = indexer.output.clone();
        Ok(self.ast.add(
            NodeKind::IndexAccess {
                element,
                key,
                indexer,
            },
            Some(output),
        ))
    }

    pub(crate) fn reduce_pointer_member_access(
        &mut self,
        element: NodeId,
        name: &str,
    ) -> Result<NodeId, BuildError> {
        let deref = self.reduce_dereference(element)?;
        self.reduce_member_access(deref, name)
    }

    pub(crate) fn reduce_member_access(
        &mut self,
        element: NodeId,
        name: &str,
    ) -> Result<NodeId, BuildError> {
        let element_ty = self.expr_type(element)?;
        let &DataType::Named(struct_sym) = &element_ty else {
            return Err(TypeError::StructExpected(
                self.env.table.type_name(&element_ty),
            )
            .into());
        };
        let SymbolKind::Struct { inner_scope, .. } = &self.env.table.symbol(struct_sym).kind
        else {
            return Err(TypeError::StructExpected(
                self.env.table.symbol(struct_sym).full_name.clone(),
            )
            .into());
        };
        let inner = (*inner_scope).ok_or_else(|| {
            BuildError::Ast(format!(
                "struct {} has no member scope",
                self.env.table.symbol(struct_sym).full_name
            ))
        })?;

        let member = self
            .env
            .table
            .try_resolve_immediate(inner, name)
            .ok_or_else(|| crate::ScopeError::UnknownSymbol {
                name: name.to_owned(),
                scope: self.env.table.scope(inner).full_name.clone(),
            })?;

        match &self.env.table.symbol(member).kind {
            SymbolKind::Field { ty, .. } => {
                let ty = ty.clone();
                Ok(self.ast.add(
                    NodeKind::FieldAccess {
                        element,
                        field: member,
                    },
                    Some(ty),
                ))
            }
            SymbolKind::Function { declaring, .. } => {
                if declaring.is_none() {
                    return Err(TypeError::Other(
                        "non-member function called on object".to_owned(),
                    )
                    .into());
                }
                let ty = self.env.dtype_instance_method();
                Ok(self.ast.add(
                    NodeKind::MethodAccess {
                        element,
                        method: member,
                    },
                    Some(ty),
                ))
            }
            _ => Err(TypeError::Other(format!(
                "member {} is neither a field nor a method",
                self.env.table.symbol(member).full_name
            ))
            .into()),
        }
    }

    // --- calls ----------------------------------------------------------

    pub(crate) fn reduce_call(
        &mut self,
        callee: NodeId,
        args: Vec<NodeId>,
    ) -> Result<NodeId, BuildError> {
        let callee_ty = self.expr_type(callee)?;

        if callee_ty == self.env.dtype_function() {
            let &NodeKind::SymbolTerm { symbol } = &self.ast.node(callee).kind else {
                return Err(BuildError::Ast(
                    "expression of type function must be a symbol".to_owned(),
                ));
            };
            let overload = self.match_overloads(symbol, &args)?;
            let args = self.convert_args(overload, args)?;
            let ty = self.env.table.overload(overload).return_type.clone();
            return Ok(self.ast.add(
                NodeKind::Call {
                    overload,
                    args,
                    impl_ref: None,
                },
                Some(ty),
            ));
        }

        if callee_ty == self.env.dtype_closure_function() {
            let NodeKind::Closure {
                overload,
                captured,
                implementation,
            } = self.ast.node(callee).kind.clone()
            else {
                return Err(BuildError::Ast(
                    "expression of type closure must be explicit: (lambda (params)=>(...))(args)"
                        .to_owned(),
                ));
            };
            let mut full_args = captured;
            full_args.extend(args);
            let full_args = self.convert_args(overload, full_args)?;
            let ty = self.env.table.overload(overload).return_type.clone();
            // the implementation rides along so that tree passes reach
            // the lambda body
            return Ok(self.ast.add(
                NodeKind::Call {
                    overload,
                    args: full_args,
                    impl_ref: Some(implementation),
                },
                Some(ty),
            ));
        }

        if callee_ty == self.env.dtype_instance_method() {
            let &NodeKind::MethodAccess { element, method } = &self.ast.node(callee).kind else {
                return Err(BuildError::Ast(
                    "expected a method accessor as call target".to_owned(),
                ));
            };
            let this_arg = self.reduce_addressof(element)?;
            let mut full_args = vec![this_arg];
            full_args.extend(args);
            let overload = self.match_overloads(method, &full_args)?;
            let full_args = self.convert_args(overload, full_args)?;
            let ty = self.env.table.overload(overload).return_type.clone();
            return Ok(self.ast.add(
                NodeKind::Call {
                    overload,
                    args: full_args,
                    impl_ref: None,
                },
                Some(ty),
            ));
        }

        Err(TypeError::NotCallable(self.env.table.type_name(&callee_ty)).into())
    }

    /// Overload resolution: count exact and converter-reachable
    /// parameter matches per overload, then pick the unique candidate
    /// with the fewest conversions.
    fn match_overloads(
        &self,
        function: SymbolId,
        args: &[NodeId],
    ) -> Result<OverloadId, BuildError> {
        let mut arg_types = Vec::with_capacity(args.len());
        for &arg in args {
            arg_types.push(self.expr_type(arg)?);
        }

        let SymbolKind::Function { overloads, .. } = &self.env.table.symbol(function).kind else {
            return Err(
                TypeError::NotCallable(self.env.table.symbol(function).full_name.clone()).into(),
            );
        };

        let mut candidates: Vec<(OverloadId, usize)> = Vec::new();
        for &overload in overloads {
            if let Some(conversions) = self.overload_compatibility(overload, &arg_types) {
                candidates.push((overload, conversions));
            }
        }
        candidates.sort_by_key(|&(_, conversions)| conversions);

        let type_list = || {
            arg_types
                .iter()
                .map(|t| self.env.table.type_name(t))
                .collect::<Vec<_>>()
                .join(", ")
        };

        match candidates.as_slice() {
            [] => Err(TypeError::NoOverload {
                function: self.env.table.symbol(function).full_name.clone(),
                args: type_list(),
            }
            .into()),
            [(only, _)] => Ok(*only),
            [(best, n), (_, m), ..] if n < m => Ok(*best),
            _ => {
                let minimum = candidates[0].1;
                let matches = candidates
                    .iter()
                    .filter(|&&(_, c)| c == minimum)
                    .map(|&(ov, _)| self.env.table.display_overload(ov))
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(TypeError::AmbiguousOverload {
                    function: self.env.table.symbol(function).full_name.clone(),
                    args: type_list(),
                    matches,
                }
                .into())
            }
        }
    }

    /// Number of conversions needed to call `overload` with
    /// `arg_types`, or `None` when some argument cannot match.
    fn overload_compatibility(
        &self,
        overload: OverloadId,
        arg_types: &[DataType],
    ) -> Option<usize> {
        let params = &self.env.table.overload(overload).params;
        if params.len() != arg_types.len() {
            return None;
        }
        let mut conversions = 0;
        for (&param, arg_ty) in params.iter().zip(arg_types) {
            let param_ty = self.env.table.symbol(param).data_type()?;
            if param_ty == arg_ty {
                continue;
            }
            if !self.env.ops.can_convert(arg_ty, param_ty) {
                return None;
            }
            conversions += 1;
        }
        Some(conversions)
    }

    /// Wrap each argument whose type differs from its parameter in a
    /// conversion node.
    fn convert_args(
        &mut self,
        overload: OverloadId,
        args: Vec<NodeId>,
    ) -> Result<Vec<NodeId>, BuildError> {
        let param_types: Vec<DataType> = self
            .env
            .table
            .overload(overload)
            .params
            .iter()
            .filter_map(|&p| self.env.table.symbol(p).data_type().cloned())
            .collect();
        if param_types.len() != args.len() {
            return Err(TypeError::Other(format!(
                "wrong number of arguments for {}",
                self.env.table.display_overload(overload)
            ))
            .into());
        }

        let mut out = Vec::with_capacity(args.len());
        for (arg, param_ty) in args.into_iter().zip(param_types) {
            let arg_ty = self.expr_type(arg)?;
            if arg_ty == param_ty {
                out.push(arg);
                continue;
            }
            self.env
                .ops
                .resolve_converter(&self.env.table, &arg_ty, &param_ty)?;
            out.push(self.ast.add(
                NodeKind::TypeConvert {
                    expr: arg,
                    from: arg_ty,
                    to: param_ty.clone(),
                },
                Some(param_ty),
            ));
        }
        Ok(out)
    }

    // --- tasks ----------------------------------------------------------

    pub(crate) fn reduce_taskstart(&mut self, closure: NodeId) -> Result<NodeId, BuildError> {
        let NodeKind::Closure { overload, .. } = &self.ast.node(closure).kind else {
            return Err(BuildError::Ast(
                "taskstart expects a lambda expression".to_owned(),
            ));
        };
        let ty = self.env.table.overload(*overload).return_type.task_of();
        Ok(self.ast.add(NodeKind::TaskStart { closure }, Some(ty)))
    }

    pub(crate) fn reduce_taskready(&mut self, task: NodeId) -> Result<NodeId, BuildError> {
        let ty = self.expr_type(task)?;
        if !ty.is_task() {
            return Err(TypeError::Other(format!(
                "non-task argument provided to taskready: {}",
                self.env.table.type_name(&ty)
            ))
            .into());
        }
        let bool_ty = self.env.dtype_bool();
        Ok(self.ast.add(NodeKind::TaskReady { task }, Some(bool_ty)))
    }

    pub(crate) fn reduce_taskresult(&mut self, task: NodeId) -> Result<NodeId, BuildError> {
        let ty = self.expr_type(task)?;
        let DataType::Task(inner) = ty.clone() else {
            return Err(TypeError::Other(format!(
                "non-task argument provided to taskresult: {}",
                self.env.table.type_name(&ty)
            ))
            .into());
        };
        Ok(self.ast.add(NodeKind::TaskResult { task }, Some(*inner)))
    }

    // --- lambdas --------------------------------------------------------

    pub(crate) fn reduce_lambda_header(
        &mut self,
        scope: ScopeId,
        params: Vec<(String, DataType)>,
    ) -> Result<SemValue, BuildError> {
        let mut ids = Vec::with_capacity(params.len());
        for (name, ty) in params {
            ids.push(
                self.env
                    .table
                    .add_symbol(scope, &name, SymbolKind::Param { ty })?,
            );
        }
        Ok(SemValue::LambdaHeader(scope, ids))
    }

    /// Closure lowering: capture analysis, synthetic global function,
    /// body rewrite.
    pub(crate) fn reduce_lambda(
        &mut self,
        header: (ScopeId, Vec<SymbolId>),
        implementation: NodeId,
        return_type: Option<DataType>,
    ) -> Result<NodeId, BuildError> {
        let (src_scope, header_params) = header;
        let body_ty = self.ast.ty(implementation).cloned();
        let return_type = match (return_type, &body_ty) {
            (Some(t), _) => t,
            (None, Some(t)) => t.clone(),
            (None, None) => self.env.dtype_void(),
        };

        // classify references in the body
        let mut captured_nodes: Vec<NodeId> = Vec::new();
        let mut arg_nodes: Vec<NodeId> = Vec::new();
        let mut is_multiframe = false;
        {
            let table = &self.env.table;
            self.ast.visit(implementation, &mut |ast, id| {
                match &ast.node(id).kind {
                    NodeKind::SymbolTerm { symbol } => {
                        let symbol = *symbol;
                        if table.is_in_scope(symbol, src_scope) {
                            let is_own_param = matches!(
                                table.symbol(symbol).kind,
                                SymbolKind::Param { .. }
                            ) && table.symbol(symbol).scope == src_scope;
                            if is_own_param {
                                arg_nodes.push(id);
                            }
                        } else if table.symbol(symbol).full_name.contains('@') {
                            // globals are reachable by name; everything
                            // else must be captured
                            captured_nodes.push(id);
                        }
                    }
                    NodeKind::Call { overload, .. } => {
                        if table.overload(*overload).is_multiframe {
                            is_multiframe = true;
                        }
                    }
                    _ => {}
                }
                false
            });
        }

        // deduplicate captures, first encounter wins
        let mut captured: IndexMap<SymbolId, DataType> = IndexMap::new();
        for &node in &captured_nodes {
            let &NodeKind::SymbolTerm { symbol } = &self.ast.node(node).kind else {
                continue;
            };
            if !captured.contains_key(&symbol) {
                let ty = self.expr_type(node)?;
                captured.insert(symbol, ty.pointer_to());
            }
        }

        let (lambda_sym, lambda_scope) = self.env.generate_lambda_function()?;

        // one pointer parameter per capture, then the lambda's own
        let mut capture_param: IndexMap<SymbolId, SymbolId> = IndexMap::new();
        let mut params: Vec<SymbolId> = Vec::new();
        for (&original, ptr_ty) in &captured {
            let name = self.env.table.symbol(original).name.clone();
            let param = self.env.table.add_symbol(
                lambda_scope,
                &name,
                SymbolKind::Param { ty: ptr_ty.clone() },
            )?;
            capture_param.insert(original, param);
            params.push(param);
        }
        let mut own_param: HashMap<SymbolId, SymbolId> = HashMap::new();
        for &original in &header_params {
            let (name, ty) = {
                let sym = self.env.table.symbol(original);
                (
                    sym.name.clone(),
                    sym.data_type().cloned().ok_or_else(|| {
                        BuildError::Ast("lambda parameter without a type".to_owned())
                    })?,
                )
            };
            let param =
                self.env
                    .table
                    .add_symbol(lambda_scope, &name, SymbolKind::Param { ty })?;
            own_param.insert(original, param);
            params.push(param);
        }

        let overload = self.env.table.add_overload(FunctionOverload {
            function: lambda_sym,
            params,
            return_type,
            implementation: None,
            is_multiframe,
            is_extern: false,
            cpp_include: None,
        })?;

        // the closure's bound arguments: addresses of the captured slots
        let mut captured_args = Vec::with_capacity(captured.len());
        for &original in captured.keys() {
            let term = self.reduce_symbol_term(original)?;
            captured_args.push(self.reduce_addressof(term)?);
        }

        // rewrite captured references to `*p` and own-parameter
        // references to the new parameters
        for node in captured_nodes {
            let &NodeKind::SymbolTerm { symbol } = &self.ast.node(node).kind else {
                continue;
            };
            let param = capture_param[&symbol];
            let term = self.reduce_symbol_term(param)?;
            let deref = self.reduce_dereference(term)?;
            self.ast.replace(node, deref);
        }
        for node in arg_nodes {
            let &NodeKind::SymbolTerm { symbol } = &self.ast.node(node).kind else {
                continue;
            };
            let param = own_param[&symbol];
            let term = self.reduce_symbol_term(param)?;
            self.ast.replace(node, term);
        }

        // an expression body becomes `return <expr>;`
        let body = if body_ty.is_some() {
            let ret = self.make_return(Some(implementation));
            self.make_block(vec![ret])
        } else {
            implementation
        };
        self.env.table.overload_mut(overload).implementation = Some(body);

        let closure_ty = self.env.dtype_closure_function();
        Ok(self.ast.add(
            NodeKind::Closure {
                overload,
                captured: captured_args,
                implementation: body,
            },
            Some(closure_ty),
        ))
    }
}
