//! The Celesta grammar: every rule with its semantic action.
//!
//! Rule order is load-bearing twice over: rule ids key the persisted
//! LR(1) table, and the action table is indexed by rule id.

use cels_core::{Component, Grammar, GrammarError};

use crate::operators::Fixity;
use crate::tokens::{CelsLexer, TokenKind as TK};

use super::{
    Action, FuncSpec, SemValue, expect_lambda_header, expect_node, expect_nodes, expect_overload,
    expect_params, expect_path, expect_scope, expect_specs, expect_symbol, expect_token,
    expect_type, take,
};

enum RC {
    T(TK),
    N(&'static str),
}

struct RuleDef {
    lhs: &'static str,
    rhs: Vec<RC>,
    action: Action,
}

fn rule(lhs: &'static str, rhs: Vec<RC>, action: Action) -> RuleDef {
    RuleDef { lhs, rhs, action }
}

/// Build the grammar over the lexer's interner (so terminals share
/// handles with token kinds) and the rule-id-indexed action table.
pub fn build_grammar(lexer: &CelsLexer) -> Result<(Grammar, Vec<Action>), GrammarError> {
    let defs = rules();
    let mut names = lexer.interner().clone();

    let mut rule_defs = Vec::with_capacity(defs.len());
    for def in &defs {
        let lhs = names.intern(def.lhs);
        let rhs = def
            .rhs
            .iter()
            .map(|c| match c {
                RC::T(kind) => Component::Term(
                    names
                        .get(kind.name())
                        .expect("token kinds are interned by the lexer"),
                ),
                RC::N(name) => Component::NonTerm(names.intern(name)),
            })
            .collect();
        rule_defs.push((lhs, rhs));
    }

    let actions = defs.into_iter().map(|d| d.action).collect();
    let grammar = Grammar::new(rule_defs, None, names)?;
    Ok((grammar, actions))
}

fn rules() -> Vec<RuleDef> {
    use RC::{N, T};

    vec![
        // ---- program ----
        rule("P", vec![N("STMT_BLOCK")], |_, mut a| Ok(take(&mut a, 0))),
        rule("STMT_BLOCK", vec![N("STMTS")], |b, mut a| {
            let nodes = expect_nodes(take(&mut a, 0))?;
            Ok(SemValue::Node(b.make_block(nodes)))
        }),
        rule(
            "STMTS",
            vec![N("STMT"), T(TK::Semicolon), N("STMTS")],
            |_, mut a| {
                let head = expect_node(take(&mut a, 0))?;
                let mut tail = expect_nodes(take(&mut a, 2))?;
                tail.insert(0, head);
                Ok(SemValue::Nodes(tail))
            },
        ),
        rule("STMTS", vec![], |_, _| Ok(SemValue::Nodes(Vec::new()))),
        // ---- blocks ----
        rule(
            "ANON_SCOPED_BLOCK_ENCAPSULED",
            vec![
                N("SCOPE_PUSH"),
                T(TK::KwBegin),
                N("STMT_BLOCK"),
                T(TK::KwEnd),
                N("SCOPE_POP"),
            ],
            |_, mut a| Ok(take(&mut a, 2)),
        ),
        rule(
            "ANON_SCOPED_BLOCK",
            vec![N("ANON_SCOPED_BLOCK_ENCAPSULED")],
            |_, mut a| Ok(take(&mut a, 0)),
        ),
        rule(
            "ANON_SCOPED_BLOCK",
            vec![N("SCOPE_PUSH"), N("STMT"), N("SCOPE_POP")],
            |b, mut a| {
                let stmt = expect_node(take(&mut a, 1))?;
                let scope = expect_scope(take(&mut a, 2))?;
                Ok(SemValue::Node(b.make_block_in(vec![stmt], scope)))
            },
        ),
        // ---- variable declarations ----
        rule(
            "STMT",
            vec![T(TK::KwVar), T(TK::Id), T(TK::Colon), N("DATA_TYPE")],
            |b, mut a| {
                let name = expect_token(take(&mut a, 1))?;
                let ty = expect_type(take(&mut a, 3))?;
                b.reduce_vdecl(&name, ty).map(SemValue::Node)
            },
        ),
        rule(
            "STMT",
            vec![
                T(TK::KwVar),
                T(TK::Id),
                T(TK::Colon),
                N("DATA_TYPE"),
                T(TK::Equal),
                N("E"),
            ],
            |b, mut a| {
                let name = expect_token(take(&mut a, 1))?;
                let ty = expect_type(take(&mut a, 3))?;
                let expr = expect_node(take(&mut a, 5))?;
                b.reduce_vdecl_with_expr(&name, Some(ty), expr)
                    .map(SemValue::Node)
            },
        ),
        rule(
            "STMT",
            vec![T(TK::KwVar), T(TK::Id), T(TK::Equal), N("E")],
            |b, mut a| {
                let name = expect_token(take(&mut a, 1))?;
                let expr = expect_node(take(&mut a, 3))?;
                b.reduce_vdecl_with_expr(&name, None, expr)
                    .map(SemValue::Node)
            },
        ),
        // ---- packages and imports ----
        rule(
            "STMT",
            vec![
                T(TK::KwPackage),
                N("ID_DEFINES_SCOPE"),
                N("NAMED_SCOPE_PUSH"),
                T(TK::KwBegin),
                N("STMT_BLOCK"),
                T(TK::KwEnd),
                N("SCOPE_POP"),
            ],
            |b, mut a| {
                let name = expect_token(take(&mut a, 1))?;
                let block = expect_node(take(&mut a, 4))?;
                let scope = expect_scope(take(&mut a, 6))?;
                b.reduce_package(&name, block, scope).map(SemValue::Node)
            },
        ),
        rule(
            "STMT",
            vec![T(TK::KwImport), T(TK::LiteralStr)],
            |b, mut a| {
                let path = expect_token(take(&mut a, 1))?;
                b.reduce_import(&path).map(SemValue::Node)
            },
        ),
        // ---- function declarations ----
        rule(
            "STMT",
            vec![
                N("FUNC_HEADER"),
                T(TK::KwBegin),
                N("STMT_BLOCK"),
                T(TK::KwEnd),
                N("SCOPE_POP"),
            ],
            |b, mut a| {
                let overload = expect_overload(take(&mut a, 0))?;
                let body = expect_node(take(&mut a, 2))?;
                b.reduce_func_decl(overload, Some(body)).map(SemValue::Node)
            },
        ),
        rule(
            "STMT",
            vec![N("FUNC_HEADER"), N("SCOPE_POP")],
            |b, mut a| {
                let overload = expect_overload(take(&mut a, 0))?;
                b.reduce_func_decl(overload, None).map(SemValue::Node)
            },
        ),
        rule("STMT", vec![T(TK::KwReturn), N("E")], |b, mut a| {
            let value = expect_node(take(&mut a, 1))?;
            Ok(SemValue::Node(b.make_return(Some(value))))
        }),
        rule("STMT", vec![T(TK::KwReturn)], |b, _| {
            Ok(SemValue::Node(b.make_return(None)))
        }),
        // ---- assignment ----
        rule(
            "STMT",
            vec![N("E_RTL"), T(TK::Equal), N("E")],
            |b, mut a| {
                let left = expect_node(take(&mut a, 0))?;
                let right = expect_node(take(&mut a, 2))?;
                b.reduce_assign(left, right).map(SemValue::Node)
            },
        ),
        // ---- struct declarations ----
        rule(
            "STMT",
            vec![
                T(TK::KwStruct),
                N("ID_DEFINES_SCOPED_STRUCT"),
                N("STRUCT_BLOCK"),
                N("SCOPE_POP"),
            ],
            |b, mut a| {
                let symbol = expect_symbol(take(&mut a, 1))?;
                let members = expect_nodes(take(&mut a, 2))?;
                b.reduce_struct_decl(symbol, members).map(SemValue::Node)
            },
        ),
        rule("STRUCT_BLOCK", vec![], |_, _| Ok(SemValue::Nodes(Vec::new()))),
        rule(
            "STRUCT_BLOCK",
            vec![T(TK::KwBegin), N("STRUCT_MEMBERS"), T(TK::KwEnd)],
            |_, mut a| Ok(take(&mut a, 1)),
        ),
        rule(
            "STRUCT_MEMBERS",
            vec![N("STRUCT_MEMBER"), T(TK::Semicolon), N("STRUCT_MEMBERS")],
            |_, mut a| {
                let head = expect_node(take(&mut a, 0))?;
                let mut tail = expect_nodes(take(&mut a, 2))?;
                tail.insert(0, head);
                Ok(SemValue::Nodes(tail))
            },
        ),
        rule("STRUCT_MEMBERS", vec![], |_, _| {
            Ok(SemValue::Nodes(Vec::new()))
        }),
        rule(
            "STRUCT_MEMBER",
            vec![
                N("STRUCT_METHOD_HEADER"),
                T(TK::KwBegin),
                N("STMT_BLOCK"),
                T(TK::KwEnd),
                N("SCOPE_POP"),
            ],
            |b, mut a| {
                let overload = expect_overload(take(&mut a, 0))?;
                let body = expect_node(take(&mut a, 2))?;
                b.reduce_func_decl(overload, Some(body)).map(SemValue::Node)
            },
        ),
        rule(
            "STRUCT_MEMBER",
            vec![N("STRUCT_METHOD_HEADER"), N("SCOPE_POP")],
            |b, mut a| {
                let overload = expect_overload(take(&mut a, 0))?;
                b.reduce_func_decl(overload, None).map(SemValue::Node)
            },
        ),
        rule(
            "STRUCT_MEMBER",
            vec![T(TK::KwVar), T(TK::Id), T(TK::Colon), N("DATA_TYPE")],
            |b, mut a| {
                let name = expect_token(take(&mut a, 1))?;
                let ty = expect_type(take(&mut a, 3))?;
                b.reduce_field_decl(&name, ty).map(SemValue::Node)
            },
        ),
        rule(
            "STRUCT_METHOD_HEADER",
            vec![
                N("FUNC_SPECS"),
                T(TK::KwFunction),
                T(TK::Id),
                T(TK::LParen),
                N("FPARAMS"),
                T(TK::RParen),
                T(TK::Colon),
                N("DATA_TYPE"),
            ],
            |b, mut a| {
                let specs = expect_specs(take(&mut a, 0))?;
                let name = expect_token(take(&mut a, 2))?;
                let params = expect_params(take(&mut a, 4))?;
                let ret = expect_type(take(&mut a, 7))?;
                b.reduce_struct_method_header(&name, params, ret, specs)
                    .map(SemValue::Overload)
            },
        ),
        rule(
            "FUNC_HEADER",
            vec![
                N("FUNC_SPECS"),
                T(TK::KwFunction),
                T(TK::Id),
                T(TK::LParen),
                N("FPARAMS"),
                T(TK::RParen),
                T(TK::Colon),
                N("DATA_TYPE"),
            ],
            |b, mut a| {
                let specs = expect_specs(take(&mut a, 0))?;
                let name = expect_token(take(&mut a, 2))?;
                let params = expect_params(take(&mut a, 4))?;
                let ret = expect_type(take(&mut a, 7))?;
                b.reduce_func_header(&name, params, ret, specs, None)
                    .map(SemValue::Overload)
            },
        ),
        rule(
            "FUNC_SPECS",
            vec![N("FUNC_SPEC"), N("FUNC_SPECS")],
            |_, mut a| {
                let head = match take(&mut a, 0) {
                    SemValue::Spec(s) => s,
                    other => {
                        return Err(crate::BuildError::Ast(format!(
                            "internal: expected specifier, got {other:?}"
                        )));
                    }
                };
                let mut tail = expect_specs(take(&mut a, 1))?;
                tail.insert(0, head);
                Ok(SemValue::Specs(tail))
            },
        ),
        rule("FUNC_SPECS", vec![], |_, _| Ok(SemValue::Specs(Vec::new()))),
        rule(
            "FUNC_SPEC",
            vec![
                T(TK::KwCppInclude),
                T(TK::LParen),
                T(TK::LiteralStr),
                T(TK::RParen),
            ],
            |b, mut a| {
                let header = expect_token(take(&mut a, 2))?;
                Ok(SemValue::Spec(FuncSpec::CppInclude(
                    b.unescape_string(&header.text)?,
                )))
            },
        ),
        rule("FUNC_SPEC", vec![T(TK::KwMultiframe)], |_, _| {
            Ok(SemValue::Spec(FuncSpec::Multiframe))
        }),
        rule("FUNC_SPEC", vec![T(TK::KwExtern)], |_, _| {
            Ok(SemValue::Spec(FuncSpec::Extern))
        }),
        rule(
            "FPARAMS",
            vec![N("FPARAM"), T(TK::Comma), N("FPARAMS")],
            |_, mut a| {
                let head = match take(&mut a, 0) {
                    SemValue::Param(n, t) => (n, t),
                    other => {
                        return Err(crate::BuildError::Ast(format!(
                            "internal: expected parameter, got {other:?}"
                        )));
                    }
                };
                let mut tail = expect_params(take(&mut a, 2))?;
                tail.insert(0, head);
                Ok(SemValue::Params(tail))
            },
        ),
        rule("FPARAMS", vec![N("FPARAM")], |_, mut a| {
            match take(&mut a, 0) {
                SemValue::Param(n, t) => Ok(SemValue::Params(vec![(n, t)])),
                other => Err(crate::BuildError::Ast(format!(
                    "internal: expected parameter, got {other:?}"
                ))),
            }
        }),
        rule("FPARAMS", vec![], |_, _| Ok(SemValue::Params(Vec::new()))),
        rule(
            "FPARAM",
            vec![T(TK::Id), T(TK::Colon), N("DATA_TYPE")],
            |_, mut a| {
                let name = expect_token(take(&mut a, 0))?;
                let ty = expect_type(take(&mut a, 2))?;
                Ok(SemValue::Param(name.text, ty))
            },
        ),
        // ---- control flow ----
        rule(
            "STMT",
            vec![T(TK::KwWhile), N("E"), T(TK::KwDo), N("ANON_SCOPED_BLOCK")],
            |b, mut a| {
                let condition = expect_node(take(&mut a, 1))?;
                let body = expect_node(take(&mut a, 3))?;
                Ok(SemValue::Node(b.make_while(condition, body)))
            },
        ),
        rule("STMT", vec![T(TK::KwSuspend)], |b, _| {
            Ok(SemValue::Node(b.make_simple(crate::ast::NodeKind::Suspend)))
        }),
        rule("STMT", vec![T(TK::KwBreak)], |b, _| {
            Ok(SemValue::Node(b.make_simple(crate::ast::NodeKind::Break)))
        }),
        rule("STMT", vec![T(TK::KwContinue)], |b, _| {
            Ok(SemValue::Node(b.make_simple(crate::ast::NodeKind::Continue)))
        }),
        rule(
            "STMT",
            vec![
                T(TK::KwIf),
                N("E"),
                T(TK::KwThen),
                N("ANON_SCOPED_BLOCK"),
                T(TK::Semicolon),
                T(TK::KwElse),
                N("ANON_SCOPED_BLOCK"),
                T(TK::Semicolon),
                T(TK::KwFi),
            ],
            |b, mut a| {
                let condition = expect_node(take(&mut a, 1))?;
                let then_branch = expect_node(take(&mut a, 3))?;
                let else_branch = expect_node(take(&mut a, 6))?;
                Ok(SemValue::Node(b.make_if(
                    condition,
                    then_branch,
                    Some(else_branch),
                )))
            },
        ),
        rule(
            "STMT",
            vec![
                T(TK::KwIf),
                N("E"),
                T(TK::KwThen),
                N("ANON_SCOPED_BLOCK"),
                T(TK::Semicolon),
                T(TK::KwFi),
            ],
            |b, mut a| {
                let condition = expect_node(take(&mut a, 1))?;
                let then_branch = expect_node(take(&mut a, 3))?;
                Ok(SemValue::Node(b.make_if(condition, then_branch, None)))
            },
        ),
        rule("STMT", vec![N("E")], |_, mut a| Ok(take(&mut a, 0))),
        // ---- expression precedence chain ----
        rule("E", vec![N("E_EQ")], |_, mut a| Ok(take(&mut a, 0))),
        rule(
            "E_EQ",
            vec![N("E_EQ"), T(TK::EqEq), N("E_REL")],
            binop_action,
        ),
        rule("E_EQ", vec![N("E_EQ"), T(TK::Neq), N("E_REL")], binop_action),
        rule("E_EQ", vec![N("E_REL")], |_, mut a| Ok(take(&mut a, 0))),
        rule("E_REL", vec![N("E_REL"), T(TK::Lt), N("E_A")], binop_action),
        rule("E_REL", vec![N("E_REL"), T(TK::Lte), N("E_A")], binop_action),
        rule("E_REL", vec![N("E_REL"), T(TK::Gt), N("E_A")], binop_action),
        rule("E_REL", vec![N("E_REL"), T(TK::Gte), N("E_A")], binop_action),
        rule("E_REL", vec![N("E_A")], |_, mut a| Ok(take(&mut a, 0))),
        rule("E_A", vec![N("E_A"), T(TK::Plus), N("E_M")], binop_action),
        rule("E_A", vec![N("E_A"), T(TK::Minus), N("E_M")], binop_action),
        rule("E_A", vec![N("E_M")], |_, mut a| Ok(take(&mut a, 0))),
        rule("E_M", vec![N("E_M"), T(TK::Star), N("E_RTL")], binop_action),
        rule("E_M", vec![N("E_M"), T(TK::Slash), N("E_RTL")], binop_action),
        rule(
            "E_M",
            vec![N("E_M"), T(TK::Percent), N("E_RTL")],
            binop_action,
        ),
        rule("E_M", vec![N("E_RTL")], |_, mut a| Ok(take(&mut a, 0))),
        // ---- right-to-left unary layer ----
        rule(
            "E_RTL",
            vec![T(TK::Ampersand), N("E_RTL")],
            |b, mut a| {
                let operand = expect_node(take(&mut a, 1))?;
                b.reduce_addressof(operand).map(SemValue::Node)
            },
        ),
        rule("E_RTL", vec![T(TK::Star), N("E_RTL")], |b, mut a| {
            let operand = expect_node(take(&mut a, 1))?;
            b.reduce_dereference(operand).map(SemValue::Node)
        }),
        rule("E_RTL", vec![T(TK::Minus), N("E_RTL")], |b, mut a| {
            let op = expect_token(take(&mut a, 0))?;
            let operand = expect_node(take(&mut a, 1))?;
            b.reduce_unary_operator(&op, operand, Fixity::Prefix)
                .map(SemValue::Node)
        }),
        rule("E_RTL", vec![T(TK::KwNot), N("E_RTL")], |b, mut a| {
            let op = expect_token(take(&mut a, 0))?;
            let operand = expect_node(take(&mut a, 1))?;
            b.reduce_unary_operator(&op, operand, Fixity::Prefix)
                .map(SemValue::Node)
        }),
        rule("E_RTL", vec![N("E_CALL")], |_, mut a| Ok(take(&mut a, 0))),
        // ---- calls, indexing, member access ----
        rule(
            "E_CALL",
            vec![N("E_CALL"), T(TK::LParen), N("E_LIST"), T(TK::RParen)],
            |b, mut a| {
                let callee = expect_node(take(&mut a, 0))?;
                let args = expect_nodes(take(&mut a, 2))?;
                b.reduce_call(callee, args).map(SemValue::Node)
            },
        ),
        rule(
            "E_CALL",
            vec![N("E_CALL"), T(TK::LBrack), N("E"), T(TK::RBrack)],
            |b, mut a| {
                let element = expect_node(take(&mut a, 0))?;
                let key = expect_node(take(&mut a, 2))?;
                b.reduce_index_access(element, key).map(SemValue::Node)
            },
        ),
        rule(
            "E_CALL",
            vec![N("E_CALL"), T(TK::LrArrow), T(TK::Id)],
            |b, mut a| {
                let element = expect_node(take(&mut a, 0))?;
                let field = expect_token(take(&mut a, 2))?;
                b.reduce_pointer_member_access(element, &field.text)
                    .map(SemValue::Node)
            },
        ),
        rule(
            "E_CALL",
            vec![N("E_CALL"), T(TK::Dot), T(TK::Id)],
            |b, mut a| {
                let element = expect_node(take(&mut a, 0))?;
                let field = expect_token(take(&mut a, 2))?;
                b.reduce_member_access(element, &field.text)
                    .map(SemValue::Node)
            },
        ),
        rule("E_CALL", vec![N("E_TERM")], |_, mut a| Ok(take(&mut a, 0))),
        // ---- terms ----
        rule("E_TERM", vec![N("SYMBOL_TERM")], |_, mut a| Ok(take(&mut a, 0))),
        rule("E_TERM", vec![N("LITERAL")], |_, mut a| Ok(take(&mut a, 0))),
        rule(
            "E_TERM",
            vec![T(TK::LParen), N("E"), T(TK::RParen)],
            |_, mut a| Ok(take(&mut a, 1)),
        ),
        rule(
            "E_TERM",
            vec![T(TK::KwTaskStart), N("LAMBDA_DECL")],
            |b, mut a| {
                let closure = expect_node(take(&mut a, 1))?;
                b.reduce_taskstart(closure).map(SemValue::Node)
            },
        ),
        rule("E_TERM", vec![N("LAMBDA_DECL")], |_, mut a| Ok(take(&mut a, 0))),
        rule(
            "E_TERM",
            vec![
                T(TK::KwTaskReady),
                T(TK::LParen),
                N("E"),
                T(TK::RParen),
            ],
            |b, mut a| {
                let task = expect_node(take(&mut a, 2))?;
                b.reduce_taskready(task).map(SemValue::Node)
            },
        ),
        rule(
            "E_TERM",
            vec![
                T(TK::KwTaskResult),
                T(TK::LParen),
                N("E"),
                T(TK::RParen),
            ],
            |b, mut a| {
                let task = expect_node(take(&mut a, 2))?;
                b.reduce_taskresult(task).map(SemValue::Node)
            },
        ),
        rule(
            "E_LIST",
            vec![N("E"), T(TK::Comma), N("E_LIST")],
            |_, mut a| {
                let head = expect_node(take(&mut a, 0))?;
                let mut tail = expect_nodes(take(&mut a, 2))?;
                tail.insert(0, head);
                Ok(SemValue::Nodes(tail))
            },
        ),
        rule("E_LIST", vec![N("E")], |_, mut a| {
            let head = expect_node(take(&mut a, 0))?;
            Ok(SemValue::Nodes(vec![head]))
        }),
        rule("E_LIST", vec![], |_, _| Ok(SemValue::Nodes(Vec::new()))),
        // ---- lambdas ----
        rule(
            "LAMBDA_DECL",
            vec![
                N("LAMBDA_HEADER"),
                T(TK::Colon),
                N("DATA_TYPE"),
                T(TK::RrArrow),
                N("ANON_SCOPED_BLOCK_ENCAPSULED"),
                N("SCOPE_POP"),
            ],
            |b, mut a| {
                let header = expect_lambda_header(take(&mut a, 0))?;
                let ret = expect_type(take(&mut a, 2))?;
                let body = expect_node(take(&mut a, 4))?;
                b.reduce_lambda(header, body, Some(ret)).map(SemValue::Node)
            },
        ),
        rule(
            "LAMBDA_DECL",
            vec![
                N("LAMBDA_HEADER"),
                T(TK::RrArrow),
                N("ANON_SCOPED_BLOCK_ENCAPSULED"),
                N("SCOPE_POP"),
            ],
            |b, mut a| {
                let header = expect_lambda_header(take(&mut a, 0))?;
                let body = expect_node(take(&mut a, 2))?;
                b.reduce_lambda(header, body, None).map(SemValue::Node)
            },
        ),
        rule(
            "LAMBDA_DECL",
            vec![
                N("LAMBDA_HEADER"),
                T(TK::RrArrow),
                T(TK::LParen),
                N("E"),
                T(TK::RParen),
                N("SCOPE_POP"),
            ],
            |b, mut a| {
                let header = expect_lambda_header(take(&mut a, 0))?;
                let body = expect_node(take(&mut a, 3))?;
                b.reduce_lambda(header, body, None).map(SemValue::Node)
            },
        ),
        rule(
            "LAMBDA_HEADER",
            vec![
                T(TK::KwLambda),
                T(TK::LParen),
                N("SCOPE_PUSH"),
                N("FPARAMS"),
                T(TK::RParen),
            ],
            |b, mut a| {
                let scope = expect_scope(take(&mut a, 2))?;
                let params = expect_params(take(&mut a, 3))?;
                b.reduce_lambda_header(scope, params)
            },
        ),
        // ---- symbols ----
        rule("SYMBOL_TERM", vec![N("SYMBOL")], |b, mut a| {
            let symbol = expect_symbol(take(&mut a, 0))?;
            b.reduce_symbol_term(symbol).map(SemValue::Node)
        }),
        rule("SYMBOL", vec![N("SYM_CHAIN")], |b, mut a| {
            let path = expect_path(take(&mut a, 0))?;
            b.reduce_symbol(&path).map(SemValue::Symbol)
        }),
        rule(
            "SYM_CHAIN",
            vec![T(TK::Id), T(TK::DoubleColon), N("SYM_CHAIN")],
            |_, mut a| {
                let head = expect_token(take(&mut a, 0))?;
                let mut tail = expect_path(take(&mut a, 2))?;
                tail.insert(0, head.text);
                Ok(SemValue::Path(tail))
            },
        ),
        rule("SYM_CHAIN", vec![T(TK::Id)], |_, mut a| {
            let head = expect_token(take(&mut a, 0))?;
            Ok(SemValue::Path(vec![head.text]))
        }),
        // ---- literals ----
        rule("LITERAL", vec![T(TK::LiteralInt)], |b, mut a| {
            let token = expect_token(take(&mut a, 0))?;
            b.reduce_int_literal(&token).map(SemValue::Node)
        }),
        rule("LITERAL", vec![T(TK::LiteralDec)], |b, mut a| {
            let token = expect_token(take(&mut a, 0))?;
            Ok(SemValue::Node(b.reduce_dec_literal(&token)))
        }),
        rule("LITERAL", vec![T(TK::LiteralStr)], |b, mut a| {
            let token = expect_token(take(&mut a, 0))?;
            b.reduce_string_literal(&token).map(SemValue::Node)
        }),
        rule("LITERAL", vec![T(TK::LiteralBool)], |b, mut a| {
            let token = expect_token(take(&mut a, 0))?;
            Ok(SemValue::Node(b.reduce_bool_literal(&token)))
        }),
        // ---- data types ----
        rule("DATA_TYPE", vec![T(TK::KwInt)], type_from_token),
        rule("DATA_TYPE", vec![T(TK::KwBool)], type_from_token),
        rule("DATA_TYPE", vec![T(TK::KwShort)], type_from_token),
        rule("DATA_TYPE", vec![T(TK::KwString)], type_from_token),
        rule("DATA_TYPE", vec![T(TK::KwUint)], type_from_token),
        rule("DATA_TYPE", vec![T(TK::KwUshort)], type_from_token),
        rule("DATA_TYPE", vec![T(TK::KwVoid)], type_from_token),
        rule("DATA_TYPE", vec![N("SYMBOL")], |b, mut a| {
            let symbol = expect_symbol(take(&mut a, 0))?;
            b.reduce_data_type_from_symbol(symbol).map(SemValue::Type)
        }),
        rule("DATA_TYPE", vec![N("DATA_TYPE"), T(TK::Star)], |_, mut a| {
            let ty = expect_type(take(&mut a, 0))?;
            Ok(SemValue::Type(ty.pointer_to()))
        }),
        rule(
            "DATA_TYPE",
            vec![
                N("DATA_TYPE"),
                T(TK::LBrack),
                T(TK::LiteralInt),
                T(TK::RBrack),
            ],
            |b, mut a| {
                let ty = expect_type(take(&mut a, 0))?;
                let length = expect_token(take(&mut a, 2))?;
                b.reduce_data_type_array(ty, &length).map(SemValue::Type)
            },
        ),
        // ---- scope bookkeeping ----
        rule("NAMED_SCOPE_PUSH", vec![], |b, _| {
            b.reduce_named_scope_push()?;
            Ok(SemValue::Unit)
        }),
        rule("SCOPE_PUSH", vec![], |b, _| {
            b.reduce_push_scope().map(SemValue::Scope)
        }),
        rule("SCOPE_POP", vec![], |b, _| {
            b.reduce_pop_scope().map(SemValue::Scope)
        }),
        rule("ID_DEFINES_SCOPE", vec![T(TK::Id)], |b, mut a| {
            let token = expect_token(take(&mut a, 0))?;
            b.named_scopes.push(token.text.clone());
            Ok(SemValue::Token(token))
        }),
        rule("ID_DEFINES_SCOPED_STRUCT", vec![T(TK::Id)], |b, mut a| {
            let token = expect_token(take(&mut a, 0))?;
            b.reduce_id_defines_scoped_struct(&token)
                .map(SemValue::Symbol)
        }),
    ]
}

/// Shared action of every binary operator rule.
fn binop_action(
    b: &mut super::Build<'_>,
    mut a: Vec<Option<SemValue>>,
) -> Result<SemValue, crate::BuildError> {
    let left = expect_node(take(&mut a, 0))?;
    let op = expect_token(take(&mut a, 1))?;
    let right = expect_node(take(&mut a, 2))?;
    b.reduce_binary_operator(left, &op, right).map(SemValue::Node)
}

/// Shared action of the keyword type rules.
fn type_from_token(
    b: &mut super::Build<'_>,
    mut a: Vec<Option<SemValue>>,
) -> Result<SemValue, crate::BuildError> {
    let token = expect_token(take(&mut a, 0))?;
    b.reduce_data_type_from_token(&token).map(SemValue::Type)
}
