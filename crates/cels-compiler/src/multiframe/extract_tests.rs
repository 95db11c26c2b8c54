use indoc::indoc;

use crate::ast::{NodeKind};
use crate::multiframe::extract_multiframe_calls;
use crate::symbols::SymbolKind;
use crate::test_utils::{find_node, parse};

/// Parse, run extraction, return everything plus `m`'s body.
fn extracted(source: &str) -> (crate::env::Env, crate::ast::Ast, crate::ast::NodeId) {
    let (mut env, mut ast, root) = parse(source);
    extract_multiframe_calls(&mut env, &mut ast, root).unwrap();

    let m = env.table.resolve(env.table.root(), &["m"]).unwrap();
    let SymbolKind::Function { overloads, .. } = &env.table.symbol(m).kind else {
        panic!("m is a function");
    };
    let body = env
        .table
        .overload(overloads[0])
        .implementation
        .expect("m has a body");
    (env, ast, body)
}

#[test]
fn nested_call_is_pulled_into_a_temporary() {
    let source = indoc! {"
        extern multiframe function g(): int;
        multiframe function m(): void begin
            var a: int = g() + 1;
        end;
    "};
    let (env, ast, body) = extracted(source);

    let children = ast.children(body);
    assert_eq!(children.len(), 4);
    // var a; var cels_s<n>; cels_s<n> = g(); a = cels_s<n> + 1;
    assert!(matches!(ast.node(children[0]).kind, NodeKind::VDecl { .. }));
    let NodeKind::VDecl { variable } = ast.node(children[1]).kind else {
        panic!("second statement declares the temporary");
    };
    assert!(env.table.symbol(variable).name.starts_with("cels_s"));

    let NodeKind::Assign { left, right } = ast.node(children[2]).kind else {
        panic!("third statement assigns the call result");
    };
    assert!(matches!(ast.node(left).kind, NodeKind::SymbolTerm { .. }));
    assert!(matches!(ast.node(right).kind, NodeKind::Call { .. }));

    let NodeKind::Assign { right, .. } = ast.node(children[3]).kind else {
        panic!("fourth statement is the original assignment");
    };
    let NodeKind::Binary { left, .. } = ast.node(right).kind else {
        panic!("rhs still adds one");
    };
    let NodeKind::SymbolTerm { symbol } = ast.node(left).kind else {
        panic!("the call site now reads the temporary");
    };
    assert_eq!(symbol, variable);
}

#[test]
fn while_condition_is_rewritten_and_reread() {
    let source = indoc! {"
        extern multiframe function g(): int;
        multiframe function m(): void begin
            while g() do begin
                suspend;
            end;
        end;
    "};
    let (env, ast, body) = extracted(source);

    let children = ast.children(body);
    assert_eq!(children.len(), 3);
    assert!(matches!(ast.node(children[0]).kind, NodeKind::VDecl { .. }));
    assert!(matches!(ast.node(children[1]).kind, NodeKind::Assign { .. }));

    let NodeKind::While { condition, body: loop_body } = ast.node(children[2]).kind else {
        panic!("loop survives the rewrite");
    };
    let NodeKind::SymbolTerm { symbol } = ast.node(condition).kind else {
        panic!("condition reads the temporary");
    };
    assert!(env.table.symbol(symbol).name.starts_with("cels_s"));

    // loop body gained the re-evaluating assignment at its end
    let loop_children = ast.children(loop_body);
    assert_eq!(loop_children.len(), 2);
    assert!(matches!(ast.node(loop_children[0]).kind, NodeKind::Suspend));
    let NodeKind::Assign { left, right } = ast.node(loop_children[1]).kind else {
        panic!("loop re-reads the condition");
    };
    assert!(matches!(ast.node(left).kind, NodeKind::SymbolTerm { .. }));
    assert!(matches!(ast.node(right).kind, NodeKind::Call { .. }));
}

#[test]
fn bare_call_statement_is_left_alone() {
    let source = indoc! {"
        extern multiframe function g(): int;
        multiframe function m(): void begin
            g();
        end;
    "};
    let (_env, ast, body) = extracted(source);
    let children = ast.children(body);
    assert_eq!(children.len(), 1);
    assert!(matches!(ast.node(children[0]).kind, NodeKind::Call { .. }));
}

#[test]
fn chained_calls_extract_recursively() {
    let source = indoc! {"
        extern multiframe function g(): int;
        extern multiframe function h(x: int): int;
        multiframe function m(): void begin
            var a: int = h(g());
        end;
    "};
    let (env, ast, body) = extracted(source);

    // both calls end up assigned to temporaries, inner first
    let mut call_assigns = Vec::new();
    for child in ast.children(body) {
        if let NodeKind::Assign { right, .. } = ast.node(child).kind {
            if let NodeKind::Call { overload, .. } = ast.node(right).kind {
                call_assigns.push(overload);
            }
        }
    }
    assert_eq!(call_assigns.len(), 2);
    let names: Vec<String> = call_assigns
        .iter()
        .map(|&ov| env.table.symbol(env.table.overload(ov).function).name.clone())
        .collect();
    assert!(names.contains(&"g".to_owned()));
    assert!(names.contains(&"h".to_owned()));

    // h's argument is now a temporary, not the g() call
    let h_assign = call_assigns
        .iter()
        .position(|&ov| env.table.symbol(env.table.overload(ov).function).name == "h")
        .unwrap();
    let _ = h_assign;
    let h_call = find_node(&ast, body, |k| {
        matches!(k, NodeKind::Call { overload, .. }
            if env.table.symbol(env.table.overload(*overload).function).name == "h")
    })
    .unwrap();
    let NodeKind::Call { args, .. } = &ast.node(h_call).kind else {
        unreachable!();
    };
    assert!(matches!(ast.node(args[0]).kind, NodeKind::SymbolTerm { .. }));
}
