use indoc::indoc;

use crate::ast::{LitValue, NodeKind};
use crate::symbols::{DataType, SymbolKind};
use crate::test_utils::{find_node, find_nodes, parse, parse_err};
use crate::{BuildError, Error, ScopeError, TypeError};

#[test]
fn arithmetic_precedence() {
    // var r: int = 1 + 2 * 3  parses as  r = 1 + (2 * 3)
    let (_env, ast, root) = parse("var r: int = 1 + 2 * 3;");

    let assign = find_node(&ast, root, |k| matches!(k, NodeKind::Assign { .. })).unwrap();
    let NodeKind::Assign { right, .. } = &ast.node(assign).kind else {
        unreachable!();
    };
    let NodeKind::Binary { op, left, right } = &ast.node(*right).kind else {
        panic!("rhs is a binary node");
    };
    assert_eq!(op.symbol, "+");
    assert!(matches!(
        ast.node(*left).kind,
        NodeKind::Literal(LitValue::Int(1))
    ));
    let NodeKind::Binary { op, left, right } = &ast.node(*right).kind else {
        panic!("nested rhs is a binary node");
    };
    assert_eq!(op.symbol, "*");
    assert!(matches!(ast.node(*left).kind, NodeKind::Literal(LitValue::Int(2))));
    assert!(matches!(ast.node(*right).kind, NodeKind::Literal(LitValue::Int(3))));
}

#[test]
fn vdecl_lowers_to_declaration_plus_assignment() {
    let (env, ast, root) = parse("var r: int = 7;");
    let children = ast.children(root);
    assert!(matches!(ast.node(children[0]).kind, NodeKind::VDecl { .. }));
    assert!(matches!(ast.node(children[1]).kind, NodeKind::Assign { .. }));

    let NodeKind::VDecl { variable } = ast.node(children[0]).kind else {
        unreachable!();
    };
    assert_eq!(env.table.symbol(variable).name, "r");
    assert_eq!(
        env.table.symbol(variable).data_type(),
        Some(&env.dtype_int())
    );
}

#[test]
fn assignment_inserts_int_to_float_conversion() {
    let (env, ast, root) = parse("var f: float = 1;");
    let assign = find_node(&ast, root, |k| matches!(k, NodeKind::Assign { .. })).unwrap();
    let NodeKind::Assign { right, .. } = &ast.node(assign).kind else {
        unreachable!();
    };
    let NodeKind::TypeConvert { from, to, expr } = &ast.node(*right).kind else {
        panic!("conversion node expected on the rhs");
    };
    assert_eq!(from, &env.dtype_int());
    assert_eq!(to, &env.dtype_float());
    assert!(matches!(ast.node(*expr).kind, NodeKind::Literal(LitValue::Int(1))));
}

#[test]
fn missing_converter_is_a_type_error() {
    let err = parse_err("var b: bool = 1;");
    assert!(matches!(
        err,
        Error::Parse(cels_core::ParseError::Action { ref message, .. })
            if message.contains("could not convert")
    ));
}

#[test]
fn struct_methods_get_implicit_this() {
    let source = indoc! {"
        struct P begin
            var x: int;
            function get(): int begin
                return x;
            end;
        end;
    "};
    let (env, ast, root) = parse(source);

    // the method overload has `this: P*` prepended
    let p = env.table.resolve(env.table.root(), &["P"]).unwrap();
    let get = env
        .table
        .resolve(env.table.root(), &["P", "get"])
        .unwrap();
    let SymbolKind::Function { overloads, declaring } = &env.table.symbol(get).kind else {
        panic!("get is a function");
    };
    assert_eq!(*declaring, Some(p));
    let overload = env.table.overload(overloads[0]);
    let this = env.table.symbol(overload.params[0]);
    assert_eq!(this.name, "this");
    assert_eq!(this.data_type(), Some(&DataType::Named(p).pointer_to()));

    // the bare `x` in the body reads through `this`
    let field_access =
        find_node(&ast, root, |k| matches!(k, NodeKind::FieldAccess { .. })).unwrap();
    let NodeKind::FieldAccess { element, field } = &ast.node(field_access).kind else {
        unreachable!();
    };
    assert_eq!(env.table.symbol(*field).name, "x");
    let NodeKind::Dereference { operand } = &ast.node(*element).kind else {
        panic!("field access reads through a dereference");
    };
    let NodeKind::SymbolTerm { symbol } = &ast.node(*operand).kind else {
        panic!("dereference of the this parameter");
    };
    assert_eq!(env.table.symbol(*symbol).name, "this");
}

#[test]
fn overload_resolution_prefers_fewer_conversions() {
    let source = indoc! {"
        extern function f(x: int): void;
        extern function f(x: float): void;
        f(1);
    "};
    let (env, ast, root) = parse(source);
    let call = find_node(&ast, root, |k| matches!(k, NodeKind::Call { .. })).unwrap();
    let NodeKind::Call { overload, args, .. } = &ast.node(call).kind else {
        unreachable!();
    };
    let chosen = env.table.overload(*overload);
    let param = env.table.symbol(chosen.params[0]);
    assert_eq!(param.data_type(), Some(&env.dtype_int()));
    // exact match: no conversion wrapper
    assert!(matches!(ast.node(args[0]).kind, NodeKind::Literal(_)));
}

#[test]
fn overload_resolution_converts_when_needed() {
    let source = indoc! {"
        extern function f(x: float): void;
        f(1);
    "};
    let (_env, ast, root) = parse(source);
    let call = find_node(&ast, root, |k| matches!(k, NodeKind::Call { .. })).unwrap();
    let NodeKind::Call { args, .. } = &ast.node(call).kind else {
        unreachable!();
    };
    assert!(matches!(
        ast.node(args[0]).kind,
        NodeKind::TypeConvert { .. }
    ));
}

#[test]
fn tied_overloads_are_ambiguous() {
    // short converts to both int and float, one conversion each
    let source = indoc! {"
        extern function f(x: int): void;
        extern function f(x: float): void;
        var s: short;
        f(s);
    "};
    let err = parse_err(source);
    assert!(matches!(
        err,
        Error::Parse(cels_core::ParseError::Action { ref message, .. })
            if message.contains("Ambiguous") || message.contains("ambiguous")
    ));
}

#[test]
fn no_matching_overload_is_reported() {
    let source = indoc! {"
        extern function f(x: int): void;
        var b: bool;
        f(b, b);
    "};
    let err = parse_err(source);
    assert!(matches!(
        err,
        Error::Parse(cels_core::ParseError::Action { ref message, .. })
            if message.contains("no match")
    ));
}

#[test]
fn calling_a_non_function_fails() {
    let err = parse_err("var x: int = 0; x(1);");
    assert!(matches!(
        err,
        Error::Parse(cels_core::ParseError::Action { ref message, .. })
            if message.contains("not callable")
    ));
}

#[test]
fn unknown_symbols_are_scope_errors() {
    let err = parse_err("var x: int = nope;");
    assert!(matches!(
        err,
        Error::Parse(cels_core::ParseError::Action { ref message, .. })
            if message.contains("could not be identified")
    ));
}

#[test]
fn duplicate_variables_are_rejected() {
    let err = parse_err("var x: int; var x: int;");
    assert!(matches!(
        err,
        Error::Parse(cels_core::ParseError::Action { ref message, .. })
            if message.contains("Duplicate") || message.contains("duplicate")
    ));
}

#[test]
fn dereferencing_non_pointer_fails() {
    let err = parse_err("var x: int = 0; var y: int = *x;");
    assert!(matches!(
        err,
        Error::Parse(cels_core::ParseError::Action { ref message, .. })
            if message.contains("non-pointer")
    ));
}

#[test]
fn packages_become_scopes() {
    let source = indoc! {"
        package game begin
            var score: int;
        end;
    "};
    let (env, _ast, _root) = parse(source);
    let score = env
        .table
        .resolve(env.table.root(), &["game", "score"])
        .unwrap();
    assert_eq!(env.table.symbol(score).full_name, "::game::score");
    let scope = env.table.symbol(score).scope;
    assert!(env.table.scope(scope).is_package);
}

#[test]
fn qualified_names_resolve_across_packages() {
    let source = indoc! {"
        package a begin
            var x: int;
        end;
        var y: int = a::x;
    "};
    let (_env, ast, root) = parse(source);
    assert!(find_node(&ast, root, |k| matches!(k, NodeKind::Assign { .. })).is_some());
}

#[test]
fn pointer_types_and_address_of() {
    let source = indoc! {"
        var x: int;
        var p: int* = &x;
        var y: int = *p;
    "};
    let (_env, ast, root) = parse(source);
    assert!(find_node(&ast, root, |k| matches!(k, NodeKind::AddressOf { .. })).is_some());
    assert!(find_node(&ast, root, |k| matches!(k, NodeKind::Dereference { .. })).is_some());
}

#[test]
fn array_indexing_uses_the_array_archetype() {
    let source = indoc! {"
        var items: int[4];
        var first: int = items[0];
    "};
    let (_env, ast, root) = parse(source);
    let access = find_node(&ast, root, |k| matches!(k, NodeKind::IndexAccess { .. })).unwrap();
    let NodeKind::IndexAccess { indexer, .. } = &ast.node(access).kind else {
        unreachable!();
    };
    assert_eq!(indexer.archetype, "static_array");
}

#[test]
fn unary_operators_resolve() {
    let (_env, ast, root) = parse("var x: int = -1; var b: bool = not true;");
    let unaries = find_nodes(&ast, root, |k| matches!(k, NodeKind::Unary { .. }));
    assert_eq!(unaries.len(), 2);
}

#[test]
fn method_call_passes_receiver_address() {
    let source = indoc! {"
        struct P begin
            var x: int;
            function get(): int begin
                return x;
            end;
        end;
        var p: P;
        var v: int = p.get();
    "};
    let (env, ast, root) = parse(source);
    let call = find_node(&ast, root, |k| matches!(k, NodeKind::Call { .. })).unwrap();
    let NodeKind::Call { overload, args, .. } = &ast.node(call).kind else {
        unreachable!();
    };
    assert_eq!(env.table.overload(*overload).params.len(), 1);
    assert!(matches!(ast.node(args[0]).kind, NodeKind::AddressOf { .. }));
}

#[test]
fn closure_captures_locals_as_pointers() {
    let source = indoc! {"
        function main(): void begin
            var a: int = 0;
            var h = lambda (x: int) => (x + a);
        end;
    "};
    let (env, ast, root) = parse(source);

    let closure = find_node(&ast, root, |k| matches!(k, NodeKind::Closure { .. })).unwrap();
    let NodeKind::Closure {
        overload, captured, ..
    } = &ast.node(closure).kind
    else {
        unreachable!();
    };

    // one capture: &a
    assert_eq!(captured.len(), 1);
    let NodeKind::AddressOf { operand } = &ast.node(captured[0]).kind else {
        panic!("captures are passed by address");
    };
    let NodeKind::SymbolTerm { symbol } = &ast.node(*operand).kind else {
        panic!("capture of a plain variable");
    };
    assert_eq!(env.table.symbol(*symbol).name, "a");

    // synthetic global function with pointer capture + own parameter
    let lambda = env.table.overload(*overload);
    let func = env.table.symbol(lambda.function);
    assert!(func.name.starts_with("icels_lambda_"));
    assert_eq!(func.scope, env.table.root());
    assert_eq!(lambda.params.len(), 2);
    let capture_param = env.table.symbol(lambda.params[0]);
    assert_eq!(
        capture_param.data_type(),
        Some(&env.dtype_int().pointer_to())
    );

    // the expression body became `return (x + *a)`
    let body = lambda.implementation.unwrap();
    let ret = find_node(&ast, body, |k| matches!(k, NodeKind::Return { .. })).unwrap();
    let deref = find_node(&ast, ret, |k| matches!(k, NodeKind::Dereference { .. }));
    assert!(deref.is_some(), "captured reference reads through the pointer");
}

#[test]
fn globals_are_not_captured() {
    let source = indoc! {"
        var g: int;
        function main(): void begin
            var h = lambda (x: int) => (x + g);
        end;
    "};
    let (_env, ast, root) = parse(source);
    let closure = find_node(&ast, root, |k| matches!(k, NodeKind::Closure { .. })).unwrap();
    let NodeKind::Closure { captured, .. } = &ast.node(closure).kind else {
        unreachable!();
    };
    assert!(captured.is_empty());
}

#[test]
fn lambda_with_multiframe_call_is_marked_multiframe() {
    let source = indoc! {"
        extern multiframe function step(): int;
        function main(): void begin
            var t = taskstart lambda (): int => begin
                return step();
            end;
        end;
    "};
    let (env, ast, root) = parse(source);
    let task = find_node(&ast, root, |k| matches!(k, NodeKind::TaskStart { .. })).unwrap();
    let NodeKind::TaskStart { closure } = &ast.node(task).kind else {
        unreachable!();
    };
    let NodeKind::Closure { overload, .. } = &ast.node(*closure).kind else {
        panic!("taskstart wraps a closure");
    };
    assert!(env.table.overload(*overload).is_multiframe);

    // taskstart produces task<int>
    assert_eq!(ast.ty(task), Some(&env.dtype_int().task_of()));
}

#[test]
fn taskready_requires_a_task() {
    let source = indoc! {"
        var x: int;
        var b: bool = taskready(x);
    "};
    let err = parse_err(source);
    assert!(matches!(
        err,
        Error::Parse(cels_core::ParseError::Action { ref message, .. })
            if message.contains("non-task")
    ));
}

#[test]
fn import_paths_are_recorded() {
    let source = indoc! {r#"
        import "util.cels";
        var x: int;
    "#};
    let mut env = crate::env::Env::default_env();
    let mut ast = crate::ast::Ast::new();
    let (_, imports) = crate::test_utils::parser()
        .parse_source(&mut env, &mut ast, source)
        .unwrap();
    assert_eq!(imports, ["util.cels"]);
}

#[test]
fn syntax_error_carries_position() {
    let err = parse_err("var = 3;");
    match err {
        Error::Parse(cels_core::ParseError::UnexpectedToken { line, col, lexeme }) => {
            assert_eq!(line, 1);
            assert_eq!(col, 5);
            assert_eq!(lexeme, "=");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn error_enums_render_usable_messages() {
    let scope_err = ScopeError::UnknownSymbol {
        name: "foo".to_owned(),
        scope: "::pkg".to_owned(),
    };
    assert_eq!(
        scope_err.to_string(),
        "symbol could not be identified: foo under ::pkg"
    );

    let type_err: BuildError = TypeError::NoBinaryOperator {
        symbol: "+".to_owned(),
        left: "::bool".to_owned(),
        right: "::int".to_owned(),
    }
    .into();
    assert_eq!(
        type_err.to_string(),
        "no definition for operator +(::bool, ::int)"
    );
}
