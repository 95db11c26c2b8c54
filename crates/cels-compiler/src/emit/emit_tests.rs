use indoc::indoc;

use crate::Compiler;

fn compile(source: &str) -> String {
    Compiler::compile_source(source).expect("test source compiles")
}

#[test]
fn globals_and_initialization() {
    let out = compile("var r: int = 1 + 2 * 3;");
    assert!(out.contains("#include <Celesta>"));
    assert!(out.contains("int r;"));
    assert!(out.contains("::r = (1 + (2 * 3));"));
}

#[test]
fn assignment_conversion_casts() {
    let out = compile("var f: float = 1;");
    assert!(out.contains("float f;"));
    assert!(out.contains("::f = ((float)(1));"));
}

#[test]
fn struct_with_method_reads_through_this() {
    let source = indoc! {"
        struct P begin
            var x: int;
            function get(): int begin
                return x;
            end;
        end;
    "};
    let out = compile(source);
    assert!(out.contains("struct P"));
    assert!(out.contains("int x;"));
    assert!(out.contains("int get()"));
    assert!(out.contains("return (*(this)).x;"));
}

#[test]
fn packages_map_to_namespaces() {
    let source = indoc! {"
        package game begin
            var score: int;
            function reset(): void begin
                score = 0;
            end;
        end;
    "};
    let out = compile(source);
    assert!(out.contains("namespace game"));
    assert!(out.contains("int score;"));
    assert!(out.contains("void reset()"));
    assert!(out.contains("::game::score = 0;"));
}

#[test]
fn extern_functions_emit_declarations_only() {
    let source = indoc! {r#"
        cppinclude("celesta_io.h") extern function print(x: int): void;
        print(42);
    "#};
    let out = compile(source);
    assert!(out.contains("#include \"celesta_io.h\""));
    assert!(out.contains("void print(int x);"));
    assert!(out.contains("::print(42);"));
}

#[test]
fn declarations_are_dependency_ordered() {
    // `use` sits in the root scope, which is walked before packages;
    // the sort must still put `A` first
    let source = indoc! {"
        package p begin
            struct A begin
                var v: int;
            end;
        end;
        extern function consume(a: p::A): void;
    "};
    let out = compile(source);
    let struct_pos = out.find("struct A").expect("struct A emitted");
    let use_pos = out.find("void consume(").expect("consume emitted");
    assert!(struct_pos < use_pos, "dependency must precede its user");
}

#[test]
fn multiframe_function_emits_a_state_machine() {
    let source = indoc! {"
        extern multiframe function g(): int;
        multiframe function m(): int begin
            var a: int = g();
            suspend;
            return a + 1;
        end;
    "};
    let out = compile(source);

    // the activation record struct
    assert!(out.contains("struct m"));
    assert!(out.contains("int return_value;"));
    assert!(out.contains("int a;"));

    // component entry points and the cleanup hook
    assert!(out.contains("inline static void f0(void* _ctx, Celesta::ExecutionController* ctrl)"));
    assert!(out.contains("inline static void f1("));
    assert!(out.contains("inline static void f_cleanup(void* _ctx, Celesta::ExecutionController*)"));

    // the call protocol
    assert!(out.contains("auto* f = ctrl->push<::g>();"));
    assert!(out.contains("ctrl->call(f, ::g::f0, ctx,"));
    assert!(out.contains("auto* f = ctrl->peek<::g>();"));
    assert!(out.contains("= f->return_value;"));
    assert!(out.contains("ctrl->pop();"));

    // suspension and return
    assert!(out.contains("ctrl->suspend();"));
    assert!(out.contains("ctx->return_value = (ctx->a + 1);"));
    assert!(out.contains("ctrl->ret(); return;"));

    // locals are frame slots
    assert!(out.contains("ctx->a ="));
}

#[test]
fn multiframe_params_live_in_the_params_struct() {
    let source = indoc! {"
        multiframe function m(base: int): int begin
            suspend;
            return base;
        end;
    "};
    let out = compile(source);
    assert!(out.contains("} params;"));
    assert!(out.contains("int base;"));
    assert!(out.contains("ctx->return_value = ctx->params.base;"));
}

#[test]
fn multiframe_state_machine_uses_labels_and_jumps() {
    let source = indoc! {"
        multiframe function m(): void begin
            var x: int = 0;
            while x < 3 do begin
                suspend;
                x = x + 1;
            end;
        end;
    "};
    let out = compile(source);
    assert!(out.contains("goto L_"));
    assert!(out.contains(") goto L_"), "conditionals branch between labels");
    assert!(out.contains("ctrl->jump(ctx, m::f"));
    assert!(out.contains("ctrl->suspend();"));
}

#[test]
fn task_locals_get_task_data_slots_and_cleanup() {
    let source = indoc! {"
        extern multiframe function work(): int;
        multiframe function m(): void begin
            var t = taskstart lambda (): int => begin
                return work();
            end;
            while not taskready(t) do begin
                suspend;
            end;
        end;
    "};
    let out = compile(source);
    assert!(out.contains("Celesta::TaskData<int> t;"));
    assert!(out.contains("ctx->t.detach();"));
    assert!(out.contains("ctrl->start_task<::icels_lambda_1>"));
    assert!(out.contains("(ctx->t).ready()"));
}

#[test]
fn header_flags_reach_the_prologue() {
    let mut compiler = Compiler::new().unwrap();
    compiler
        .prologue
        .system_includes
        .push("vector".to_owned());
    compiler.prologue.local_includes.push("host.h".to_owned());
    compiler.add_source("var x: int;").unwrap();
    let out = compiler.finish().unwrap();
    assert!(out.contains("#include <Celesta>"));
    assert!(out.contains("#include <vector>"));
    assert!(out.contains("#include \"host.h\""));
}

#[test]
fn emission_is_deterministic() {
    let source = indoc! {"
        package a begin
            var x: int;
        end;
        package b begin
            var y: float;
        end;
    "};
    assert_eq!(compile(source), compile(source));
}
