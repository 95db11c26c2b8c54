//! End-to-end: source text in, C++ translation unit out.

use indoc::indoc;

use cels_compiler::Compiler;

#[test]
fn full_program_compiles_to_cpp() {
    let source = indoc! {"
        package demo begin
            struct Point begin
                var x: int;
                var y: int;
                function sum(): int begin
                    return x + y;
                end;
            end;

            function scale(v: int, k: int): int begin
                return v * k;
            end;

            extern multiframe function next_frame(): int;

            multiframe function counter(limit: int): int begin
                var total: int = 0;
                while total < limit do begin
                    total = total + next_frame();
                    suspend;
                end;
                return total;
            end;
        end;
    "};

    let out = Compiler::compile_source(source).expect("program compiles");

    // prologue and namespace
    assert!(out.starts_with("#include <Celesta>"));
    assert!(out.contains("namespace demo"));

    // plain declarations
    assert!(out.contains("struct Point"));
    assert!(out.contains("int sum()"));
    assert!(out.contains("return ((*(this)).x + (*(this)).y);"));
    assert!(out.contains("int scale(int v, int k)"));
    assert!(out.contains("return (v * k);"));

    // the multiframe function becomes an activation-record struct
    assert!(out.contains("struct counter"));
    assert!(out.contains("} params;"));
    assert!(out.contains("int limit;"));
    assert!(out.contains("int return_value;"));
    assert!(out.contains("int total;"));

    // state machine plumbing
    assert!(out.contains("inline static void f0(void* _ctx, Celesta::ExecutionController* ctrl)"));
    assert!(out.contains("goto L_"));
    assert!(out.contains("ctrl->suspend();"));
    assert!(out.contains("ctrl->jump(ctx, counter::f"));
    assert!(out.contains("auto* f = ctrl->push<::demo::next_frame>();"));
    assert!(out.contains("ctrl->call(f, ::demo::next_frame::f0, ctx, counter::f"));
    assert!(out.contains("ctrl->pop();"));
    assert!(out.contains("inline static void f_cleanup"));
    assert!(out.contains("ctx->return_value = ctx->total;"));

    // the loop condition reads frame slots
    assert!(out.contains("(ctx->total < ctx->params.limit)"));
}

#[test]
fn multiple_sources_share_one_environment() {
    let mut compiler = Compiler::new().unwrap();
    compiler
        .add_source("package lib begin var shared: int; end;")
        .unwrap();
    compiler
        .add_source("var local: int = lib::shared;")
        .unwrap();
    let out = compiler.finish().unwrap();
    assert!(out.contains("namespace lib"));
    assert!(out.contains("int shared;"));
    assert!(out.contains("::local = ::lib::shared;"));
}

#[test]
fn first_error_aborts_the_pipeline() {
    let mut compiler = Compiler::new().unwrap();
    let err = compiler.add_source("var x: int = missing;").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("missing"));
}
