use compiler::{CompileError, CompiledScript, Compiler};
use memory::Function;
use stilt_parser::ast::{Program, Stmt};
use stilt_parser::parse_program;
use vm::OpCode;

fn compile(source: &str) -> CompiledScript {
    let program = parse_program(source).expect("source parses");
    Compiler::new().compile(&program).expect("source compiles")
}

fn function_constants(script: &CompiledScript) -> Vec<&Function> {
    script
        .constants
        .iter()
        .filter_map(|c| c.as_function().map(|f| f.as_ref()))
        .collect()
}

#[test]
fn function_prototype_carries_params_and_code() {
    let script = compile("fun add(a, b) { return a + b; }");
    let funcs = function_constants(&script);
    assert_eq!(funcs.len(), 1);
    let add = funcs[0];
    assert_eq!(add.num_params, 2);
    assert_eq!(add.num_upvalues, 0);
    assert_eq!(
        add.code,
        vec![
            OpCode::GetLocal.as_u8(),
            0,
            0,
            OpCode::GetLocal.as_u8(),
            0,
            1,
            OpCode::Add.as_u8(),
            OpCode::Return.as_u8(),
        ]
    );
    // The prototype is materialized through CLOSURE, then bound.
    assert_eq!(
        script.code,
        vec![
            OpCode::Closure.as_u8(),
            0,
            OpCode::SetGlobal.as_u8(),
            0,
            0,
        ]
    );
}

#[test]
fn missing_return_gets_nil_return_epilogue() {
    let script = compile("fun noop() { }");
    let funcs = function_constants(&script);
    assert_eq!(
        funcs[0].code,
        vec![OpCode::Nil.as_u8(), OpCode::Return.as_u8()]
    );
}

#[test]
fn explicit_return_suppresses_epilogue() {
    let script = compile("fun one() { return 1; }");
    let funcs = function_constants(&script);
    assert_eq!(
        funcs[0].code,
        vec![
            OpCode::Constant.as_u8(),
            0,
            OpCode::Return.as_u8(),
        ]
    );
}

#[test]
fn conditional_return_keeps_the_epilogue() {
    // The skipped branch leaves a path that never returns.
    let script = compile("fun f() { if (false) { return 1; } }");
    let funcs = function_constants(&script);
    let code = &funcs[0].code;
    assert_eq!(
        &code[code.len() - 2..],
        &[OpCode::Nil.as_u8(), OpCode::Return.as_u8()]
    );
}

#[test]
fn loop_return_keeps_the_epilogue() {
    let script = compile("fun f() { while (false) { return 1; } }");
    let funcs = function_constants(&script);
    let code = &funcs[0].code;
    assert_eq!(
        &code[code.len() - 2..],
        &[OpCode::Nil.as_u8(), OpCode::Return.as_u8()]
    );
}

#[test]
fn block_return_keeps_the_epilogue() {
    let script = compile("fun f() { { return 1; } }");
    let funcs = function_constants(&script);
    let code = &funcs[0].code;
    assert_eq!(
        &code[code.len() - 2..],
        &[OpCode::Nil.as_u8(), OpCode::Return.as_u8()]
    );
}

#[test]
fn trailing_return_after_conditional_suppresses_epilogue() {
    let script = compile("fun f(n) { if (n < 0) { return 0; } return n; }");
    let funcs = function_constants(&script);
    let code = &funcs[0].code;
    // The body ends with `GET_LOCAL 0; RETURN`, not the nil epilogue.
    assert_eq!(*code.last().unwrap(), OpCode::Return.as_u8());
    assert_ne!(code[code.len() - 2], OpCode::Nil.as_u8());
}

#[test]
fn bare_return_returns_nil() {
    let script = compile("fun nothing() { return; }");
    let funcs = function_constants(&script);
    assert_eq!(
        funcs[0].code,
        vec![OpCode::Nil.as_u8(), OpCode::Return.as_u8()]
    );
}

#[test]
fn inner_function_captures_enclosing_local() {
    let script = compile(
        "fun outer() { var x = 1; fun inner() { print x; } inner(); } outer();",
    );
    let funcs = function_constants(&script);
    assert_eq!(funcs.len(), 2);

    // Constants are appended innermost-first.
    let inner = funcs[0];
    assert_eq!(inner.num_upvalues, 1);
    assert_eq!(
        inner.code,
        vec![
            OpCode::GetUpvalue.as_u8(),
            0,
            0,
            OpCode::Print.as_u8(),
            OpCode::Nil.as_u8(),
            OpCode::Return.as_u8(),
        ]
    );

    let outer = funcs[1];
    assert_eq!(outer.num_upvalues, 0);
    assert_eq!(
        outer.code,
        vec![
            // var x = 1;
            OpCode::Constant.as_u8(),
            0,
            OpCode::SetLocal.as_u8(),
            0,
            0,
            // fun inner: CLOSURE idx + (is_local=1, index=0), bound to slot 1
            OpCode::Closure.as_u8(),
            1,
            1,
            0,
            OpCode::SetLocal.as_u8(),
            0,
            1,
            // inner();
            OpCode::GetLocal.as_u8(),
            0,
            1,
            OpCode::Call.as_u8(),
            0,
            0,
            OpCode::Pop.as_u8(),
            OpCode::Nil.as_u8(),
            OpCode::Return.as_u8(),
        ]
    );
}

#[test]
fn two_level_capture_rechains_through_middle() {
    let script = compile(
        "fun outer() { var x = 1; fun middle() { fun inner() { print x; } inner(); } middle(); } \
         outer();",
    );
    let funcs = function_constants(&script);
    assert_eq!(funcs.len(), 3);

    let inner = funcs[0];
    let middle = funcs[1];
    let outer = funcs[2];

    // inner re-captures middle's upvalue 0; middle captures outer's local.
    assert_eq!(inner.num_upvalues, 1);
    assert_eq!(middle.num_upvalues, 1);
    assert_eq!(outer.num_upvalues, 0);

    // middle's CLOSURE for inner carries (is_local=0, index=0).
    let closure_at = middle
        .code
        .iter()
        .position(|&b| b == OpCode::Closure.as_u8())
        .expect("middle builds inner's closure");
    // Operand: inner's constant index; metadata: re-capture upvalue 0.
    assert_eq!(middle.code[closure_at + 1], 1);
    assert_eq!(&middle.code[closure_at + 2..closure_at + 4], &[0, 0]);
}

#[test]
fn sibling_captures_are_deduplicated_per_function() {
    let script = compile(
        "fun outer() { var x = 1; fun inner() { print x + x; } inner(); } outer();",
    );
    let funcs = function_constants(&script);
    let inner = funcs[0];
    // Two reads of `x` resolve to the same upvalue slot.
    assert_eq!(inner.num_upvalues, 1);
    assert_eq!(
        inner.code,
        vec![
            OpCode::GetUpvalue.as_u8(),
            0,
            0,
            OpCode::GetUpvalue.as_u8(),
            0,
            0,
            OpCode::Add.as_u8(),
            OpCode::Print.as_u8(),
            OpCode::Nil.as_u8(),
            OpCode::Return.as_u8(),
        ]
    );
}

#[test]
fn assignment_to_captured_name_uses_set_upvalue() {
    let script = compile(
        "fun outer() { var x = 1; fun inner() { x = 2; } inner(); } outer();",
    );
    let funcs = function_constants(&script);
    let inner = funcs[0];
    assert_eq!(
        inner.code,
        vec![
            OpCode::Constant.as_u8(),
            1,
            OpCode::SetUpvalue.as_u8(),
            0,
            0,
            OpCode::Nil.as_u8(),
            OpCode::Return.as_u8(),
        ]
    );
}

#[test]
fn nested_function_binds_to_local_slot() {
    let script = compile("fun outer() { fun inner() { } } outer();");
    let funcs = function_constants(&script);
    let outer = funcs[1];
    // inner is outer's local 0.
    assert_eq!(
        outer.code,
        vec![
            OpCode::Closure.as_u8(),
            0,
            OpCode::SetLocal.as_u8(),
            0,
            0,
            OpCode::Nil.as_u8(),
            OpCode::Return.as_u8(),
        ]
    );
}

#[test]
fn return_outside_function_is_rejected_by_the_compiler() {
    // The parser already refuses this; drive the compiler directly.
    let program = Program {
        stmts: vec![Stmt::Return {
            value: None,
            line: 1,
        }],
    };
    let err = Compiler::new().compile(&program).unwrap_err();
    assert_eq!(err, CompileError::ReturnOutsideFunction { line: 1 });
}

#[test]
fn function_parameters_shadow_globals() {
    let script = compile("var x = 1; fun f(x) { print x; } f(2);");
    let funcs = function_constants(&script);
    assert_eq!(
        funcs[0].code,
        vec![
            OpCode::GetLocal.as_u8(),
            0,
            0,
            OpCode::Print.as_u8(),
            OpCode::Nil.as_u8(),
            OpCode::Return.as_u8(),
        ]
    );
}
