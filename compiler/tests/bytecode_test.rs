use compiler::{CompileError, CompiledScript, Compiler};
use memory::Value;
use stilt_parser::parse_program;
use vm::OpCode;

fn compile(source: &str) -> Result<CompiledScript, CompileError> {
    let program = parse_program(source).expect("source parses");
    Compiler::new().compile(&program)
}

fn ok(source: &str) -> CompiledScript {
    compile(source).expect("source compiles")
}

#[test]
fn literal_expression_statement() {
    let script = ok("1;");
    assert_eq!(
        script.code,
        vec![OpCode::Constant.as_u8(), 0, OpCode::Pop.as_u8()]
    );
    assert_eq!(script.constants, vec![Value::Int(1)]);
    assert_eq!(script.global_count, 0);
}

#[test]
fn print_addition() {
    let script = ok("print 1 + 2;");
    assert_eq!(
        script.code,
        vec![
            OpCode::Constant.as_u8(),
            0,
            OpCode::Constant.as_u8(),
            1,
            OpCode::Add.as_u8(),
            OpCode::Print.as_u8(),
        ]
    );
    assert_eq!(script.constants, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn literals_add_pool_entries_booleans_do_not() {
    let script = ok("print 1.5; print \"s\"; print true; print nil;");
    assert_eq!(
        script.constants,
        vec![Value::Float(1.5), Value::string("s")]
    );
}

#[test]
fn repeated_literals_are_not_interned() {
    let script = ok("print 1 + 1;");
    assert_eq!(script.constants, vec![Value::Int(1), Value::Int(1)]);
}

#[test]
fn unary_operators() {
    let script = ok("print -(1); print !true;");
    assert_eq!(
        script.code,
        vec![
            OpCode::Constant.as_u8(),
            0,
            OpCode::Negate.as_u8(),
            OpCode::Print.as_u8(),
            OpCode::True.as_u8(),
            OpCode::Not.as_u8(),
            OpCode::Print.as_u8(),
        ]
    );
}

#[test]
fn bang_equal_lowers_to_eq_not() {
    let script = ok("print 1 != 2;");
    assert_eq!(
        script.code,
        vec![
            OpCode::Constant.as_u8(),
            0,
            OpCode::Constant.as_u8(),
            1,
            OpCode::Eq.as_u8(),
            OpCode::Not.as_u8(),
            OpCode::Print.as_u8(),
        ]
    );
}

#[test]
fn global_definition_and_read() {
    let script = ok("var a = 1; print a;");
    assert_eq!(
        script.code,
        vec![
            OpCode::Constant.as_u8(),
            0,
            OpCode::SetGlobal.as_u8(),
            0,
            0,
            OpCode::GetGlobal.as_u8(),
            0,
            0,
            OpCode::Print.as_u8(),
        ]
    );
    assert_eq!(script.global_count, 1);
}

#[test]
fn var_without_initializer_stores_nil() {
    let script = ok("var a;");
    assert_eq!(
        script.code,
        vec![OpCode::Nil.as_u8(), OpCode::SetGlobal.as_u8(), 0, 0]
    );
}

#[test]
fn top_level_reference_before_definition_resolves() {
    // The pre-pass declares every top-level name first.
    let script = ok("print a; var a = 1;");
    assert_eq!(script.code[0], OpCode::GetGlobal.as_u8());
    assert_eq!(script.global_count, 1);
}

#[test]
fn undefined_variable_fails() {
    assert!(matches!(
        compile("print ghost;"),
        Err(CompileError::VariableNotDefined { ref name, .. }) if name == "ghost"
    ));
}

#[test]
fn duplicate_global_fails() {
    assert!(matches!(
        compile("var a = 1; var a = 2;"),
        Err(CompileError::VariableAlreadyDefined { .. })
    ));
}

#[test]
fn local_read_before_declaration_fails() {
    // The slot is allocated at the declaration site during the linear walk.
    assert!(matches!(
        compile("{ print x; var x = 1; }"),
        Err(CompileError::VariableNotDefined { .. })
    ));
}

#[test]
fn block_locals_use_local_slots() {
    let script = ok("{ var a = 1; print a; }");
    assert_eq!(
        script.code,
        vec![
            OpCode::Constant.as_u8(),
            0,
            OpCode::SetLocal.as_u8(),
            0,
            0,
            OpCode::GetLocal.as_u8(),
            0,
            0,
            OpCode::Print.as_u8(),
        ]
    );
    assert_eq!(script.global_count, 0);
}

#[test]
fn assignment_statement_emits_no_pop() {
    let script = ok("var a = 1; a = 2;");
    assert_eq!(
        script.code,
        vec![
            OpCode::Constant.as_u8(),
            0,
            OpCode::SetGlobal.as_u8(),
            0,
            0,
            OpCode::Constant.as_u8(),
            1,
            OpCode::SetGlobal.as_u8(),
            0,
            0,
        ]
    );
}

#[test]
fn if_else_jump_layout() {
    let script = ok("if (true) { print 1; } else { print 2; }");
    assert_eq!(
        script.code,
        vec![
            OpCode::True.as_u8(),
            OpCode::JumpFalse.as_u8(),
            0,
            0,
            0,
            9,
            OpCode::Pop.as_u8(),
            OpCode::Constant.as_u8(),
            0,
            OpCode::Print.as_u8(),
            OpCode::Jump.as_u8(),
            0,
            0,
            0,
            4,
            OpCode::Pop.as_u8(),
            OpCode::Constant.as_u8(),
            1,
            OpCode::Print.as_u8(),
        ]
    );
}

#[test]
fn while_loop_layout() {
    let script = ok("var i = 0; while (i < 3) { i = i + 1; }");
    assert_eq!(
        script.code,
        vec![
            // var i = 0;
            OpCode::Constant.as_u8(),
            0,
            OpCode::SetGlobal.as_u8(),
            0,
            0,
            // loop_start = 5: i < 3
            OpCode::GetGlobal.as_u8(),
            0,
            0,
            OpCode::Constant.as_u8(),
            1,
            OpCode::Lt.as_u8(),
            OpCode::JumpFalse.as_u8(),
            0,
            0,
            0,
            15,
            OpCode::Pop.as_u8(),
            // i = i + 1
            OpCode::GetGlobal.as_u8(),
            0,
            0,
            OpCode::Constant.as_u8(),
            2,
            OpCode::Add.as_u8(),
            OpCode::SetGlobal.as_u8(),
            0,
            0,
            OpCode::Loop.as_u8(),
            0,
            0,
            0,
            26,
            OpCode::Pop.as_u8(),
        ]
    );
}

#[test]
fn logical_and_layout() {
    let script = ok("print true and false;");
    assert_eq!(
        script.code,
        vec![
            OpCode::True.as_u8(),
            OpCode::JumpFalse.as_u8(),
            0,
            0,
            0,
            2,
            OpCode::Pop.as_u8(),
            OpCode::False.as_u8(),
            OpCode::Print.as_u8(),
        ]
    );
}

#[test]
fn logical_or_layout() {
    let script = ok("print false or true;");
    assert_eq!(
        script.code,
        vec![
            OpCode::False.as_u8(),
            OpCode::JumpFalse.as_u8(),
            0,
            0,
            0,
            5,
            OpCode::Jump.as_u8(),
            0,
            0,
            0,
            2,
            OpCode::Pop.as_u8(),
            OpCode::True.as_u8(),
            OpCode::Print.as_u8(),
        ]
    );
}

#[test]
fn call_encodes_argument_count() {
    let script = ok("fun f(a) { } f(1);");
    assert_eq!(
        script.code,
        vec![
            OpCode::Closure.as_u8(),
            0,
            OpCode::SetGlobal.as_u8(),
            0,
            0,
            OpCode::GetGlobal.as_u8(),
            0,
            0,
            OpCode::Constant.as_u8(),
            1,
            OpCode::Call.as_u8(),
            0,
            1,
            OpCode::Pop.as_u8(),
        ]
    );
}

#[test]
fn wide_constant_pool_uses_constant2() {
    let mut source = String::new();
    for i in 0..300 {
        source.push_str(&format!("print {i};"));
    }
    let script = ok(&source);

    // Instruction #255 still fits the 1-byte form, #256 does not.
    let mut offset = 0;
    let mut seen = Vec::new();
    while offset < script.code.len() {
        let op = OpCode::from_u8(script.code[offset]).expect("valid opcode");
        if matches!(op, OpCode::Constant | OpCode::Constant2) {
            seen.push(op);
        }
        offset += 1 + op.operand_width();
    }
    assert_eq!(seen.len(), 300);
    assert_eq!(seen[255], OpCode::Constant);
    assert_eq!(seen[256], OpCode::Constant2);
}

#[test]
fn every_emitted_instruction_decodes() {
    let script = ok(
        "var total = 0; \
         for (var i = 0; i < 10; i = i + 1) { total = total + i; } \
         if (total >= 45 and total <= 45) { print total; } else { print 0 or 1; }",
    );
    let mut offset = 0;
    while offset < script.code.len() {
        let op = OpCode::from_u8(script.code[offset]).expect("valid opcode at boundary");
        offset += 1 + op.operand_width();
    }
    assert_eq!(offset, script.code.len());
}

#[test]
fn compiling_the_same_ast_twice_is_deterministic() {
    let program = parse_program("var a = 1; fun f(x) { return x + a; } print f(2);").unwrap();
    let first = Compiler::new().compile(&program).unwrap();
    let second = Compiler::new().compile(&program).unwrap();
    assert_eq!(first.code, second.code);
    assert_eq!(first.constants, second.constants);
    assert_eq!(first.global_count, second.global_count);
}

#[test]
fn incremental_compiles_share_the_global_namespace() {
    // REPL-style: one compiler, several programs.
    let mut compiler = Compiler::new();
    let first = compiler
        .compile(&parse_program("var a = 1;").unwrap())
        .unwrap();
    assert_eq!(first.global_count, 1);

    let second = compiler
        .compile(&parse_program("print a;").unwrap())
        .unwrap();
    assert_eq!(second.global_count, 1);
    assert_eq!(
        second.code,
        vec![OpCode::GetGlobal.as_u8(), 0, 0, OpCode::Print.as_u8()]
    );
    // Constants from the first entry keep their indices.
    assert_eq!(second.constants, vec![Value::Int(1)]);
}
