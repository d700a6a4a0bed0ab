use std::fs;

use anyhow::{Context, Result};
use memory::Value;
use vm::OpCode;

use super::run::compile_source;

pub fn disassemble_file(path: &str) -> Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let script = compile_source(&source)?;

    disassemble_chunk("main", &script.code, &script.constants);
    for (index, constant) in script.constants.iter().enumerate() {
        if let Some(function) = constant.as_function() {
            println!();
            disassemble_chunk(
                &format!("fn constants[{index}] (arity {})", function.num_params),
                &function.code,
                &script.constants,
            );
        }
    }
    Ok(())
}

fn disassemble_chunk(name: &str, code: &[u8], constants: &[Value]) {
    println!("== {name} ==");
    let mut offset = 0;
    while offset < code.len() {
        offset = disassemble_instruction(code, constants, offset);
    }
}

fn disassemble_instruction(code: &[u8], constants: &[Value], offset: usize) -> usize {
    let byte = code[offset];
    let Some(op) = OpCode::from_u8(byte) else {
        println!("{offset:04} BAD_OPCODE 0x{byte:02x}");
        return offset + 1;
    };

    let width = op.operand_width();
    if width == 0 {
        println!("{offset:04} {}", op.name());
        return offset + 1;
    }

    let mut end = offset + 1 + width;
    if end > code.len() {
        println!("{offset:04} {:<12} <truncated operand>", op.name());
        return code.len();
    }
    let operand = code[offset + 1..end]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));

    match op {
        OpCode::Constant | OpCode::Constant2 | OpCode::Constant4 | OpCode::Constant8 => {
            let value = constants.get(operand as usize);
            match value {
                Some(v) => println!("{offset:04} {:<12} {operand} ({v})", op.name()),
                None => println!("{offset:04} {:<12} {operand} (<missing>)", op.name()),
            }
        }
        OpCode::Closure | OpCode::Closure2 | OpCode::Closure4 | OpCode::Closure8 => {
            println!("{offset:04} {:<12} {operand}", op.name());
            // The inline capture metadata follows the operand.
            let num_upvalues = constants
                .get(operand as usize)
                .and_then(|c| c.as_function())
                .map(|f| f.num_upvalues)
                .unwrap_or(0);
            for _ in 0..num_upvalues {
                if end + 2 > code.len() {
                    break;
                }
                let is_local = code[end];
                let index = code[end + 1];
                let kind = if is_local == 1 { "local" } else { "upvalue" };
                println!("{end:04}    | capture {kind} {index}");
                end += 2;
            }
        }
        OpCode::Jump | OpCode::JumpFalse => {
            println!(
                "{offset:04} {:<12} +{operand} -> {}",
                op.name(),
                end + operand as usize
            );
        }
        OpCode::Loop => {
            println!(
                "{offset:04} {:<12} -{operand} -> {}",
                op.name(),
                end.saturating_sub(operand as usize)
            );
        }
        _ => {
            println!("{offset:04} {:<12} {operand}", op.name());
        }
    }

    end
}
