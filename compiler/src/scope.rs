//! Per-function code emission state.
//!
//! A `Scope` is the append-only instruction buffer of one function being
//! compiled, plus the flag that suppresses the implicit `NIL; RETURN`
//! epilogue. The flag holds only while the most recently compiled
//! statement was a plain `return`; conditional and scoped constructs
//! clear it, since a return nested inside them cannot guarantee that
//! every path out of the function returns.

use vm::OpCode;

use crate::error::CompileError;
use crate::symbol_table::UpvalueInfo;

/// Total width of a jump instruction: opcode byte + 4-byte operand. Jump
/// offsets are relative to the instruction that follows, so the patcher
/// subtracts this from the distance.
pub const JUMP_INSTRUCTION_LEN: usize = 5;

#[derive(Debug, Default)]
pub struct Scope {
    pub code: Vec<u8>,
    pub have_return: bool,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            have_return: false,
        }
    }

    /// Current length of the code buffer.
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    /// Append an operand-less instruction.
    pub fn emit(&mut self, op: OpCode) {
        debug_assert_eq!(op.operand_width(), 0, "{op} takes an operand");
        self.code.push(op.as_u8());
    }

    /// Append an opcode and its big-endian operand.
    pub fn emit_with_operand(&mut self, op: OpCode, operand: u64) -> Result<(), CompileError> {
        let width = op.operand_width();
        let max = match width {
            1 => u64::from(u8::MAX),
            2 => u64::from(u16::MAX),
            4 => u64::from(u32::MAX),
            8 => u64::MAX,
            _ => return Err(CompileError::ConstantIndexOverflow),
        };
        if operand > max {
            return Err(CompileError::ConstantIndexOverflow);
        }
        self.code.push(op.as_u8());
        let bytes = operand.to_be_bytes();
        self.code.extend_from_slice(&bytes[8 - width..]);
        Ok(())
    }

    /// Push the constant at `index`, using the narrowest `CONSTANT_*`
    /// variant that fits.
    pub fn emit_constant(&mut self, index: usize) -> Result<(), CompileError> {
        let op = narrowest(
            index,
            [
                OpCode::Constant,
                OpCode::Constant2,
                OpCode::Constant4,
                OpCode::Constant8,
            ],
        );
        self.emit_with_operand(op, index as u64)
    }

    /// Build a closure from the prototype at `index`, followed by one
    /// `(is_local, index)` byte pair per captured upvalue.
    pub fn emit_closure(
        &mut self,
        index: usize,
        upvalues: &[UpvalueInfo],
    ) -> Result<(), CompileError> {
        let op = narrowest(
            index,
            [
                OpCode::Closure,
                OpCode::Closure2,
                OpCode::Closure4,
                OpCode::Closure8,
            ],
        );
        self.emit_with_operand(op, index as u64)?;
        for up in upvalues {
            if up.index > usize::from(u8::MAX) {
                return Err(CompileError::ConstantIndexOverflow);
            }
            self.code.push(up.is_local as u8);
            self.code.push(up.index as u8);
        }
        Ok(())
    }

    /// Emit a jump with a zeroed operand; returns the placeholder offset
    /// for a later `patch`.
    pub fn emit_jump(&mut self, op: OpCode) -> usize {
        let placeholder = self.offset();
        self.code.push(op.as_u8());
        self.code.extend_from_slice(&[0, 0, 0, 0]);
        placeholder
    }

    /// Emit a `LOOP` jumping back to `loop_start`.
    pub fn emit_loop(&mut self, loop_start: usize) -> Result<(), CompileError> {
        let operand = self.offset() + JUMP_INSTRUCTION_LEN - loop_start;
        self.emit_with_operand(OpCode::Loop, operand as u64)
    }

    /// Point a previously emitted jump at the current end of code. The
    /// byte at `placeholder` must still hold `expected`.
    pub fn patch(&mut self, placeholder: usize, expected: OpCode) -> Result<(), CompileError> {
        let found = self.code[placeholder];
        if found != expected.as_u8() {
            return Err(CompileError::OpcodeMismatch {
                expected: expected.as_u8(),
                found,
            });
        }
        let distance = self.offset() - placeholder - JUMP_INSTRUCTION_LEN;
        let bytes = (distance as u32).to_be_bytes();
        self.code[placeholder + 1..placeholder + JUMP_INSTRUCTION_LEN].copy_from_slice(&bytes);
        Ok(())
    }
}

fn narrowest(index: usize, variants: [OpCode; 4]) -> OpCode {
    if index <= usize::from(u8::MAX) {
        variants[0]
    } else if index <= usize::from(u16::MAX) {
        variants[1]
    } else if index <= u32::MAX as usize {
        variants[2]
    } else {
        variants[3]
    }
}
