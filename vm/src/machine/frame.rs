use std::rc::Rc;

use memory::Closure;

use crate::error::RuntimeError;
use crate::opcode::OpCode;

/// A single call frame in the execution stack.
///
/// The slice of the operand stack starting at `base_pointer` holds this
/// frame's locals; `ip` indexes into `closure.function.code`.
#[derive(Debug, Clone)]
pub struct Frame {
    pub closure: Rc<Closure>,
    pub base_pointer: usize,
    pub ip: usize,
}

impl Frame {
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            base_pointer,
            ip: 0,
        }
    }

    pub fn code_size(&self) -> usize {
        self.closure.function.code.len()
    }

    /// Read the next opcode byte and advance `ip`.
    pub fn opcode(&mut self) -> u8 {
        let byte = self.closure.function.code[self.ip];
        self.ip += 1;
        byte
    }

    /// Read one raw byte of inline metadata and advance `ip`.
    pub fn next_byte(&mut self) -> Result<u8, RuntimeError> {
        let byte = *self
            .closure
            .function
            .code
            .get(self.ip)
            .ok_or(RuntimeError::OutOfBounds("code"))?;
        self.ip += 1;
        Ok(byte)
    }

    /// Decode the big-endian operand of a just-read opcode, advancing `ip`
    /// by the operand width. Requesting an operand for an operand-less
    /// opcode is an error.
    pub fn operand(&mut self, op: OpCode) -> Result<u64, RuntimeError> {
        let width = op.operand_width();
        if width == 0 {
            return Err(RuntimeError::OpcodeHasNoOperand);
        }
        let code = &self.closure.function.code;
        let bytes = code
            .get(self.ip..self.ip + width)
            .ok_or(RuntimeError::OutOfBounds("code"))?;
        self.ip += width;
        let operand = match width {
            1 => u64::from(bytes[0]),
            2 => u64::from(u16::from_be_bytes([bytes[0], bytes[1]])),
            4 => u64::from(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            8 => u64::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
            other => return Err(RuntimeError::InvalidOperandWidth(other)),
        };
        Ok(operand)
    }

    /// Move `ip` forward (forward jumps).
    pub fn jump_forward(&mut self, offset: u64) {
        self.ip += offset as usize;
    }

    /// Move `ip` backward (`LOOP`).
    pub fn jump_back(&mut self, offset: u64) -> Result<(), RuntimeError> {
        self.ip = self
            .ip
            .checked_sub(offset as usize)
            .ok_or(RuntimeError::OutOfBounds("loop target"))?;
        Ok(())
    }
}
