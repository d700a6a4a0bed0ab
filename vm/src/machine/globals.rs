use crate::error::RuntimeError;
use crate::opcode::OpCode;

use super::stack::StackOps;

/// Global variable instruction handlers.
///
/// Globals live in a flat array indexed by the slot the symbol table
/// assigned at compile time; names never reach the VM.
pub trait GlobalOps {
    fn handle_set_global(&mut self) -> Result<(), RuntimeError>;
    fn handle_get_global(&mut self) -> Result<(), RuntimeError>;
}

impl GlobalOps for super::vm::Vm<'_> {
    fn handle_set_global(&mut self) -> Result<(), RuntimeError> {
        let index = self.frame_mut().operand(OpCode::SetGlobal)? as usize;
        let value = self.pop()?;
        let slot = self
            .globals
            .get_mut(index)
            .ok_or(RuntimeError::OutOfBounds("global slot"))?;
        *slot = value;
        Ok(())
    }

    fn handle_get_global(&mut self) -> Result<(), RuntimeError> {
        let index = self.frame_mut().operand(OpCode::GetGlobal)? as usize;
        let value = self
            .globals
            .get(index)
            .cloned()
            .ok_or(RuntimeError::OutOfBounds("global slot"))?;
        self.push(value);
        Ok(())
    }
}
