use std::rc::Rc;

use memory::{Closure, Value};

use crate::error::RuntimeError;
use crate::opcode::OpCode;

use super::frame::Frame;
use super::stack::StackOps;

/// Call, return and closure-building instruction handlers.
pub trait ControlFlowOps {
    fn handle_call(&mut self) -> Result<(), RuntimeError>;
    fn handle_return(&mut self) -> Result<(), RuntimeError>;
    fn handle_closure(&mut self, op: OpCode) -> Result<(), RuntimeError>;
}

impl ControlFlowOps for super::vm::Vm<'_> {
    fn handle_call(&mut self) -> Result<(), RuntimeError> {
        let argc = self.frame_mut().operand(OpCode::Call)? as usize;

        let callee = self.peek(argc)?;
        let closure = callee
            .as_closure()
            .ok_or_else(|| RuntimeError::InvalidCallType(callee.type_name().to_string()))?
            .clone();

        if closure.function.num_params != argc {
            return Err(RuntimeError::ArityMismatch {
                expected: closure.function.num_params,
                got: argc,
            });
        }

        // Arguments become slots 0..argc-1 of the callee's local region.
        let base_pointer = self.stack.len() - argc;
        self.frames.push(Frame::new(closure, base_pointer));
        Ok(())
    }

    fn handle_return(&mut self) -> Result<(), RuntimeError> {
        let result = self.pop()?;
        let base_pointer = self.frame().base_pointer;

        // Unwind args, locals and the callee slot beneath the base pointer.
        self.stack.truncate(base_pointer.saturating_sub(1));
        self.push(result);

        self.frames.pop();
        Ok(())
    }

    fn handle_closure(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        let index = self.frame_mut().operand(op)? as usize;
        let constant = self
            .constants
            .get(index)
            .ok_or(RuntimeError::OutOfBounds("constant"))?;
        let function = constant
            .as_function()
            .ok_or_else(|| RuntimeError::InvalidClosureType(constant.type_name().to_string()))?
            .clone();

        let closure = Closure::new(function.clone());

        // The inline metadata pairs follow the operand.
        for slot in 0..function.num_upvalues {
            let (is_local, index) = {
                let frame = self.frame_mut();
                (frame.next_byte()?, frame.next_byte()? as usize)
            };
            let captured = if is_local == 1 {
                let stack_index = self.frame().base_pointer + index;
                self.stack_get(stack_index)?
            } else {
                self.frame()
                    .closure
                    .upvalues
                    .borrow()
                    .get(index)
                    .cloned()
                    .ok_or(RuntimeError::OutOfBounds("upvalue"))?
            };
            closure.upvalues.borrow_mut()[slot] = captured;
        }

        self.push(Value::Closure(Rc::new(closure)));
        Ok(())
    }
}
