use std::io::Write;
use std::rc::Rc;

use memory::{Closure, Function, Value};

use crate::error::RuntimeError;
use crate::opcode::OpCode;

use super::arithmetic::ArithmeticOps;
use super::compare::CompareOps;
use super::control::ControlFlowOps;
use super::frame::Frame;
use super::globals::GlobalOps;
use super::stack::StackOps;

/// The Stilt virtual machine.
///
/// One instance owns its operand stack, globals array and frame stack for
/// its whole lifetime; constants are shared read-only with the compiler.
/// Execution is single-threaded and synchronous, and halts on the first
/// error with the frame state intact for diagnostics.
pub struct Vm<'a> {
    pub stack: Vec<Value>,
    pub globals: Vec<Value>,
    pub frames: Vec<Frame>,
    pub constants: Vec<Value>,
    output: &'a mut dyn Write,
}

impl<'a> Vm<'a> {
    /// Create a VM around a compiled top-level chunk. `PRINT` writes to
    /// `output`.
    pub fn new(
        code: Vec<u8>,
        constants: Vec<Value>,
        global_count: usize,
        output: &'a mut dyn Write,
    ) -> Self {
        Self {
            stack: Vec::new(),
            globals: vec![Value::Nil; global_count],
            frames: vec![main_frame(code)],
            constants,
            output,
        }
    }

    /// Replace the executing chunk while keeping the globals array, as the
    /// REPL does between entries. The frame and operand stacks are reset;
    /// the globals array only ever grows.
    pub fn reload(&mut self, code: Vec<u8>, constants: Vec<Value>, global_count: usize) {
        self.stack.clear();
        self.frames.clear();
        self.frames.push(main_frame(code));
        self.constants = constants;
        if global_count > self.globals.len() {
            self.globals.resize(global_count, Value::Nil);
        }
    }

    pub(crate) fn frame(&self) -> &Frame {
        self.frames.last().expect("frame stack is not empty")
    }

    pub(crate) fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack is not empty")
    }

    /// Instruction offset of the current frame, for diagnostics after a
    /// runtime error.
    pub fn current_offset(&self) -> Option<usize> {
        self.frames.last().map(|f| f.ip)
    }

    /// Main dispatch loop. Runs until the top-level chunk is exhausted or
    /// an error occurs.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while !self.frames.is_empty() {
            let op_byte = {
                let frame = self.frame_mut();
                if frame.ip >= frame.code_size() {
                    None
                } else {
                    Some(frame.opcode())
                }
            };
            let Some(op_byte) = op_byte else {
                // Frame ran off the end of its code without a RETURN; the
                // top-level chunk always ends this way.
                self.frames.pop();
                continue;
            };

            let op = OpCode::from_u8(op_byte).ok_or(RuntimeError::InvalidOpcode(op_byte))?;

            match op {
                OpCode::Constant | OpCode::Constant2 | OpCode::Constant4 | OpCode::Constant8 => {
                    let index = self.frame_mut().operand(op)? as usize;
                    let value = self
                        .constants
                        .get(index)
                        .cloned()
                        .ok_or(RuntimeError::OutOfBounds("constant"))?;
                    // Function prototypes only materialize via CLOSURE.
                    if !matches!(value, Value::Int(_) | Value::Float(_) | Value::Str(_)) {
                        return Err(RuntimeError::InvalidOperandType {
                            op: "CONSTANT",
                            found: value.type_name().to_string(),
                        });
                    }
                    self.push(value);
                }

                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Nil => self.push(Value::Nil),

                OpCode::Negate => self.handle_negate()?,
                OpCode::Not => self.handle_not()?,

                OpCode::Add
                | OpCode::Subtract
                | OpCode::Multiply
                | OpCode::Divide
                | OpCode::Modulo => self.handle_arithmetic(op)?,

                OpCode::Eq | OpCode::Gt | OpCode::Lt | OpCode::Ge | OpCode::Le => {
                    self.handle_compare(op)?
                }

                OpCode::Pop => {
                    self.pop()?;
                }

                OpCode::Print => {
                    let value = self.pop()?;
                    writeln!(self.output, "{value}")
                        .map_err(|e| RuntimeError::Io(e.to_string()))?;
                }

                OpCode::SetGlobal => self.handle_set_global()?,
                OpCode::GetGlobal => self.handle_get_global()?,

                OpCode::SetLocal => {
                    let slot = self.frame_mut().operand(op)? as usize;
                    let index = self.frame().base_pointer + slot;
                    let value = self.pop()?;
                    self.stack_set(index, value)?;
                }

                OpCode::GetLocal => {
                    let slot = self.frame_mut().operand(op)? as usize;
                    let index = self.frame().base_pointer + slot;
                    let value = self.stack_get(index)?;
                    self.push(value);
                }

                OpCode::SetUpvalue => {
                    let index = self.frame_mut().operand(op)? as usize;
                    let value = self.pop()?;
                    let closure = self.frame().closure.clone();
                    let mut upvalues = closure.upvalues.borrow_mut();
                    let slot = upvalues
                        .get_mut(index)
                        .ok_or(RuntimeError::OutOfBounds("upvalue"))?;
                    *slot = value;
                }

                OpCode::GetUpvalue => {
                    let index = self.frame_mut().operand(op)? as usize;
                    let value = self
                        .frame()
                        .closure
                        .upvalues
                        .borrow()
                        .get(index)
                        .cloned()
                        .ok_or(RuntimeError::OutOfBounds("upvalue"))?;
                    self.push(value);
                }

                OpCode::Jump => {
                    let offset = self.frame_mut().operand(op)?;
                    self.frame_mut().jump_forward(offset);
                }

                OpCode::JumpFalse => {
                    let offset = self.frame_mut().operand(op)?;
                    // The condition stays on the stack; both branches pop
                    // it with an explicit POP.
                    let falsey = match self.peek(0)? {
                        Value::Bool(b) => !*b,
                        other => {
                            return Err(RuntimeError::InvalidConditionType(
                                other.type_name().to_string(),
                            ))
                        }
                    };
                    if falsey {
                        self.frame_mut().jump_forward(offset);
                    }
                }

                OpCode::Loop => {
                    let offset = self.frame_mut().operand(op)?;
                    self.frame_mut().jump_back(offset)?;
                }

                OpCode::Call => self.handle_call()?,
                OpCode::Return => self.handle_return()?,

                OpCode::Closure | OpCode::Closure2 | OpCode::Closure4 | OpCode::Closure8 => {
                    self.handle_closure(op)?
                }
            }
        }
        Ok(())
    }
}

fn main_frame(code: Vec<u8>) -> Frame {
    let function = Rc::new(Function::new(code, 0, 0));
    Frame::new(Rc::new(Closure::new(function)), 0)
}
