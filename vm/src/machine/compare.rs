use memory::Value;

use crate::error::RuntimeError;
use crate::opcode::OpCode;

use super::stack::StackOps;

/// Comparison and equality instruction handlers.
///
/// Ordering operators follow the numeric promotion of the arithmetic
/// kernels. Equality additionally accepts (Bool, Bool) and (Nil, Nil);
/// every other pairing is a type error.
pub trait CompareOps {
    fn handle_compare(&mut self, op: OpCode) -> Result<(), RuntimeError>;
    fn handle_not(&mut self) -> Result<(), RuntimeError>;
}

impl CompareOps for super::vm::Vm<'_> {
    fn handle_compare(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;

        let result = match op {
            OpCode::Eq => equal(&a, &b)?,
            OpCode::Gt => ordered(&a, &b, ">", |x, y| x > y, |x, y| x > y)?,
            OpCode::Lt => ordered(&a, &b, "<", |x, y| x < y, |x, y| x < y)?,
            OpCode::Ge => ordered(&a, &b, ">=", |x, y| x >= y, |x, y| x >= y)?,
            OpCode::Le => ordered(&a, &b, "<=", |x, y| x <= y, |x, y| x <= y)?,
            _ => unreachable!("non-comparison opcode routed to handle_compare"),
        };

        self.push(Value::Bool(result));
        Ok(())
    }

    fn handle_not(&mut self) -> Result<(), RuntimeError> {
        let a = self.pop()?;
        match a {
            Value::Bool(b) => {
                self.push(Value::Bool(!b));
                Ok(())
            }
            other => Err(RuntimeError::InvalidOperandType {
                op: "!",
                found: other.type_name().to_string(),
            }),
        }
    }
}

fn mismatch(op: &'static str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::InvalidOperandType {
        op,
        found: format!("{} and {}", a.type_name(), b.type_name()),
    }
}

fn ordered(
    a: &Value,
    b: &Value,
    op: &'static str,
    int_op: fn(i64, i64) -> bool,
    float_op: fn(f64, f64) -> bool,
) -> Result<bool, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(int_op(*x, *y)),
        (Value::Int(x), Value::Float(y)) => Ok(float_op(*x as f64, *y)),
        (Value::Float(x), Value::Int(y)) => Ok(float_op(*x, *y as f64)),
        (Value::Float(x), Value::Float(y)) => Ok(float_op(*x, *y)),
        _ => Err(mismatch(op, a, b)),
    }
}

fn equal(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Int(x), Value::Float(y)) => Ok(*x as f64 == *y),
        (Value::Float(x), Value::Int(y)) => Ok(*x == *y as f64),
        (Value::Float(x), Value::Float(y)) => Ok(x == y),
        (Value::Str(x), Value::Str(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Nil, Value::Nil) => Ok(true),
        _ => Err(mismatch("==", a, b)),
    }
}
