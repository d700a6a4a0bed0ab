use memory::Value;

use crate::error::RuntimeError;
use crate::opcode::OpCode;

use super::stack::StackOps;

/// Arithmetic instruction handlers.
///
/// Numeric binary operators accept every (Int, Float) pairing, promoting
/// to Float when either side is Float. `ADD` additionally concatenates
/// strings. The promotion matrix is enumerated case by case; there is no
/// ad-hoc coercion beyond it.
pub trait ArithmeticOps {
    fn handle_arithmetic(&mut self, op: OpCode) -> Result<(), RuntimeError>;
    fn handle_negate(&mut self) -> Result<(), RuntimeError>;
}

impl ArithmeticOps for super::vm::Vm<'_> {
    fn handle_arithmetic(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;

        let result = match op {
            OpCode::Add => add(&a, &b)?,
            OpCode::Subtract => numeric(&a, &b, "-", |x, y| x.wrapping_sub(y), |x, y| x - y)?,
            OpCode::Multiply => numeric(&a, &b, "*", |x, y| x.wrapping_mul(y), |x, y| x * y)?,
            OpCode::Divide => divide(&a, &b)?,
            OpCode::Modulo => modulo(&a, &b)?,
            _ => unreachable!("non-arithmetic opcode routed to handle_arithmetic"),
        };

        self.push(result);
        Ok(())
    }

    fn handle_negate(&mut self) -> Result<(), RuntimeError> {
        let a = self.pop()?;
        let result = match a {
            Value::Int(i) => Value::Int(i.wrapping_neg()),
            Value::Float(f) => Value::Float(-f),
            other => {
                return Err(RuntimeError::InvalidOperandType {
                    op: "-",
                    found: other.type_name().to_string(),
                })
            }
        };
        self.push(result);
        Ok(())
    }
}

fn mismatch(op: &'static str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::InvalidOperandType {
        op,
        found: format!("{} and {}", a.type_name(), b.type_name()),
    }
}

fn numeric(
    a: &Value,
    b: &Value,
    op: &'static str,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(int_op(*x, *y))),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(float_op(*x as f64, *y))),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(float_op(*x, *y as f64))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(float_op(*x, *y))),
        _ => Err(mismatch(op, a, b)),
    }
}

fn add(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    if let (Value::Str(x), Value::Str(y)) = (a, b) {
        let mut joined = String::with_capacity(x.len() + y.len());
        joined.push_str(x);
        joined.push_str(y);
        return Ok(Value::string(joined));
    }
    numeric(a, b, "+", |x, y| x.wrapping_add(y), |x, y| x + y)
}

fn divide(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Int(x.wrapping_div(*y)))
        }
        (Value::Int(x), Value::Float(y)) => {
            if *y == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Float(*x as f64 / y))
        }
        (Value::Float(x), Value::Int(y)) => {
            if *y == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Float(x / *y as f64))
        }
        (Value::Float(x), Value::Float(y)) => {
            if *y == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Float(x / y))
        }
        _ => Err(mismatch("/", a, b)),
    }
}

fn modulo(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                return Err(RuntimeError::ModuloByZero);
            }
            Ok(Value::Int(x.wrapping_rem(*y)))
        }
        (Value::Int(x), Value::Float(y)) => {
            if *y == 0.0 {
                return Err(RuntimeError::ModuloByZero);
            }
            Ok(Value::Float(*x as f64 % y))
        }
        (Value::Float(x), Value::Int(y)) => {
            if *y == 0 {
                return Err(RuntimeError::ModuloByZero);
            }
            Ok(Value::Float(x % *y as f64))
        }
        (Value::Float(x), Value::Float(y)) => {
            if *y == 0.0 {
                return Err(RuntimeError::ModuloByZero);
            }
            Ok(Value::Float(x % y))
        }
        _ => Err(mismatch("%", a, b)),
    }
}
