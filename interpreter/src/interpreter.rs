//! AST evaluation.
//!
//! The evaluator mirrors the semantics of the bytecode pipeline: the same
//! numeric promotion matrix, strict bool conditions, string `+`
//! concatenation and left-to-right evaluation order. It resolves names
//! through live environment chains instead of compiled slots, so a
//! captured variable is a shared binding rather than a snapshot, and
//! definitions take effect in textual order with no pre-declaration pass.

use std::io::Write;
use std::rc::Rc;

use stilt_parser::ast::{Expr, Program, Stmt};
use stilt_parser::token::{Literal, TokenKind};

use crate::environment::{Env, Environment};
use crate::error::RuntimeError;
use crate::value::{Closure, Value};

/// Statement outcome: continue normally or unwind to the nearest call.
enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter<'a> {
    globals: Env,
    output: &'a mut dyn Write,
}

impl<'a> Interpreter<'a> {
    pub fn new(output: &'a mut dyn Write) -> Self {
        Self {
            globals: Environment::new(),
            output,
        }
    }

    /// Evaluate a program against the interpreter's global environment.
    /// Calling this repeatedly accumulates global state, as the REPL does.
    pub fn interpret(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let env = self.globals.clone();
        for stmt in &program.stmts {
            self.execute(stmt, &env)?;
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt, env: &Env) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expression { expr } => {
                self.evaluate(expr, env)?;
                Ok(Flow::Normal)
            }

            Stmt::Print { expr, .. } => {
                let value = self.evaluate(expr, env)?;
                writeln!(self.output, "{value}").map_err(|e| RuntimeError::Io(e.to_string()))?;
                Ok(Flow::Normal)
            }

            Stmt::Var {
                name,
                initializer,
                line,
            } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };
                env.borrow_mut().define(&name.lexeme, value, *line)?;
                Ok(Flow::Normal)
            }

            Stmt::Block { stmts, .. } => {
                let child = Environment::with_enclosing(env.clone());
                for stmt in stmts {
                    if let Flow::Return(value) = self.execute(stmt, &child)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.condition(condition, env)? {
                    self.execute(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, env)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While {
                condition, body, ..
            } => {
                while self.condition(condition, env)? {
                    if let Flow::Return(value) = self.execute(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function {
                name,
                params,
                body,
                line,
            } => {
                let closure = Value::Function(Rc::new(Closure {
                    name: name.lexeme.clone(),
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    env: env.clone(),
                }));
                // The closure's environment is the defining one, so the
                // binding below is visible to recursive calls.
                env.borrow_mut().define(&name.lexeme, closure, *line)?;
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    fn condition(&mut self, expr: &Expr, env: &Env) -> Result<bool, RuntimeError> {
        match self.evaluate(expr, env)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::InvalidConditionType(
                other.type_name().to_string(),
            )),
        }
    }

    fn evaluate(&mut self, expr: &Expr, env: &Env) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                Literal::Int(i) => Value::Int(*i),
                Literal::Float(f) => Value::Float(*f),
                Literal::Str(s) => Value::string(s),
            }),

            Expr::BoolLit { value, .. } => Ok(Value::Bool(*value)),
            Expr::NilLit { .. } => Ok(Value::Nil),
            Expr::Grouping { expr } => self.evaluate(expr, env),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right, env)?;
                match operator.kind {
                    TokenKind::Minus => match right {
                        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(RuntimeError::InvalidOperandType {
                            op: "-",
                            found: other.type_name().to_string(),
                        }),
                    },
                    TokenKind::Bang => match right {
                        Value::Bool(b) => Ok(Value::Bool(!b)),
                        other => Err(RuntimeError::InvalidOperandType {
                            op: "!",
                            found: other.type_name().to_string(),
                        }),
                    },
                    _ => Err(RuntimeError::InvalidOperator {
                        op: operator.lexeme.clone(),
                        line: operator.line,
                    }),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left, env)?;
                let right = self.evaluate(right, env)?;
                match binary(&left, operator.kind, &right) {
                    Some(result) => result,
                    None => Err(RuntimeError::InvalidOperator {
                        op: operator.lexeme.clone(),
                        line: operator.line,
                    }),
                }
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let b = match self.evaluate(left, env)? {
                    Value::Bool(b) => b,
                    other => {
                        return Err(RuntimeError::InvalidConditionType(
                            other.type_name().to_string(),
                        ))
                    }
                };
                match operator.kind {
                    TokenKind::And => {
                        if b {
                            self.evaluate(right, env)
                        } else {
                            Ok(Value::Bool(false))
                        }
                    }
                    TokenKind::Or => {
                        if b {
                            Ok(Value::Bool(true))
                        } else {
                            self.evaluate(right, env)
                        }
                    }
                    _ => Err(RuntimeError::InvalidOperator {
                        op: operator.lexeme.clone(),
                        line: operator.line,
                    }),
                }
            }

            Expr::Variable { name } => Environment::get(env, &name.lexeme).ok_or_else(|| {
                RuntimeError::UndefinedVariable {
                    name: name.lexeme.clone(),
                    line: name.line,
                }
            }),

            Expr::Assign { name, value } => {
                let value = self.evaluate(value, env)?;
                if !Environment::assign(env, &name.lexeme, value.clone()) {
                    return Err(RuntimeError::UndefinedVariable {
                        name: name.lexeme.clone(),
                        line: name.line,
                    });
                }
                Ok(value)
            }

            Expr::Call { callee, args, .. } => {
                let closure = match self.evaluate(callee, env)? {
                    Value::Function(closure) => closure,
                    other => {
                        return Err(RuntimeError::InvalidCallType(
                            other.type_name().to_string(),
                        ))
                    }
                };

                let mut arguments = Vec::with_capacity(args.len());
                for arg in args {
                    arguments.push(self.evaluate(arg, env)?);
                }
                if closure.params.len() != arguments.len() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: closure.params.len(),
                        got: arguments.len(),
                    });
                }

                let call_env = Environment::with_enclosing(closure.env.clone());
                for (param, argument) in closure.params.iter().zip(arguments) {
                    call_env
                        .borrow_mut()
                        .define(&param.lexeme, argument, param.line)?;
                }

                for stmt in closure.body.iter() {
                    if let Flow::Return(value) = self.execute(stmt, &call_env)? {
                        return Ok(value);
                    }
                }
                Ok(Value::Nil)
            }
        }
    }
}

fn mismatch(op: &'static str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::InvalidOperandType {
        op,
        found: format!("{} and {}", a.type_name(), b.type_name()),
    }
}

fn binary(left: &Value, op: TokenKind, right: &Value) -> Option<Result<Value, RuntimeError>> {
    Some(match op {
        TokenKind::Plus => add(left, right),
        TokenKind::Minus => numeric(left, right, "-", |x, y| x.wrapping_sub(y), |x, y| x - y),
        TokenKind::Star => numeric(left, right, "*", |x, y| x.wrapping_mul(y), |x, y| x * y),
        TokenKind::Slash => divide(left, right),
        TokenKind::Percent => modulo(left, right),
        TokenKind::EqualEqual => equal(left, right).map(Value::Bool),
        TokenKind::BangEqual => equal(left, right).map(|b| Value::Bool(!b)),
        TokenKind::Greater => ordered(left, right, ">", |x, y| x > y, |x, y| x > y),
        TokenKind::GreaterEqual => ordered(left, right, ">=", |x, y| x >= y, |x, y| x >= y),
        TokenKind::Less => ordered(left, right, "<", |x, y| x < y, |x, y| x < y),
        TokenKind::LessEqual => ordered(left, right, "<=", |x, y| x <= y, |x, y| x <= y),
        _ => return None,
    })
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
        (Value::Int(_) | Value::Float(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
        (Value::Int(_) | Value::Float(_), Value::Float(y)) if *y == 0.0 => {
            Err(RuntimeError::DivisionByZero)
        }
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_div(*y))),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(*x as f64 / y)),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(x / *y as f64)),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x / y)),
        _ => Err(mismatch("/", a, b)),
    }
}

fn modulo(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(0)) => Err(RuntimeError::ModuloByZero),
        (Value::Int(_) | Value::Float(_), Value::Float(y)) if *y == 0.0 => {
            Err(RuntimeError::ModuloByZero)
        }
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_rem(*y))),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(*x as f64 % y)),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(x % *y as f64)),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x % y)),
        _ => Err(mismatch("%", a, b)),
    }
}

fn ordered(
    a: &Value,
    b: &Value,
    op: &'static str,
    int_op: fn(i64, i64) -> bool,
    float_op: fn(f64, f64) -> bool,
) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Bool(int_op(*x, *y))),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Bool(float_op(*x as f64, *y))),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Bool(float_op(*x, *y as f64))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Bool(float_op(*x, *y))),
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
