use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    UndefinedVariable { name: String, line: usize },
    VariableAlreadyDefined { name: String, line: usize },
    InvalidOperator { op: String, line: usize },
    InvalidOperandType { op: &'static str, found: String },
    InvalidConditionType(String),
    InvalidCallType(String),
    ArityMismatch { expected: usize, got: usize },
    DivisionByZero,
    ModuloByZero,
    Io(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UndefinedVariable { name, line } => {
                write!(f, "line {line}: undefined variable `{name}`")
            }
            RuntimeError::VariableAlreadyDefined { name, line } => {
                write!(f, "line {line}: variable `{name}` is already defined")
            }
            RuntimeError::InvalidOperator { op, line } => {
                write!(f, "line {line}: invalid operator `{op}`")
            }
            RuntimeError::InvalidOperandType { op, found } => {
                write!(f, "invalid operand type for {op}: {found}")
            }
            RuntimeError::InvalidConditionType(found) => {
                write!(f, "condition must be a bool, found {found}")
            }
            RuntimeError::InvalidCallType(found) => {
                write!(f, "can only call functions, found {found}")
            }
            RuntimeError::ArityMismatch { expected, got } => {
                write!(f, "expected {expected} arguments, got {got}")
            }
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::ModuloByZero => write!(f, "modulo by zero"),
            RuntimeError::Io(msg) => write!(f, "output error: {msg}"),
        }
    }
}

impl std::error::Error for RuntimeError {}
