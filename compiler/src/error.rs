use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Operator token with no bytecode lowering.
    InvalidOperator { op: String, line: usize },
    VariableNotDefined { name: String, line: usize },
    VariableAlreadyDefined { name: String, line: usize },
    /// Symbol resolution produced a scope the construct cannot use.
    InvalidSymbolScope { line: usize },
    /// A jump patch found a different opcode at the placeholder offset.
    OpcodeMismatch { expected: u8, found: u8 },
    /// Operand does not fit the instruction's encoding.
    ConstantIndexOverflow,
    ReturnOutsideFunction { line: usize },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::InvalidOperator { op, line } => {
                write!(f, "line {line}: invalid operator `{op}`")
            }
            CompileError::VariableNotDefined { name, line } => {
                write!(f, "line {line}: variable `{name}` is not defined")
            }
            CompileError::VariableAlreadyDefined { name, line } => {
                write!(f, "line {line}: variable `{name}` is already defined")
            }
            CompileError::InvalidSymbolScope { line } => {
                write!(f, "line {line}: invalid symbol scope")
            }
            CompileError::OpcodeMismatch { expected, found } => {
                write!(
                    f,
                    "jump patch expected opcode 0x{expected:02x}, found 0x{found:02x}"
                )
            }
            CompileError::ConstantIndexOverflow => {
                write!(f, "operand overflows its instruction encoding")
            }
            CompileError::ReturnOutsideFunction { line } => {
                write!(f, "line {line}: `return` outside of a function")
            }
        }
    }
}

impl std::error::Error for CompileError {}
