//! OpCode definitions for the Stilt VM.
//!
//! Instructions are variable-length: a one-byte opcode followed by a fixed
//! number of big-endian operand bytes (0, 1, 2, 4 or 8 depending on the
//! opcode). `CLOSURE*` instructions are additionally followed by
//! `num_upvalues` inline `(is_local: u8, index: u8)` pairs.

use std::fmt;

/// Virtual machine instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // ===== Constants & literals =====
    /// Push constants[idx]; idx is 1 byte.
    Constant = 0,
    /// Push constants[idx]; idx is 2 bytes.
    Constant2 = 1,
    /// Push constants[idx]; idx is 4 bytes.
    Constant4 = 2,
    /// Push constants[idx]; idx is 8 bytes.
    Constant8 = 3,
    /// Push true.
    True = 4,
    /// Push false.
    False = 5,
    /// Push nil.
    Nil = 6,

    // ===== Unary =====
    /// Arithmetic negation of the top of stack.
    Negate = 7,
    /// Boolean negation of the top of stack.
    Not = 8,

    // ===== Arithmetic =====
    Add = 9,
    Subtract = 10,
    Multiply = 11,
    Divide = 12,
    Modulo = 13,

    // ===== Comparison =====
    Eq = 14,
    Gt = 15,
    Lt = 16,
    Ge = 17,
    Le = 18,

    // ===== Stack & effects =====
    /// Drop the top of stack.
    Pop = 19,
    /// Pop the top of stack and write it to the output sink.
    Print = 20,

    // ===== Variables =====
    /// Pop into globals[idx].
    SetGlobal = 21,
    /// Push globals[idx].
    GetGlobal = 22,
    /// Pop into stack[base + slot].
    SetLocal = 23,
    /// Push stack[base + slot].
    GetLocal = 24,
    /// Pop into the current closure's upvalue slot.
    SetUpvalue = 25,
    /// Push the current closure's upvalue slot.
    GetUpvalue = 26,

    // ===== Flow control =====
    /// Unconditional forward jump: ip += offset.
    Jump = 27,
    /// Forward jump when the (unpopped) top of stack is false.
    JumpFalse = 28,
    /// Backward jump: ip -= offset.
    Loop = 29,

    // ===== Functions =====
    /// Invoke the closure at stack[top - argc] with argc arguments.
    Call = 30,
    /// Pop result, unwind the frame, push result.
    Return = 31,
    /// Build a closure from constants[idx]; idx is 1 byte.
    Closure = 32,
    /// Build a closure from constants[idx]; idx is 2 bytes.
    Closure2 = 33,
    /// Build a closure from constants[idx]; idx is 4 bytes.
    Closure4 = 34,
    /// Build a closure from constants[idx]; idx is 8 bytes.
    Closure8 = 35,
}

impl OpCode {
    /// Get opcode from byte value.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(OpCode::Constant),
            1 => Some(OpCode::Constant2),
            2 => Some(OpCode::Constant4),
            3 => Some(OpCode::Constant8),
            4 => Some(OpCode::True),
            5 => Some(OpCode::False),
            6 => Some(OpCode::Nil),
            7 => Some(OpCode::Negate),
            8 => Some(OpCode::Not),
            9 => Some(OpCode::Add),
            10 => Some(OpCode::Subtract),
            11 => Some(OpCode::Multiply),
            12 => Some(OpCode::Divide),
            13 => Some(OpCode::Modulo),
            14 => Some(OpCode::Eq),
            15 => Some(OpCode::Gt),
            16 => Some(OpCode::Lt),
            17 => Some(OpCode::Ge),
            18 => Some(OpCode::Le),
            19 => Some(OpCode::Pop),
            20 => Some(OpCode::Print),
            21 => Some(OpCode::SetGlobal),
            22 => Some(OpCode::GetGlobal),
            23 => Some(OpCode::SetLocal),
            24 => Some(OpCode::GetLocal),
            25 => Some(OpCode::SetUpvalue),
            26 => Some(OpCode::GetUpvalue),
            27 => Some(OpCode::Jump),
            28 => Some(OpCode::JumpFalse),
            29 => Some(OpCode::Loop),
            30 => Some(OpCode::Call),
            31 => Some(OpCode::Return),
            32 => Some(OpCode::Closure),
            33 => Some(OpCode::Closure2),
            34 => Some(OpCode::Closure4),
            35 => Some(OpCode::Closure8),
            _ => None,
        }
    }

    /// Convert opcode to byte value.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Fixed operand width in bytes following the opcode byte.
    pub fn operand_width(self) -> usize {
        match self {
            OpCode::Constant | OpCode::Closure => 1,
            OpCode::Constant2 | OpCode::Closure2 => 2,
            OpCode::Constant4 | OpCode::Closure4 => 4,
            OpCode::Constant8 | OpCode::Closure8 => 8,
            OpCode::SetGlobal
            | OpCode::GetGlobal
            | OpCode::SetLocal
            | OpCode::GetLocal
            | OpCode::SetUpvalue
            | OpCode::GetUpvalue
            | OpCode::Call => 2,
            OpCode::Jump | OpCode::JumpFalse | OpCode::Loop => 4,
            OpCode::True
            | OpCode::False
            | OpCode::Nil
            | OpCode::Negate
            | OpCode::Not
            | OpCode::Add
            | OpCode::Subtract
            | OpCode::Multiply
            | OpCode::Divide
            | OpCode::Modulo
            | OpCode::Eq
            | OpCode::Gt
            | OpCode::Lt
            | OpCode::Ge
            | OpCode::Le
            | OpCode::Pop
            | OpCode::Print
            | OpCode::Return => 0,
        }
    }

    /// Get human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::Constant2 => "CONSTANT_2",
            OpCode::Constant4 => "CONSTANT_4",
            OpCode::Constant8 => "CONSTANT_8",
            OpCode::True => "TRUE",
            OpCode::False => "FALSE",
            OpCode::Nil => "NIL",
            OpCode::Negate => "NEGATE",
            OpCode::Not => "NOT",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUBTRACT",
            OpCode::Multiply => "MULTIPLY",
            OpCode::Divide => "DIVIDE",
            OpCode::Modulo => "MODULO",
            OpCode::Eq => "EQ",
            OpCode::Gt => "GT",
            OpCode::Lt => "LT",
            OpCode::Ge => "GE",
            OpCode::Le => "LE",
            OpCode::Pop => "POP",
            OpCode::Print => "PRINT",
            OpCode::SetGlobal => "SET_GLOBAL",
            OpCode::GetGlobal => "GET_GLOBAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetUpvalue => "SET_UPVALUE",
            OpCode::GetUpvalue => "GET_UPVALUE",
            OpCode::Jump => "JUMP",
            OpCode::JumpFalse => "JUMP_FALSE",
            OpCode::Loop => "LOOP",
            OpCode::Call => "CALL",
            OpCode::Return => "RETURN",
            OpCode::Closure => "CLOSURE",
            OpCode::Closure2 => "CLOSURE_2",
            OpCode::Closure4 => "CLOSURE_4",
            OpCode::Closure8 => "CLOSURE_8",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
