use std::cell::RefCell;
use std::fmt;
use std::io::{self, Read, Write};
use std::rc::Rc;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

// --- Serialized type tags ---
// On disk a value is a type byte followed by a type-specific payload.
// Bool, Nil and Closure never appear in a constant pool and have no
// serialized form.
pub const TYPE_INT: u8 = 0;
pub const TYPE_FLOAT: u8 = 1;
pub const TYPE_STRING: u8 = 2;
pub const TYPE_FUNCTION: u8 = 3;
pub const TYPE_BOOL: u8 = 4;
pub const TYPE_NIL: u8 = 5;
pub const TYPE_CLOSURE: u8 = 6;

// Deserialization guards against malformed chunk files.
const MAX_STRING_LEN: u64 = 1 << 20;
const MAX_CODE_LEN: u64 = 1 << 24;

/// A runtime value of the Stilt VM.
///
/// Prototypes (`Function`) live in the constant pool; closures live on the
/// operand stack and in variable slots. Heap values are reference counted.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Bool(bool),
    Nil,
    Function(Rc<Function>),
    Closure(Rc<Closure>),
}

/// An immutable function prototype, produced at compile time.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub code: Vec<u8>,
    pub num_params: usize,
    pub num_upvalues: usize,
}

impl Function {
    pub fn new(code: Vec<u8>, num_params: usize, num_upvalues: usize) -> Self {
        Self {
            code,
            num_params,
            num_upvalues,
        }
    }
}

/// A function prototype paired with its captured upvalues.
///
/// Upvalue slots hold value snapshots taken when the closure is created;
/// `SET_UPVALUE` rewrites a slot of this array only.
#[derive(Debug, PartialEq)]
pub struct Closure {
    pub function: Rc<Function>,
    pub upvalues: RefCell<Vec<Value>>,
}

impl Closure {
    pub fn new(function: Rc<Function>) -> Self {
        let upvalues = vec![Value::Nil; function.num_upvalues];
        Self {
            function,
            upvalues: RefCell::new(upvalues),
        }
    }
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn type_tag(&self) -> u8 {
        match self {
            Value::Int(_) => TYPE_INT,
            Value::Float(_) => TYPE_FLOAT,
            Value::Str(_) => TYPE_STRING,
            Value::Function(_) => TYPE_FUNCTION,
            Value::Bool(_) => TYPE_BOOL,
            Value::Nil => TYPE_NIL,
            Value::Closure(_) => TYPE_CLOSURE,
        }
    }

    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Nil => "nil",
            Value::Function(_) => "function",
            Value::Closure(_) => "closure",
        }
    }

    // --- Literal accessors ---

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_closure(&self) -> Option<&Rc<Closure>> {
        match self {
            Value::Closure(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    // --- Binary form ---

    /// Serialize this value in its on-disk form: a type byte followed by a
    /// big-endian payload. Only pool-resident values (int, float, string,
    /// function) have one.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            Value::Int(i) => {
                w.write_u8(TYPE_INT)?;
                w.write_i64::<BigEndian>(*i)
            }
            Value::Float(f) => {
                w.write_u8(TYPE_FLOAT)?;
                w.write_f64::<BigEndian>(*f)
            }
            Value::Str(s) => {
                w.write_u8(TYPE_STRING)?;
                w.write_u64::<BigEndian>(s.len() as u64)?;
                w.write_all(s.as_bytes())
            }
            Value::Function(f) => {
                w.write_u8(TYPE_FUNCTION)?;
                w.write_u64::<BigEndian>(f.num_params as u64)?;
                w.write_u64::<BigEndian>(f.num_upvalues as u64)?;
                w.write_u64::<BigEndian>(f.code.len() as u64)?;
                w.write_all(&f.code)
            }
            Value::Bool(_) | Value::Nil | Value::Closure(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} values have no serialized form", self.type_name()),
            )),
        }
    }

    /// Inverse of [`Value::write_to`]. Declared lengths are bounded to keep
    /// a malformed chunk from forcing huge allocations.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Value> {
        let tag = r.read_u8()?;
        match tag {
            TYPE_INT => Ok(Value::Int(r.read_i64::<BigEndian>()?)),
            TYPE_FLOAT => Ok(Value::Float(r.read_f64::<BigEndian>()?)),
            TYPE_STRING => {
                let len = r.read_u64::<BigEndian>()?;
                if len > MAX_STRING_LEN {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("string length {len} exceeds limit"),
                    ));
                }
                let mut bytes = vec![0u8; len as usize];
                r.read_exact(&mut bytes)?;
                let s = String::from_utf8(bytes).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "invalid UTF-8 in string constant")
                })?;
                Ok(Value::string(s))
            }
            TYPE_FUNCTION => {
                let num_params = r.read_u64::<BigEndian>()?;
                let num_upvalues = r.read_u64::<BigEndian>()?;
                let code_len = r.read_u64::<BigEndian>()?;
                if code_len > MAX_CODE_LEN {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("code length {code_len} exceeds limit"),
                    ));
                }
                let mut code = vec![0u8; code_len as usize];
                r.read_exact(&mut code)?;
                Ok(Value::Function(Rc::new(Function::new(
                    code,
                    num_params as usize,
                    num_upvalues as usize,
                ))))
            }
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown value tag: {other}"),
            )),
        }
    }
}

impl fmt::Display for Value {
    /// Canonical print form, as produced by the `PRINT` instruction.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => {
                if x.is_nan() {
                    write!(f, "NaN")
                } else if x.is_infinite() {
                    write!(f, "{}", if *x > 0.0 { "Infinity" } else { "-Infinity" })
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Nil => write!(f, "nil"),
            Value::Function(func) => write!(f, "<fn/{}>", func.num_params),
            Value::Closure(c) => write!(f, "<fn/{}>", c.function.num_params),
        }
    }
}
