//! Binary chunk persistence (`.stlb`).
//!
//! Layout, all multi-byte integers big-endian:
//!
//! ```text
//! magic "STLT" | version u8 | global_count u64 | constant_count u64
//! | constants (type byte + payload each) | code_length u64 | code bytes
//! ```
//!
//! Loading enforces limits on the declared counts so a malformed file
//! cannot force huge allocations.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use memory::Value;

use crate::error::LoaderError;

pub const CHUNK_MAGIC: &[u8; 4] = b"STLT";
pub const CHUNK_VERSION: u8 = 1;

const MAX_CONSTANTS: u64 = 1_000_000;
const MAX_CODE_LEN: u64 = 1 << 24;

/// A chunk read back from its binary form.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedChunk {
    pub code: Vec<u8>,
    pub constants: Vec<Value>,
    pub global_count: usize,
}

/// Write a compiled chunk in its binary form.
pub fn save_chunk<W: Write>(
    w: &mut W,
    code: &[u8],
    constants: &[Value],
    global_count: usize,
) -> Result<(), LoaderError> {
    w.write_all(CHUNK_MAGIC)?;
    w.write_u8(CHUNK_VERSION)?;
    w.write_u64::<BigEndian>(global_count as u64)?;

    w.write_u64::<BigEndian>(constants.len() as u64)?;
    for constant in constants {
        constant
            .write_to(w)
            .map_err(|e| LoaderError::Format(e.to_string()))?;
    }

    w.write_u64::<BigEndian>(code.len() as u64)?;
    w.write_all(code)?;
    Ok(())
}

/// Read a chunk back from its binary form.
pub fn load_chunk<R: Read>(r: &mut R) -> Result<LoadedChunk, LoaderError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != CHUNK_MAGIC {
        return Err(LoaderError::Format("bad magic".to_string()));
    }
    let version = r.read_u8()?;
    if version != CHUNK_VERSION {
        return Err(LoaderError::Format(format!(
            "unsupported chunk version {version}"
        )));
    }

    let global_count = r.read_u64::<BigEndian>()?;
    if global_count > MAX_CONSTANTS {
        return Err(LoaderError::Security(format!(
            "global count too large: {global_count}"
        )));
    }

    let constant_count = r.read_u64::<BigEndian>()?;
    if constant_count > MAX_CONSTANTS {
        return Err(LoaderError::Security(format!(
            "constant count too large: {constant_count}"
        )));
    }
    let mut constants = Vec::with_capacity(constant_count as usize);
    for _ in 0..constant_count {
        let value = Value::read_from(r).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => LoaderError::Format(e.to_string()),
            _ => LoaderError::Io(e),
        })?;
        constants.push(value);
    }

    let code_len = r.read_u64::<BigEndian>()?;
    if code_len > MAX_CODE_LEN {
        return Err(LoaderError::Security(format!(
            "code length too large: {code_len}"
        )));
    }
    let mut code = vec![0u8; code_len as usize];
    r.read_exact(&mut code)?;

    Ok(LoadedChunk {
        code,
        constants,
        global_count: global_count as usize,
    })
}
