pub mod codegen;
pub mod error;
pub mod scope;
pub mod symbol_table;

pub use codegen::{CompiledScript, Compiler};
pub use error::CompileError;
pub use scope::Scope;
pub use symbol_table::{SymbolScope, SymbolTable, UpvalueInfo};
