pub mod value;


pub use value::{Closure, Function, Value};
pub use value::{TYPE_FLOAT, TYPE_FUNCTION, TYPE_INT, TYPE_STRING};
