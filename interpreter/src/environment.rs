//! Lexical environments.
//!
//! Each block and each call gets a fresh environment chained to its
//! enclosing one. Closures hold a handle to their declaration
//! environment, which keeps the whole chain alive for as long as the
//! closure is reachable.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::value::Value;

pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Env>,
}

impl Environment {
    pub fn new() -> Env {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: None,
        }))
    }

    pub fn with_enclosing(enclosing: Env) -> Env {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }))
    }

    /// Bind a new name in this environment. Redeclaring a name in the
    /// same environment is an error; shadowing an outer one is not.
    pub fn define(&mut self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        if self.values.contains_key(name) {
            return Err(RuntimeError::VariableAlreadyDefined {
                name: name.to_string(),
                line,
            });
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Read a name, walking outward through the chain.
    pub fn get(env: &Env, name: &str) -> Option<Value> {
        let borrowed = env.borrow();
        if let Some(value) = borrowed.values.get(name) {
            return Some(value.clone());
        }
        let enclosing = borrowed.enclosing.clone()?;
        drop(borrowed);
        Environment::get(&enclosing, name)
    }

    /// Write to an existing binding, walking outward. Returns false if
    /// the name is bound nowhere in the chain.
    pub fn assign(env: &Env, name: &str, value: Value) -> bool {
        let mut borrowed = env.borrow_mut();
        if let Some(slot) = borrowed.values.get_mut(name) {
            *slot = value;
            return true;
        }
        let Some(enclosing) = borrowed.enclosing.clone() else {
            return false;
        };
        drop(borrowed);
        Environment::assign(&enclosing, name, value)
    }
}
