use thiserror::Error;

use crate::lua_value::LuaValue;

/// Every fault unwinds as a `LuaError` through `LuaResult`; only protected
/// calls turn it back into a status plus an error value.
#[derive(Debug, Clone, Error)]
pub enum LuaError {
    /// Call depth or stack capacity exhausted
    #[error("stack overflow")]
    StackOverflow,

    /// Pop from an empty stack
    #[error("stack underflow")]
    StackUnderflow,

    /// Write to an index outside the live stack
    #[error("invalid index {0}")]
    InvalidIndex(i32),

    /// Indexing or calling a value of the wrong type
    #[error("{0}")]
    Type(String),

    /// Arithmetic, bitwise or concatenation on non-coercible operands
    #[error("{0}")]
    Arithmetic(String),

    /// Ordering between incomparable values
    #[error("{0}")]
    Compare(String),

    /// Other run-time errors detected by the engine
    #[error("{0}")]
    Runtime(String),

    /// Error raised from Lua code with an arbitrary payload
    #[error("{0}")]
    Value(LuaValue),

    /// Malformed precompiled chunk
    #[error("bad binary format: {0}")]
    Load(String),

    /// The configured instruction budget ran out
    #[error("instruction budget exhausted")]
    Budget,
}

impl LuaError {
    /// The value a protected call hands back for this error
    pub fn payload(&self) -> LuaValue {
        match self {
            LuaError::Value(v) => v.clone(),
            other => LuaValue::string(&other.to_string()),
        }
    }
}

pub type LuaResult<T> = Result<T, LuaError>;
