use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use super::lua_number::{fmt_float, fmt_integer, float_to_integer, parse_float, parse_integer};
use super::{CFunction, FunctionRef, LuaClosure, LuaTable, TableRef};

/// Immutable byte string. Lua strings are not required to be valid UTF-8.
pub type LuaString = Rc<[u8]>;

/// A Lua 5.3 runtime value.
///
/// Integer and float are separate variants even when numerically equal.
/// The derived-style `PartialEq`/`Hash` below are *raw* identities used for
/// table keys: no integer/float cross equality, tables and functions compare
/// by reference. Lua `==` semantics live in [`LuaValue::lua_eq`] and in the
/// VM's metamethod-aware comparison.
#[derive(Clone, Default)]
pub enum LuaValue {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(LuaString),
    Table(TableRef),
    Function(FunctionRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LuaValueKind {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    Table,
    Function,
}

impl LuaValue {
    // ============ Constructors ============

    #[inline(always)]
    pub fn nil() -> Self {
        LuaValue::Nil
    }

    #[inline(always)]
    pub fn boolean(b: bool) -> Self {
        LuaValue::Boolean(b)
    }

    #[inline(always)]
    pub fn integer(i: i64) -> Self {
        LuaValue::Integer(i)
    }

    #[inline(always)]
    pub fn number(n: f64) -> Self {
        LuaValue::Float(n)
    }

    pub fn string(s: &str) -> Self {
        LuaValue::String(Rc::from(s.as_bytes()))
    }

    pub fn bytes(b: &[u8]) -> Self {
        LuaValue::String(Rc::from(b))
    }

    pub fn table(t: LuaTable) -> Self {
        LuaValue::Table(Rc::new(RefCell::new(t)))
    }

    pub fn new_table() -> Self {
        Self::table(LuaTable::new(0, 0))
    }

    pub fn function(c: LuaClosure) -> Self {
        LuaValue::Function(Rc::new(c))
    }

    pub fn cfunction(f: CFunction) -> Self {
        Self::function(LuaClosure::native(f, Vec::new()))
    }

    // ============ Type checks ============

    pub fn kind(&self) -> LuaValueKind {
        match self {
            LuaValue::Nil => LuaValueKind::Nil,
            LuaValue::Boolean(_) => LuaValueKind::Boolean,
            LuaValue::Integer(_) => LuaValueKind::Integer,
            LuaValue::Float(_) => LuaValueKind::Float,
            LuaValue::String(_) => LuaValueKind::String,
            LuaValue::Table(_) => LuaValueKind::Table,
            LuaValue::Function(_) => LuaValueKind::Function,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LuaValue::Nil => "nil",
            LuaValue::Boolean(_) => "boolean",
            LuaValue::Integer(_) | LuaValue::Float(_) => "number",
            LuaValue::String(_) => "string",
            LuaValue::Table(_) => "table",
            LuaValue::Function(_) => "function",
        }
    }

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, LuaValue::Nil)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, LuaValue::Integer(_) | LuaValue::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, LuaValue::String(_))
    }

    pub fn is_table(&self) -> bool {
        matches!(self, LuaValue::Table(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, LuaValue::Function(_))
    }

    /// Only nil and false are falsy
    #[inline(always)]
    pub fn is_falsy(&self) -> bool {
        matches!(self, LuaValue::Nil | LuaValue::Boolean(false))
    }

    #[inline(always)]
    pub fn is_truthy(&self) -> bool {
        !self.is_falsy()
    }

    // ============ Accessors ============

    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            LuaValue::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            LuaValue::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            LuaValue::String(s) => Some(s),
            _ => None,
        }
    }

    // ============ Coercions ============

    /// Float coercion: integers widen, strings parse as numerals.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            LuaValue::Float(n) => Some(*n),
            LuaValue::Integer(i) => Some(*i as f64),
            LuaValue::String(s) => match str_to_number(s)? {
                LuaValue::Integer(i) => Some(i as f64),
                LuaValue::Float(n) => Some(n),
                _ => None,
            },
            _ => None,
        }
    }

    /// Integer coercion: floats only when exactly integral, strings parse as
    /// an integer first and then as a float with an exact integral value.
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            LuaValue::Integer(i) => Some(*i),
            LuaValue::Float(n) => float_to_integer(*n),
            LuaValue::String(s) => {
                let s = std::str::from_utf8(s).ok()?;
                parse_integer(s).or_else(|| parse_float(s).and_then(float_to_integer))
            }
            _ => None,
        }
    }

    /// String coercion: numbers format canonically, strings pass through.
    pub fn to_lua_string(&self) -> Option<LuaString> {
        match self {
            LuaValue::String(s) => Some(s.clone()),
            LuaValue::Integer(i) => Some(Rc::from(fmt_integer(*i).as_bytes())),
            LuaValue::Float(n) => Some(Rc::from(fmt_float(*n).as_bytes())),
            _ => None,
        }
    }

    /// Primitive Lua equality without metamethods: integers and floats compare
    /// by numeric value, references by identity.
    pub fn lua_eq(&self, other: &LuaValue) -> bool {
        match (self, other) {
            (LuaValue::Integer(i), LuaValue::Float(f)) | (LuaValue::Float(f), LuaValue::Integer(i)) => {
                float_to_integer(*f) == Some(*i)
            }
            (LuaValue::Float(a), LuaValue::Float(b)) => a == b,
            _ => self == other,
        }
    }

    /// Normalize a table key: floats with an exact integer value become integers.
    pub fn normalize_key(self) -> Self {
        if let LuaValue::Float(n) = self
            && let Some(i) = float_to_integer(n)
        {
            return LuaValue::Integer(i);
        }
        self
    }

    fn identity(&self) -> usize {
        match self {
            LuaValue::Table(t) => Rc::as_ptr(t) as *const u8 as usize,
            LuaValue::Function(f) => Rc::as_ptr(f) as *const u8 as usize,
            _ => 0,
        }
    }
}

/// Parse a string as a Lua numeral: integer first, then float.
pub(crate) fn str_to_number(s: &[u8]) -> Option<LuaValue> {
    let s = std::str::from_utf8(s).ok()?;
    if let Some(i) = parse_integer(s) {
        return Some(LuaValue::Integer(i));
    }
    parse_float(s).map(LuaValue::Float)
}

impl PartialEq for LuaValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LuaValue::Nil, LuaValue::Nil) => true,
            (LuaValue::Boolean(a), LuaValue::Boolean(b)) => a == b,
            (LuaValue::Integer(a), LuaValue::Integer(b)) => a == b,
            // bitwise so the hash/eq contract holds for table keys
            (LuaValue::Float(a), LuaValue::Float(b)) => a.to_bits() == b.to_bits(),
            (LuaValue::String(a), LuaValue::String(b)) => a == b,
            (LuaValue::Table(a), LuaValue::Table(b)) => Rc::ptr_eq(a, b),
            (LuaValue::Function(a), LuaValue::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for LuaValue {}

impl Hash for LuaValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            LuaValue::Nil => {}
            LuaValue::Boolean(b) => b.hash(state),
            LuaValue::Integer(i) => i.hash(state),
            LuaValue::Float(n) => n.to_bits().hash(state),
            LuaValue::String(s) => s.hash(state),
            LuaValue::Table(_) | LuaValue::Function(_) => self.identity().hash(state),
        }
    }
}

impl fmt::Debug for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{}", b),
            LuaValue::Integer(i) => write!(f, "{}", i),
            LuaValue::Float(n) => write!(f, "{}", fmt_float(*n)),
            LuaValue::String(s) => write!(f, "{:?}", String::from_utf8_lossy(s)),
            LuaValue::Table(_) => write!(f, "table(0x{:x})", self.identity()),
            LuaValue::Function(_) => write!(f, "function(0x{:x})", self.identity()),
        }
    }
}

impl fmt::Display for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{}", b),
            LuaValue::Integer(i) => write!(f, "{}", fmt_integer(*i)),
            LuaValue::Float(n) => write!(f, "{}", fmt_float(*n)),
            LuaValue::String(s) => write!(f, "{}", String::from_utf8_lossy(s)),
            LuaValue::Table(_) => write!(f, "table: 0x{:x}", self.identity()),
            LuaValue::Function(_) => write!(f, "function: 0x{:x}", self.identity()),
        }
    }
}

impl From<bool> for LuaValue {
    fn from(b: bool) -> Self {
        LuaValue::Boolean(b)
    }
}

impl From<i64> for LuaValue {
    fn from(i: i64) -> Self {
        LuaValue::Integer(i)
    }
}

impl From<f64> for LuaValue {
    fn from(n: f64) -> Self {
        LuaValue::Float(n)
    }
}

impl From<&str> for LuaValue {
    fn from(s: &str) -> Self {
        LuaValue::string(s)
    }
}
