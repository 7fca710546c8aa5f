// Lua 5.3 value representation
// Values are a closed sum type; tables and closures are shared by reference.
mod lua_closure;
pub mod lua_number;
mod lua_table;
mod lua_value;

use std::cell::RefCell;
use std::rc::Rc;

pub use lua_closure::{CFunction, LuaClosure, Upvalue, UpvalueRef, closed_upvalue};
pub use lua_table::LuaTable;
pub use lua_value::{LuaString, LuaValue, LuaValueKind};
pub(crate) use lua_value::str_to_number;

/// Shared, mutable table handle
pub type TableRef = Rc<RefCell<LuaTable>>;

/// Shared closure handle
pub type FunctionRef = Rc<LuaClosure>;
