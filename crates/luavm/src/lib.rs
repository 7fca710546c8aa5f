// Lua VM
// A register-based Lua 5.3 bytecode virtual machine

#[cfg(test)]
mod test;

pub mod binchunk;
pub mod lib_registry;
pub mod lua_value;
pub mod lua_vm;
pub mod stdlib;

pub use binchunk::Chunk;
pub use lib_registry::LibraryRegistry;
pub use lua_value::{LuaClosure, LuaTable, LuaValue};
pub use lua_vm::{
    ArithOp, CompareOp, Instruction, LuaError, LuaResult, LuaStatus, LuaType, LuaVM, OpCode,
    SafeOption,
};
