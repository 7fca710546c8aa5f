use std::cell::RefCell;
use std::rc::Rc;

use super::LuaValue;
use crate::binchunk::Chunk;
use crate::lua_vm::{LuaResult, LuaVM};

/// Host function: receives the VM with its arguments at indices 1..=top and
/// returns how many values at the top of its stack are results.
pub type CFunction = fn(&mut LuaVM) -> LuaResult<usize>;

/// An upvalue cell.
///
/// While the enclosing function is running the cell is `Open` and aliases a
/// register of that frame, addressed by call-stack depth and register index.
/// When the frame is popped the register value moves into the cell.
#[derive(Debug, Clone)]
pub enum Upvalue {
    Open { frame: usize, slot: usize },
    Closed(LuaValue),
}

pub type UpvalueRef = Rc<RefCell<Upvalue>>;

pub enum LuaClosure {
    /// Interpreted function backed by a prototype
    Lua {
        chunk: Rc<Chunk>,
        upvalues: Vec<UpvalueRef>,
    },
    /// Host function with its own upvalues
    Native {
        func: CFunction,
        upvalues: Vec<UpvalueRef>,
    },
}

impl LuaClosure {
    pub fn lua(chunk: Rc<Chunk>, upvalues: Vec<UpvalueRef>) -> Self {
        LuaClosure::Lua { chunk, upvalues }
    }

    pub fn native(func: CFunction, upvalues: Vec<UpvalueRef>) -> Self {
        LuaClosure::Native { func, upvalues }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, LuaClosure::Native { .. })
    }

    pub fn chunk(&self) -> Option<&Rc<Chunk>> {
        match self {
            LuaClosure::Lua { chunk, .. } => Some(chunk),
            LuaClosure::Native { .. } => None,
        }
    }

    pub fn upvalues(&self) -> &[UpvalueRef] {
        match self {
            LuaClosure::Lua { upvalues, .. } | LuaClosure::Native { upvalues, .. } => upvalues,
        }
    }
}

/// A fresh closed cell holding `value`
pub fn closed_upvalue(value: LuaValue) -> UpvalueRef {
    Rc::new(RefCell::new(Upvalue::Closed(value)))
}
