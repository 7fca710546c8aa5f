// Lua VM
// Owns the call stack and the registry and exposes the indexed stack API
mod dispatcher;
mod execute;
mod lua_call_frame;
mod lua_error;
pub mod lua_limits;
pub mod opcode;
mod safe_option;
mod stack;
mod table_access;

use std::cell::RefCell;
use std::rc::Rc;

use crate::lib_registry;
use crate::lua_value::{LuaTable, LuaValue, TableRef};

pub use execute::TmKind;
pub use lua_call_frame::LuaCallFrame;
pub use lua_error::{LuaError, LuaResult};
pub use lua_limits::*;
pub use opcode::{Instruction, OpArgMask, OpCode, OpMode};
pub use safe_option::SafeOption;

/// Status codes reported by protected calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum LuaStatus {
    Ok = 0,
    Yield = 1,
    ErrRun = 2,
    ErrSyntax = 3,
    ErrMem = 4,
    ErrGcmm = 5,
    ErrErr = 6,
    ErrFile = 7,
}

/// Basic type tags; the numbering matches `lua.h`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum LuaType {
    None = -1,
    Nil = 0,
    Boolean = 1,
    Number = 3,
    String = 4,
    Table = 5,
    Function = 6,
}

impl LuaType {
    pub fn of(val: &LuaValue) -> LuaType {
        match val {
            LuaValue::Nil => LuaType::Nil,
            LuaValue::Boolean(_) => LuaType::Boolean,
            LuaValue::Integer(_) | LuaValue::Float(_) => LuaType::Number,
            LuaValue::String(_) => LuaType::String,
            LuaValue::Table(_) => LuaType::Table,
            LuaValue::Function(_) => LuaType::Function,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LuaType::None => "no value",
            LuaType::Nil => "nil",
            LuaType::Boolean => "boolean",
            LuaType::Number => "number",
            LuaType::String => "string",
            LuaType::Table => "table",
            LuaType::Function => "function",
        }
    }
}

/// Arithmetic and bitwise operators, in instruction order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Mod,
    Pow,
    Div,
    IDiv,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    Unm,
    BNot,
}

impl ArithOp {
    pub fn is_unary(self) -> bool {
        matches!(self, ArithOp::Unm | ArithOp::BNot)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            ArithOp::BAnd | ArithOp::BOr | ArithOp::BXor | ArithOp::Shl | ArithOp::Shr | ArithOp::BNot
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
}

pub struct LuaVM {
    /// Root table holding the globals and the per-type metatables
    pub(crate) registry: TableRef,
    /// Call stack; index 0 is the host frame and is never popped
    pub(crate) frames: Vec<LuaCallFrame>,
    pub(crate) safe_option: SafeOption,
    /// Instructions left before `LuaError::Budget`
    pub(crate) budget: Option<u64>,
}

impl LuaVM {
    pub fn new() -> Self {
        Self::with_options(SafeOption::default())
    }

    pub fn with_options(safe_option: SafeOption) -> Self {
        let mut registry = LuaTable::new(0, 0);
        // integer key with a non-nil value never fails
        let _ = registry.put_int(LUA_RIDX_GLOBALS, LuaValue::new_table());

        LuaVM {
            registry: Rc::new(RefCell::new(registry)),
            frames: vec![LuaCallFrame::new(LUA_MINSTACK, None)],
            budget: safe_option.instruction_budget,
            safe_option,
        }
    }

    pub fn safe_option(&self) -> &SafeOption {
        &self.safe_option
    }

    /// Replace the remaining instruction budget
    pub fn set_instruction_budget(&mut self, budget: Option<u64>) {
        self.budget = budget;
    }

    /// Current call-stack depth (the host frame counts as one)
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn globals(&self) -> LuaValue {
        self.registry.borrow().get_int(LUA_RIDX_GLOBALS)
    }

    /// Register the base library into the globals table
    pub fn open_libs(&mut self) -> LuaResult<()> {
        lib_registry::create_standard_registry().load_all(self)
    }

    #[inline(always)]
    pub(crate) fn frame(&self) -> &LuaCallFrame {
        let depth = self.frames.len() - 1;
        &self.frames[depth]
    }

    #[inline(always)]
    pub(crate) fn frame_mut(&mut self) -> &mut LuaCallFrame {
        let depth = self.frames.len() - 1;
        &mut self.frames[depth]
    }
}

impl Default for LuaVM {
    fn default() -> Self {
        Self::new()
    }
}
