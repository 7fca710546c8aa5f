use std::rc::Rc;

use ahash::AHashMap;

use super::{LuaError, LuaResult};
use crate::binchunk::Chunk;
use crate::lua_value::{FunctionRef, LuaValue, Upvalue, UpvalueRef};

/// LuaCallFrame - one activation on the call stack
///
/// - slots: register file and scratch stack, `slots.len()` is the capacity
/// - top: number of live slots
/// - closure: the running function (`None` for the host base frame)
/// - varargs: extra arguments of a variadic call
/// - pc: index of the next instruction
/// - open_upvalues: register index -> open cell aliasing that register
pub struct LuaCallFrame {
    pub slots: Vec<LuaValue>,
    pub top: usize,
    pub closure: Option<FunctionRef>,
    pub varargs: Vec<LuaValue>,
    pub pc: usize,
    pub open_upvalues: AHashMap<usize, UpvalueRef>,
}

impl LuaCallFrame {
    pub fn new(size: usize, closure: Option<FunctionRef>) -> Self {
        LuaCallFrame {
            slots: vec![LuaValue::Nil; size],
            top: 0,
            closure,
            varargs: Vec::new(),
            pc: 0,
            open_upvalues: AHashMap::new(),
        }
    }

    pub fn chunk(&self) -> Option<&Rc<Chunk>> {
        self.closure.as_ref().and_then(|c| c.chunk())
    }

    pub fn free_slots(&self) -> usize {
        self.slots.len() - self.top
    }

    /// Grow capacity so that `n` more values fit
    pub fn grow(&mut self, n: usize) {
        let needed = self.top + n;
        if needed > self.slots.len() {
            self.slots.resize(needed, LuaValue::Nil);
        }
    }

    pub fn push(&mut self, val: LuaValue) -> LuaResult<()> {
        if self.top == self.slots.len() {
            return Err(LuaError::StackOverflow);
        }
        self.slots[self.top] = val;
        self.top += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> LuaResult<LuaValue> {
        if self.top == 0 {
            return Err(LuaError::StackUnderflow);
        }
        self.top -= 1;
        Ok(std::mem::take(&mut self.slots[self.top]))
    }

    /// Push `vals` adjusted to `n` values (nil-padded or truncated); `n < 0` pushes all
    pub fn push_n(&mut self, vals: Vec<LuaValue>, n: i32) -> LuaResult<()> {
        let n = if n < 0 { vals.len() } else { n as usize };
        let len = vals.len();
        for v in vals.into_iter().take(n) {
            self.push(v)?;
        }
        for _ in len..n {
            self.push(LuaValue::Nil)?;
        }
        Ok(())
    }

    /// Pop `n` values, returned in stack order
    pub fn pop_n(&mut self, n: usize) -> LuaResult<Vec<LuaValue>> {
        if n > self.top {
            return Err(LuaError::StackUnderflow);
        }
        let start = self.top - n;
        let vals = self.slots[start..self.top]
            .iter_mut()
            .map(std::mem::take)
            .collect();
        self.top = start;
        Ok(vals)
    }

    /// Close every open upvalue aliasing a register at or above `from`
    pub fn close_upvalues_from(&mut self, from: usize) {
        let slots = &self.slots;
        self.open_upvalues.retain(|&slot, cell| {
            if slot < from {
                return true;
            }
            let value = slots.get(slot).cloned().unwrap_or_default();
            *cell.borrow_mut() = Upvalue::Closed(value);
            false
        });
    }
}
