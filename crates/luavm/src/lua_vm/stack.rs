// Indexed stack API
//
// Index space seen from the running frame:
// 1..=top       live slots
// -1..=-top     slots counted from the top
// LUA_REGISTRYINDEX            the registry table
// below LUA_REGISTRYINDEX      upvalues of the running function
use std::rc::Rc;

use tracing::warn;

use super::{LUA_REGISTRYINDEX, LuaError, LuaResult, LuaType, LuaVM};
use crate::lua_value::{
    CFunction, LuaClosure, LuaString, LuaValue, Upvalue, UpvalueRef, closed_upvalue,
};

impl LuaVM {
    // ============ Raw slot access ============

    pub fn get_top(&self) -> i32 {
        self.frame().top as i32
    }

    pub fn abs_index(&self, idx: i32) -> i32 {
        if idx >= 0 || idx <= LUA_REGISTRYINDEX {
            idx
        } else {
            idx + self.frame().top as i32 + 1
        }
    }

    pub fn is_valid(&self, idx: i32) -> bool {
        if idx < LUA_REGISTRYINDEX {
            let uv_idx = (LUA_REGISTRYINDEX - idx - 1) as usize;
            return self
                .frame()
                .closure
                .as_ref()
                .is_some_and(|c| uv_idx < c.upvalues().len());
        }
        if idx == LUA_REGISTRYINDEX {
            return true;
        }
        let abs = self.abs_index(idx);
        abs > 0 && abs <= self.get_top()
    }

    /// Value at `idx`; invalid indices read as nil
    pub(crate) fn get_value(&self, idx: i32) -> LuaValue {
        if idx < LUA_REGISTRYINDEX {
            let uv_idx = (LUA_REGISTRYINDEX - idx - 1) as usize;
            return match self.frame().closure.as_ref() {
                Some(c) => match c.upvalues().get(uv_idx) {
                    Some(cell) => self.read_upvalue(cell),
                    None => LuaValue::Nil,
                },
                None => LuaValue::Nil,
            };
        }
        if idx == LUA_REGISTRYINDEX {
            return LuaValue::Table(self.registry.clone());
        }
        let abs = self.abs_index(idx);
        let frame = self.frame();
        if abs > 0 && abs as usize <= frame.top {
            frame.slots[abs as usize - 1].clone()
        } else {
            LuaValue::Nil
        }
    }

    pub(crate) fn set_value(&mut self, idx: i32, val: LuaValue) -> LuaResult<()> {
        if idx < LUA_REGISTRYINDEX {
            let uv_idx = (LUA_REGISTRYINDEX - idx - 1) as usize;
            let cell = self
                .frame()
                .closure
                .as_ref()
                .and_then(|c| c.upvalues().get(uv_idx).cloned());
            let Some(cell) = cell else {
                return Err(LuaError::InvalidIndex(idx));
            };
            self.write_upvalue(&cell, val);
            return Ok(());
        }
        if idx == LUA_REGISTRYINDEX {
            return match val {
                LuaValue::Table(t) => {
                    self.registry = t;
                    Ok(())
                }
                _ => Err(LuaError::InvalidIndex(idx)),
            };
        }
        let abs = self.abs_index(idx);
        let frame = self.frame_mut();
        if abs > 0 && abs as usize <= frame.top {
            frame.slots[abs as usize - 1] = val;
            Ok(())
        } else {
            Err(LuaError::InvalidIndex(idx))
        }
    }

    pub(crate) fn read_upvalue(&self, cell: &UpvalueRef) -> LuaValue {
        match &*cell.borrow() {
            Upvalue::Open { frame, slot } => self
                .frames
                .get(*frame)
                .and_then(|f| f.slots.get(*slot))
                .cloned()
                .unwrap_or_default(),
            Upvalue::Closed(v) => v.clone(),
        }
    }

    pub(crate) fn write_upvalue(&mut self, cell: &UpvalueRef, val: LuaValue) {
        let target = match &*cell.borrow() {
            Upvalue::Open { frame, slot } => Some((*frame, *slot)),
            Upvalue::Closed(_) => None,
        };
        match target {
            Some((frame, slot)) => {
                if let Some(s) = self.frames.get_mut(frame).and_then(|f| f.slots.get_mut(slot)) {
                    *s = val;
                }
            }
            None => *cell.borrow_mut() = Upvalue::Closed(val),
        }
    }

    /// Push a value onto the running frame
    pub fn push(&mut self, val: LuaValue) -> LuaResult<()> {
        self.frame_mut().push(val)
    }

    /// Pop the top value
    pub fn pop_value(&mut self) -> LuaResult<LuaValue> {
        self.frame_mut().pop()
    }

    // ============ Basic stack manipulation ============

    /// Make room for `n` more values; false when that would pass the stack limit
    pub fn check_stack(&mut self, n: usize) -> bool {
        let max = self.safe_option.max_stack_size;
        let frame = self.frame_mut();
        if frame.free_slots() >= n {
            return true;
        }
        if frame.top + n > max {
            warn!(top = frame.top, requested = n, max, "stack growth refused");
            return false;
        }
        frame.grow(n);
        true
    }

    pub(crate) fn ensure_stack(&mut self, n: usize) -> LuaResult<()> {
        if self.check_stack(n) {
            Ok(())
        } else {
            Err(LuaError::StackOverflow)
        }
    }

    pub fn pop(&mut self, n: usize) -> LuaResult<()> {
        for _ in 0..n {
            self.pop_value()?;
        }
        Ok(())
    }

    pub fn copy(&mut self, from_idx: i32, to_idx: i32) -> LuaResult<()> {
        let val = self.get_value(from_idx);
        self.set_value(to_idx, val)
    }

    pub fn push_value(&mut self, idx: i32) -> LuaResult<()> {
        let val = self.get_value(idx);
        self.push(val)
    }

    /// Pop the top value into `idx`
    pub fn replace(&mut self, idx: i32) -> LuaResult<()> {
        let val = self.pop_value()?;
        self.set_value(idx, val)
    }

    /// Move the top value into `idx`, shifting the values above up
    pub fn insert(&mut self, idx: i32) -> LuaResult<()> {
        self.rotate(idx, 1)
    }

    /// Remove the value at `idx`, shifting the values above down
    pub fn remove(&mut self, idx: i32) -> LuaResult<()> {
        self.rotate(idx, -1)?;
        self.pop(1)
    }

    /// Rotate the slots from `idx` to the top by `n` positions toward the top
    pub fn rotate(&mut self, idx: i32, n: i32) -> LuaResult<()> {
        let abs = self.abs_index(idx);
        let frame = self.frame_mut();
        if abs < 1 || abs as usize > frame.top {
            return Err(LuaError::InvalidIndex(idx));
        }
        let p = abs as usize - 1;
        let t = frame.top - 1;
        let n = n % (t - p + 1) as i32;
        if n == 0 {
            return Ok(());
        }
        // pivot: last slot of the segment that moves to the front
        let m = if n >= 0 {
            (t as i32 - n) as usize
        } else {
            (p as i32 - n - 1) as usize
        };
        let slots = &mut frame.slots;
        slots[p..=m].reverse();
        slots[m + 1..=t].reverse();
        slots[p..=t].reverse();
        Ok(())
    }

    /// Truncate the stack to `idx` or pad it with nils
    pub fn set_top(&mut self, idx: i32) -> LuaResult<()> {
        let new_top = self.abs_index(idx);
        if new_top < 0 {
            return Err(LuaError::StackUnderflow);
        }
        let new_top = new_top as usize;
        let top = self.frame().top;
        if new_top < top {
            self.pop(top - new_top)
        } else {
            self.ensure_stack(new_top - top)?;
            for _ in top..new_top {
                self.push(LuaValue::Nil)?;
            }
            Ok(())
        }
    }

    // ============ Push functions ============

    pub fn push_nil(&mut self) -> LuaResult<()> {
        self.push(LuaValue::Nil)
    }

    pub fn push_boolean(&mut self, b: bool) -> LuaResult<()> {
        self.push(LuaValue::Boolean(b))
    }

    pub fn push_integer(&mut self, n: i64) -> LuaResult<()> {
        self.push(LuaValue::Integer(n))
    }

    pub fn push_number(&mut self, n: f64) -> LuaResult<()> {
        self.push(LuaValue::Float(n))
    }

    pub fn push_string(&mut self, s: &str) -> LuaResult<()> {
        self.push(LuaValue::string(s))
    }

    pub fn push_bytes(&mut self, b: &[u8]) -> LuaResult<()> {
        self.push(LuaValue::bytes(b))
    }

    pub fn push_rust_function(&mut self, f: CFunction) -> LuaResult<()> {
        self.push(LuaValue::cfunction(f))
    }

    /// Pop `n` values into closed upvalues of a new host closure
    pub fn push_rust_closure(&mut self, f: CFunction, n: usize) -> LuaResult<()> {
        let values = self.frame_mut().pop_n(n)?;
        let upvalues = values.into_iter().map(closed_upvalue).collect();
        self.push(LuaValue::Function(Rc::new(LuaClosure::native(f, upvalues))))
    }

    pub fn push_global_table(&mut self) -> LuaResult<()> {
        let globals = self.globals();
        self.push(globals)
    }

    // ============ Access functions ============

    pub fn type_of(&self, idx: i32) -> LuaType {
        if self.is_valid(idx) {
            LuaType::of(&self.get_value(idx))
        } else {
            LuaType::None
        }
    }

    pub fn type_name_of(&self, idx: i32) -> &'static str {
        self.type_of(idx).name()
    }

    pub fn is_none(&self, idx: i32) -> bool {
        self.type_of(idx) == LuaType::None
    }

    pub fn is_nil(&self, idx: i32) -> bool {
        self.type_of(idx) == LuaType::Nil
    }

    pub fn is_none_or_nil(&self, idx: i32) -> bool {
        matches!(self.type_of(idx), LuaType::None | LuaType::Nil)
    }

    pub fn is_boolean(&self, idx: i32) -> bool {
        self.type_of(idx) == LuaType::Boolean
    }

    pub fn is_table(&self, idx: i32) -> bool {
        self.type_of(idx) == LuaType::Table
    }

    pub fn is_function(&self, idx: i32) -> bool {
        self.type_of(idx) == LuaType::Function
    }

    pub fn is_rust_function(&self, idx: i32) -> bool {
        matches!(self.get_value(idx), LuaValue::Function(f) if f.is_native())
    }

    /// Numbers and strings both satisfy `is_string`, as in Lua
    pub fn is_string(&self, idx: i32) -> bool {
        matches!(self.type_of(idx), LuaType::String | LuaType::Number)
    }

    pub fn is_number(&self, idx: i32) -> bool {
        self.to_numberx(idx).is_some()
    }

    pub fn is_integer(&self, idx: i32) -> bool {
        matches!(self.get_value(idx), LuaValue::Integer(_))
    }

    pub fn to_boolean(&self, idx: i32) -> bool {
        self.get_value(idx).is_truthy()
    }

    pub fn to_numberx(&self, idx: i32) -> Option<f64> {
        self.get_value(idx).to_number()
    }

    pub fn to_number(&self, idx: i32) -> f64 {
        self.to_numberx(idx).unwrap_or(0.0)
    }

    pub fn to_integerx(&self, idx: i32) -> Option<i64> {
        self.get_value(idx).to_integer()
    }

    pub fn to_integer(&self, idx: i32) -> i64 {
        self.to_integerx(idx).unwrap_or(0)
    }

    /// String coercion; a number at `idx` is converted in place
    pub fn to_lua_stringx(&mut self, idx: i32) -> LuaResult<Option<LuaString>> {
        let val = self.get_value(idx);
        match &val {
            LuaValue::String(s) => Ok(Some(s.clone())),
            LuaValue::Integer(_) | LuaValue::Float(_) => {
                let s = val.to_lua_string();
                if let Some(s) = &s {
                    self.set_value(idx, LuaValue::String(s.clone()))?;
                }
                Ok(s)
            }
            _ => Ok(None),
        }
    }

    /// Lossy UTF-8 view of [`to_lua_stringx`](Self::to_lua_stringx); empty when not coercible
    pub fn to_string(&mut self, idx: i32) -> LuaResult<String> {
        Ok(self
            .to_lua_stringx(idx)?
            .map(|s| String::from_utf8_lossy(&s).into_owned())
            .unwrap_or_default())
    }
}
