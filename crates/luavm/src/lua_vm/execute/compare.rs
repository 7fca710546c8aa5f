use std::cmp::Ordering;

use super::TmKind;
use crate::lua_value::LuaValue;
use crate::lua_vm::{CompareOp, LuaError, LuaResult, LuaVM};

/// Order between two numbers or two strings; `None` for any other pair
fn primitive_order(a: &LuaValue, b: &LuaValue) -> Option<Option<Ordering>> {
    match (a, b) {
        (LuaValue::Integer(x), LuaValue::Integer(y)) => Some(Some(x.cmp(y))),
        (LuaValue::Integer(x), LuaValue::Float(y)) => Some((*x as f64).partial_cmp(y)),
        (LuaValue::Float(x), LuaValue::Integer(y)) => Some(x.partial_cmp(&(*y as f64))),
        (LuaValue::Float(x), LuaValue::Float(y)) => Some(x.partial_cmp(y)),
        (LuaValue::String(x), LuaValue::String(y)) => Some(Some(x.cmp(y))),
        _ => None,
    }
}

fn compare_error(a: &LuaValue, b: &LuaValue) -> LuaError {
    let (t1, t2) = (a.type_name(), b.type_name());
    if t1 == t2 {
        LuaError::Compare(format!("attempt to compare two {} values", t1))
    } else {
        LuaError::Compare(format!("attempt to compare {} with {}", t1, t2))
    }
}

impl LuaVM {
    /// Compare the values at two indices; invalid indices compare false
    pub fn compare(&mut self, idx1: i32, idx2: i32, op: CompareOp) -> LuaResult<bool> {
        if !self.is_valid(idx1) || !self.is_valid(idx2) {
            return Ok(false);
        }
        let a = self.get_value(idx1);
        let b = self.get_value(idx2);
        match op {
            CompareOp::Eq => self.values_equal(&a, &b),
            CompareOp::Lt => self.less_than(&a, &b),
            CompareOp::Le => self.less_equal(&a, &b),
        }
    }

    /// Equality without metamethods
    pub fn raw_equal(&self, idx1: i32, idx2: i32) -> bool {
        if !self.is_valid(idx1) || !self.is_valid(idx2) {
            return false;
        }
        self.get_value(idx1).lua_eq(&self.get_value(idx2))
    }

    pub(crate) fn values_equal(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
        if a.lua_eq(b) {
            return Ok(true);
        }
        if !(a.is_table() && b.is_table()) {
            return Ok(false);
        }
        Ok(self
            .try_bin_metamethod(a, b, TmKind::Eq)?
            .is_some_and(|v| v.is_truthy()))
    }

    pub(crate) fn less_than(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
        if let Some(ord) = primitive_order(a, b) {
            return Ok(ord == Some(Ordering::Less));
        }
        match self.try_bin_metamethod(a, b, TmKind::Lt)? {
            Some(v) => Ok(v.is_truthy()),
            None => Err(compare_error(a, b)),
        }
    }

    pub(crate) fn less_equal(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
        if let Some(ord) = primitive_order(a, b) {
            return Ok(matches!(ord, Some(Ordering::Less | Ordering::Equal)));
        }
        if let Some(v) = self.try_bin_metamethod(a, b, TmKind::Le)? {
            return Ok(v.is_truthy());
        }
        // a <= b  as  not (b < a)
        match self.try_bin_metamethod(b, a, TmKind::Lt)? {
            Some(v) => Ok(!v.is_truthy()),
            None => Err(compare_error(a, b)),
        }
    }
}
