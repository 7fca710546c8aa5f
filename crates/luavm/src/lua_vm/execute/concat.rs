use std::rc::Rc;

use super::TmKind;
use crate::lua_value::{LuaString, LuaValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

impl LuaVM {
    /// Push the length of the value at `idx`, honouring `__len`
    pub fn len(&mut self, idx: i32) -> LuaResult<()> {
        let val = self.get_value(idx);
        if let LuaValue::String(s) = &val {
            return self.push_integer(s.len() as i64);
        }
        let mm = self.get_metafield(&val, TmKind::Len);
        if !mm.is_nil() {
            let result = self.call_metamethod(mm, &[val.clone(), val])?;
            return self.push(result);
        }
        if let LuaValue::Table(t) = &val {
            let n = t.borrow().len() as i64;
            return self.push_integer(n);
        }
        Err(LuaError::Type(format!(
            "attempt to get length of a {} value",
            val.type_name()
        )))
    }

    /// Length without metamethods; zero for values without a length
    pub fn raw_len(&self, idx: i32) -> usize {
        match self.get_value(idx) {
            LuaValue::String(s) => s.len(),
            LuaValue::Table(t) => t.borrow().len(),
            _ => 0,
        }
    }

    /// Concatenate the `n` values at the top, leaving the result in their place
    pub fn concat(&mut self, n: usize) -> LuaResult<()> {
        if n == 0 {
            return self.push_bytes(b"");
        }
        for _ in 1..n {
            let b = self.pop_value()?;
            let a = self.pop_value()?;
            if let (Some(s1), Some(s2)) = (a.to_lua_string(), b.to_lua_string()) {
                let mut joined = Vec::with_capacity(s1.len() + s2.len());
                joined.extend_from_slice(&s1);
                joined.extend_from_slice(&s2);
                self.push(LuaValue::String(Rc::from(joined)))?;
                continue;
            }
            match self.try_bin_metamethod(&a, &b, TmKind::Concat)? {
                Some(v) => self.push(v)?,
                None => {
                    let bad = if a.to_lua_string().is_none() { &a } else { &b };
                    return Err(LuaError::Arithmetic(format!(
                        "attempt to concatenate a {} value",
                        bad.type_name()
                    )));
                }
            }
        }
        Ok(())
    }

    /// `tostring` conversion: `__tostring` first, then the default rendering
    pub fn to_display_string(&mut self, idx: i32) -> LuaResult<LuaString> {
        let val = self.get_value(idx);
        let mm = self.get_metafield(&val, TmKind::ToString);
        if !mm.is_nil() {
            return match self.call_metamethod(mm, &[val])? {
                LuaValue::String(s) => Ok(s),
                _ => Err(LuaError::Runtime(
                    "'__tostring' must return a string".to_string(),
                )),
            };
        }
        Ok(match val.to_lua_string() {
            Some(s) => s,
            None => Rc::from(val.to_string().as_bytes()),
        })
    }
}
