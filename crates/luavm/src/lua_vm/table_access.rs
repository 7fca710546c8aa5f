// Table access through the stack: get/set with `__index` / `__newindex`,
// raw variants, globals, metatables and traversal
use std::rc::Rc;

use ahash::AHashSet;

use super::{LUA_RIDX_GLOBALS, LuaError, LuaResult, LuaType, LuaVM, TmKind};
use crate::lua_value::{CFunction, LuaTable, LuaValue, TableRef, str_to_number};

fn expect_table(val: &LuaValue) -> LuaResult<&TableRef> {
    val.as_table().ok_or_else(|| {
        LuaError::Type(format!("table expected, got {}", val.type_name()))
    })
}

/// Values already visited while walking an `__index` / `__newindex` chain.
/// Non-table values share their type's metatable, so they are tracked by type.
#[derive(Default)]
struct ChainVisits {
    tables: AHashSet<*const ()>,
    types: AHashSet<i32>,
}

impl ChainVisits {
    /// False when `v` was already visited, i.e. the chain loops
    fn visit(&mut self, v: &LuaValue) -> bool {
        match v {
            LuaValue::Table(t) => self.tables.insert(Rc::as_ptr(t) as *const ()),
            other => self.types.insert(LuaType::of(other) as i32),
        }
    }
}

impl LuaVM {
    // ============ Get functions ============

    /// Push a new table with room for `narr` array items and `nrec` fields
    pub fn create_table(&mut self, narr: usize, nrec: usize) -> LuaResult<()> {
        self.push(LuaValue::table(LuaTable::new(narr, nrec)))
    }

    pub fn new_table(&mut self) -> LuaResult<()> {
        self.create_table(0, 0)
    }

    /// Pop a key and push `t[key]` for the table at `idx`
    pub fn get_table(&mut self, idx: i32) -> LuaResult<LuaType> {
        let t = self.get_value(idx);
        let k = self.pop_value()?;
        self.push_index_result(t, k)
    }

    pub fn get_field(&mut self, idx: i32, k: &str) -> LuaResult<LuaType> {
        let t = self.get_value(idx);
        self.push_index_result(t, LuaValue::string(k))
    }

    pub fn get_i(&mut self, idx: i32, i: i64) -> LuaResult<LuaType> {
        let t = self.get_value(idx);
        self.push_index_result(t, LuaValue::Integer(i))
    }

    fn push_index_result(&mut self, t: LuaValue, k: LuaValue) -> LuaResult<LuaType> {
        let v = self.index_value(t, k)?;
        let tp = LuaType::of(&v);
        self.push(v)?;
        Ok(tp)
    }

    /// [`get_table`](Self::get_table) without metamethods
    pub fn raw_get(&mut self, idx: i32) -> LuaResult<LuaType> {
        let t = self.get_value(idx);
        let k = self.pop_value()?;
        let v = expect_table(&t)?.borrow().get(&k);
        let tp = LuaType::of(&v);
        self.push(v)?;
        Ok(tp)
    }

    pub fn raw_geti(&mut self, idx: i32, i: i64) -> LuaResult<LuaType> {
        let t = self.get_value(idx);
        let v = expect_table(&t)?.borrow().get_int(i);
        let tp = LuaType::of(&v);
        self.push(v)?;
        Ok(tp)
    }

    /// Push the metatable of the value at `idx`; false (nothing pushed) when it has none
    pub fn get_metatable(&mut self, idx: i32) -> LuaResult<bool> {
        let val = self.get_value(idx);
        match self.metatable_of(&val) {
            Some(mt) => {
                self.push(LuaValue::Table(mt))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get_global(&mut self, name: &str) -> LuaResult<LuaType> {
        let globals = self.registry.borrow().get_int(LUA_RIDX_GLOBALS);
        self.push_index_result(globals, LuaValue::string(name))
    }

    // ============ Set functions ============

    /// Pop a value and a key and assign `t[key] = value` for the table at `idx`
    pub fn set_table(&mut self, idx: i32) -> LuaResult<()> {
        let t = self.get_value(idx);
        let v = self.pop_value()?;
        let k = self.pop_value()?;
        self.newindex_value(t, k, v)
    }

    pub fn set_field(&mut self, idx: i32, k: &str) -> LuaResult<()> {
        let t = self.get_value(idx);
        let v = self.pop_value()?;
        self.newindex_value(t, LuaValue::string(k), v)
    }

    pub fn set_i(&mut self, idx: i32, i: i64) -> LuaResult<()> {
        let t = self.get_value(idx);
        let v = self.pop_value()?;
        self.newindex_value(t, LuaValue::Integer(i), v)
    }

    /// [`set_table`](Self::set_table) without metamethods
    pub fn raw_set(&mut self, idx: i32) -> LuaResult<()> {
        let t = self.get_value(idx);
        let v = self.pop_value()?;
        let k = self.pop_value()?;
        expect_table(&t)?.borrow_mut().put(k, v)
    }

    pub fn raw_seti(&mut self, idx: i32, i: i64) -> LuaResult<()> {
        let t = self.get_value(idx);
        let v = self.pop_value()?;
        expect_table(&t)?.borrow_mut().put_int(i, v)
    }

    /// Pop a table (or nil) and install it as the metatable of the value at `idx`
    pub fn set_metatable(&mut self, idx: i32) -> LuaResult<()> {
        let val = self.get_value(idx);
        let mt = match self.pop_value()? {
            LuaValue::Nil => None,
            LuaValue::Table(t) => Some(t),
            other => return Err(LuaError::Type(format!(
                "table expected, got {}",
                other.type_name()
            ))),
        };
        self.set_metatable_of(&val, mt)
    }

    pub fn set_global(&mut self, name: &str) -> LuaResult<()> {
        let globals = self.registry.borrow().get_int(LUA_RIDX_GLOBALS);
        let v = self.pop_value()?;
        self.newindex_value(globals, LuaValue::string(name), v)
    }

    /// Bind a host function to a global name
    pub fn register(&mut self, name: &str, f: CFunction) -> LuaResult<()> {
        self.push_rust_function(f)?;
        self.set_global(name)
    }

    // ============ Misc ============

    /// Pop a key and push the next key/value pair of the table at `idx`.
    /// Returns false (nothing pushed) at the end of the traversal.
    pub fn next(&mut self, idx: i32) -> LuaResult<bool> {
        let t = self.get_value(idx);
        let k = self.pop_value()?;
        let entry = expect_table(&t)?.borrow_mut().next(&k)?;
        match entry {
            Some((k, v)) => {
                self.ensure_stack(2)?;
                self.push(k)?;
                self.push(v)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Pop the top value as the payload of a raised error
    pub fn error(&mut self) -> LuaError {
        LuaError::Value(self.pop_value().unwrap_or_default())
    }

    /// Push the numeral `s` converted to a number; false when `s` is not a numeral
    pub fn string_to_number(&mut self, s: &str) -> bool {
        match str_to_number(s.as_bytes()) {
            Some(n) => self.push(n).is_ok(),
            None => false,
        }
    }

    // ============ Metamethod-aware access ============

    /// `t[k]` following `__index` chains
    pub(crate) fn index_value(&mut self, t: LuaValue, k: LuaValue) -> LuaResult<LuaValue> {
        let mut t = t;
        let mut visits = ChainVisits::default();
        loop {
            if !visits.visit(&t) {
                return Err(LuaError::Runtime("'__index' chain contains a loop".to_string()));
            }
            let tm = match &t {
                LuaValue::Table(tbl) => {
                    let v = tbl.borrow().get(&k);
                    if !v.is_nil() {
                        return Ok(v);
                    }
                    let tm = self.get_metafield(&t, TmKind::Index);
                    if tm.is_nil() {
                        return Ok(LuaValue::Nil);
                    }
                    tm
                }
                _ => {
                    let tm = self.get_metafield(&t, TmKind::Index);
                    if tm.is_nil() {
                        return Err(LuaError::Type(format!(
                            "attempt to index a {} value",
                            t.type_name()
                        )));
                    }
                    tm
                }
            };
            if tm.is_function() {
                return self.call_metamethod(tm, &[t, k]);
            }
            t = tm;
        }
    }

    /// `t[k] = v` following `__newindex` chains
    pub(crate) fn newindex_value(&mut self, t: LuaValue, k: LuaValue, v: LuaValue) -> LuaResult<()> {
        let mut t = t;
        let mut visits = ChainVisits::default();
        loop {
            if !visits.visit(&t) {
                return Err(LuaError::Runtime("'__newindex' chain contains a loop".to_string()));
            }
            let tm = match &t {
                LuaValue::Table(tbl) => {
                    let existing = tbl.borrow().get(&k);
                    let tm = if existing.is_nil() {
                        self.get_metafield(&t, TmKind::NewIndex)
                    } else {
                        LuaValue::Nil
                    };
                    if tm.is_nil() {
                        return tbl.borrow_mut().put(k, v);
                    }
                    tm
                }
                _ => {
                    let tm = self.get_metafield(&t, TmKind::NewIndex);
                    if tm.is_nil() {
                        return Err(LuaError::Type(format!(
                            "attempt to index a {} value",
                            t.type_name()
                        )));
                    }
                    tm
                }
            };
            if tm.is_function() {
                self.call_metamethod(tm, &[t, k, v])?;
                return Ok(());
            }
            t = tm;
        }
    }
}
