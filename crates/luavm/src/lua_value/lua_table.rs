// Hybrid array + hash table
// The array part holds keys 1..=arr.len(); a key never lives in both parts.
use ahash::AHashMap;

use super::{LuaValue, TableRef};
use crate::lua_vm::{LuaError, LuaResult};

#[derive(Default)]
pub struct LuaTable {
    arr: Vec<LuaValue>,
    hash: AHashMap<LuaValue, LuaValue>,
    metatable: Option<TableRef>,
    /// Traversal snapshot: key -> successor key, with `Nil` mapping to the first key
    keys: Option<AHashMap<LuaValue, LuaValue>>,
    /// Set on any structural change since the snapshot was taken
    changed: bool,
}

impl LuaTable {
    pub fn new(array_size: usize, hash_size: usize) -> Self {
        LuaTable {
            arr: Vec::with_capacity(array_size),
            hash: AHashMap::with_capacity(hash_size),
            metatable: None,
            keys: None,
            changed: false,
        }
    }

    pub fn metatable(&self) -> Option<TableRef> {
        self.metatable.clone()
    }

    pub fn set_metatable(&mut self, mt: Option<TableRef>) {
        self.metatable = mt;
    }

    /// Raw lookup of a metamethod in this table's metatable.
    pub fn has_metafield(&self, name: &str) -> bool {
        match &self.metatable {
            Some(mt) => !mt.borrow().get_str(name).is_nil(),
            None => false,
        }
    }

    /// Length of the array part (a border when the table is a sequence)
    pub fn len(&self) -> usize {
        self.arr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arr.is_empty() && self.hash.is_empty()
    }

    pub fn get(&self, key: &LuaValue) -> LuaValue {
        let key = key.clone().normalize_key();
        if let LuaValue::Integer(idx) = key {
            return self.get_int(idx);
        }
        self.hash.get(&key).cloned().unwrap_or_default()
    }

    pub fn get_int(&self, idx: i64) -> LuaValue {
        if idx >= 1 && idx <= self.arr.len() as i64 {
            return self.arr[(idx - 1) as usize].clone();
        }
        self.hash
            .get(&LuaValue::Integer(idx))
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_str(&self, key: &str) -> LuaValue {
        self.hash
            .get(&LuaValue::string(key))
            .cloned()
            .unwrap_or_default()
    }

    /// Raw store. Nil and NaN keys are rejected.
    pub fn put(&mut self, key: LuaValue, val: LuaValue) -> LuaResult<()> {
        let key = key.normalize_key();
        match &key {
            LuaValue::Nil => return Err(LuaError::Runtime("table index is nil".to_string())),
            LuaValue::Float(n) if n.is_nan() => {
                return Err(LuaError::Runtime("table index is NaN".to_string()));
            }
            _ => {}
        }

        if let LuaValue::Integer(idx) = key
            && idx >= 1
        {
            let arr_len = self.arr.len() as i64;
            if idx <= arr_len {
                self.arr[(idx - 1) as usize] = val;
                if idx == arr_len && self.arr[(idx - 1) as usize].is_nil() {
                    self.shrink_array();
                    self.changed = true;
                }
                return Ok(());
            }
            if idx == arr_len + 1 {
                if self.hash.remove(&key).is_some() {
                    self.changed = true;
                }
                if !val.is_nil() {
                    self.arr.push(val);
                    self.expand_array();
                    self.changed = true;
                }
                return Ok(());
            }
        }

        if val.is_nil() {
            if self.hash.remove(&key).is_some() {
                self.changed = true;
            }
        } else if self.hash.insert(key, val).is_none() {
            self.changed = true;
        }
        Ok(())
    }

    pub fn put_int(&mut self, idx: i64, val: LuaValue) -> LuaResult<()> {
        self.put(LuaValue::Integer(idx), val)
    }

    fn shrink_array(&mut self) {
        while self.arr.last().is_some_and(LuaValue::is_nil) {
            self.arr.pop();
        }
    }

    /// Migrate the integer keys that now continue the array out of the hash part
    fn expand_array(&mut self) {
        loop {
            let next = LuaValue::Integer(self.arr.len() as i64 + 1);
            match self.hash.remove(&next) {
                Some(v) => self.arr.push(v),
                None => break,
            }
        }
    }

    /// Successor of `key` in traversal order; `Nil` starts a traversal.
    ///
    /// The key order is frozen in a snapshot taken when a traversal starts
    /// after a structural change. Updating or clearing existing fields during
    /// a traversal is fine (cleared keys are skipped); adding new keys
    /// mid-traversal is undefined, as in Lua.
    pub fn next(&mut self, key: &LuaValue) -> LuaResult<Option<(LuaValue, LuaValue)>> {
        let key = key.clone().normalize_key();
        if self.keys.is_none() || (key.is_nil() && self.changed) {
            self.init_keys();
            self.changed = false;
        }

        let Some(keys) = &self.keys else {
            return Ok(None);
        };
        let mut cur = match keys.get(&key) {
            Some(k) => k.clone(),
            None => return Err(LuaError::Runtime("invalid key to 'next'".to_string())),
        };
        loop {
            if cur.is_nil() {
                return Ok(None);
            }
            let val = self.get(&cur);
            if !val.is_nil() {
                return Ok(Some((cur, val)));
            }
            cur = keys.get(&cur).cloned().unwrap_or_default();
        }
    }

    fn init_keys(&mut self) {
        let mut keys = AHashMap::with_capacity(self.arr.len() + self.hash.len() + 1);
        let mut prev = LuaValue::Nil;
        for (i, v) in self.arr.iter().enumerate() {
            if !v.is_nil() {
                let k = LuaValue::Integer(i as i64 + 1);
                keys.insert(prev, k.clone());
                prev = k;
            }
        }
        for k in self.hash.keys() {
            keys.insert(prev, k.clone());
            prev = k.clone();
        }
        keys.insert(prev, LuaValue::Nil);
        self.keys = Some(keys);
    }
}
