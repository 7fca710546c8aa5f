use std::rc::Rc;

use tracing::debug;

use super::*;
use crate::lua_vm::{LuaError, LuaResult};

/// Decode a precompiled chunk into its main prototype.
pub fn undump(data: &[u8]) -> LuaResult<Rc<Chunk>> {
    let mut reader = Reader { data, pos: 0 };
    reader.check_header()?;
    // number of upvalues of the main function, repeated in its prototype
    reader.read_byte()?;
    let chunk = reader.read_proto("")?;
    debug!(
        source = %chunk.source,
        instructions = chunk.code.len(),
        protos = chunk.protos.len(),
        "undumped binary chunk"
    );
    Ok(Rc::new(chunk))
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

fn truncated() -> LuaError {
    LuaError::Load("truncated precompiled chunk".to_string())
}

impl<'a> Reader<'a> {
    fn read_bytes(&mut self, n: usize) -> LuaResult<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or_else(truncated)?;
        let bytes = self.data.get(self.pos..end).ok_or_else(truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> LuaResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    fn read_byte(&mut self) -> LuaResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_u32(&mut self) -> LuaResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> LuaResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    fn read_lua_integer(&mut self) -> LuaResult<i64> {
        Ok(self.read_u64()? as i64)
    }

    fn read_lua_number(&mut self) -> LuaResult<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    fn read_count(&mut self) -> LuaResult<usize> {
        let n = self.read_u32()? as usize;
        // every element takes at least one byte
        if n > self.data.len() - self.pos {
            return Err(truncated());
        }
        Ok(n)
    }

    /// Size byte (0xFF escapes to a size_t), stored as length + 1; 0 is the null string
    fn read_string_bytes(&mut self) -> LuaResult<Option<&'a [u8]>> {
        let mut size = self.read_byte()? as u64;
        if size == 0xFF {
            size = self.read_u64()?;
        }
        if size == 0 {
            return Ok(None);
        }
        let len = usize::try_from(size - 1).map_err(|_| truncated())?;
        Ok(Some(self.read_bytes(len)?))
    }

    fn read_string(&mut self) -> LuaResult<String> {
        Ok(self
            .read_string_bytes()?
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default())
    }

    fn check_header(&mut self) -> LuaResult<()> {
        if self.read_bytes(4)? != LUA_SIGNATURE {
            return Err(LuaError::Load("not a precompiled chunk".to_string()));
        }
        if self.read_byte()? != LUAC_VERSION {
            return Err(LuaError::Load("version mismatch".to_string()));
        }
        if self.read_byte()? != LUAC_FORMAT {
            return Err(LuaError::Load("format mismatch".to_string()));
        }
        if self.read_bytes(6)? != LUAC_DATA {
            return Err(LuaError::Load("corrupted chunk".to_string()));
        }
        for (expected, what) in [
            (CINT_SIZE, "int"),
            (CSIZET_SIZE, "size_t"),
            (INSTRUCTION_SIZE, "Instruction"),
            (LUA_INTEGER_SIZE, "lua_Integer"),
            (LUA_NUMBER_SIZE, "lua_Number"),
        ] {
            if self.read_byte()? != expected {
                return Err(LuaError::Load(format!("{} size mismatch", what)));
            }
        }
        if self.read_lua_integer()? != LUAC_INT {
            return Err(LuaError::Load("endianness mismatch".to_string()));
        }
        if self.read_lua_number()? != LUAC_NUM {
            return Err(LuaError::Load("float format mismatch".to_string()));
        }
        Ok(())
    }

    fn read_proto(&mut self, parent_source: &str) -> LuaResult<Chunk> {
        let mut source = self.read_string()?;
        if source.is_empty() {
            source = parent_source.to_string();
        }
        let line_defined = self.read_u32()?;
        let last_line_defined = self.read_u32()?;
        let num_params = self.read_byte()?;
        let is_vararg = self.read_byte()? != 0;
        let max_stack_size = self.read_byte()?;

        let n = self.read_count()?;
        let code = (0..n)
            .map(|_| self.read_u32())
            .collect::<LuaResult<Vec<_>>>()?;

        let n = self.read_count()?;
        let constants = (0..n)
            .map(|_| self.read_constant())
            .collect::<LuaResult<Vec<_>>>()?;

        let n = self.read_count()?;
        let upvalues = (0..n)
            .map(|_| {
                Ok(UpvalueDesc {
                    instack: self.read_byte()? != 0,
                    idx: self.read_byte()?,
                })
            })
            .collect::<LuaResult<Vec<_>>>()?;

        let n = self.read_count()?;
        let protos = (0..n)
            .map(|_| self.read_proto(&source).map(Rc::new))
            .collect::<LuaResult<Vec<_>>>()?;

        let n = self.read_count()?;
        let line_info = (0..n)
            .map(|_| self.read_u32())
            .collect::<LuaResult<Vec<_>>>()?;

        let n = self.read_count()?;
        let loc_vars = (0..n)
            .map(|_| {
                Ok(LocVar {
                    name: self.read_string()?,
                    start_pc: self.read_u32()?,
                    end_pc: self.read_u32()?,
                })
            })
            .collect::<LuaResult<Vec<_>>>()?;

        let n = self.read_count()?;
        let upvalue_names = (0..n)
            .map(|_| self.read_string())
            .collect::<LuaResult<Vec<_>>>()?;

        Ok(Chunk {
            source,
            line_defined,
            last_line_defined,
            num_params,
            is_vararg,
            max_stack_size,
            code,
            constants,
            upvalues,
            protos,
            line_info,
            loc_vars,
            upvalue_names,
        })
    }

    fn read_constant(&mut self) -> LuaResult<LuaValue> {
        match self.read_byte()? {
            TAG_NIL => Ok(LuaValue::Nil),
            TAG_BOOLEAN => Ok(LuaValue::Boolean(self.read_byte()? != 0)),
            TAG_INTEGER => Ok(LuaValue::Integer(self.read_lua_integer()?)),
            TAG_NUMBER => Ok(LuaValue::Float(self.read_lua_number()?)),
            TAG_SHORT_STR | TAG_LONG_STR => {
                let bytes = self.read_string_bytes()?.unwrap_or_default();
                Ok(LuaValue::bytes(bytes))
            }
            tag => Err(LuaError::Load(format!("bad constant tag 0x{:02x}", tag))),
        }
    }
}
