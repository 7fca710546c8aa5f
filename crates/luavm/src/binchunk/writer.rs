use super::*;

/// Encode a prototype tree in the luac 5.3 format read by [`undump`](super::undump).
pub fn dump(chunk: &Chunk, strip: bool) -> Vec<u8> {
    let mut w = Writer {
        buf: Vec::new(),
        strip,
    };
    w.write_header();
    w.buf.push(chunk.upvalues.len() as u8);
    w.write_proto(chunk, None);
    w.buf
}

struct Writer {
    buf: Vec<u8>,
    strip: bool,
}

impl Writer {
    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, n: usize) {
        self.write_u32(n as u32);
    }

    fn write_string(&mut self, s: Option<&[u8]>) {
        let Some(s) = s else {
            self.buf.push(0);
            return;
        };
        let size = s.len() + 1;
        if size < 0xFF {
            self.buf.push(size as u8);
        } else {
            self.buf.push(0xFF);
            self.write_u64(size as u64);
        }
        self.buf.extend_from_slice(s);
    }

    fn write_header(&mut self) {
        self.buf.extend_from_slice(LUA_SIGNATURE);
        self.buf.push(LUAC_VERSION);
        self.buf.push(LUAC_FORMAT);
        self.buf.extend_from_slice(LUAC_DATA);
        self.buf.extend_from_slice(&[
            CINT_SIZE,
            CSIZET_SIZE,
            INSTRUCTION_SIZE,
            LUA_INTEGER_SIZE,
            LUA_NUMBER_SIZE,
        ]);
        self.write_u64(LUAC_INT as u64);
        self.write_u64(LUAC_NUM.to_bits());
    }

    fn write_proto(&mut self, chunk: &Chunk, parent_source: Option<&str>) {
        // nested prototypes only repeat the source when it differs
        if self.strip || parent_source == Some(chunk.source.as_str()) {
            self.write_string(None);
        } else {
            self.write_string(Some(chunk.source.as_bytes()));
        }
        self.write_u32(chunk.line_defined);
        self.write_u32(chunk.last_line_defined);
        self.buf.push(chunk.num_params);
        self.buf.push(chunk.is_vararg as u8);
        self.buf.push(chunk.max_stack_size);

        self.write_count(chunk.code.len());
        for &i in &chunk.code {
            self.write_u32(i);
        }

        self.write_count(chunk.constants.len());
        for k in &chunk.constants {
            match k {
                LuaValue::Boolean(b) => {
                    self.buf.push(TAG_BOOLEAN);
                    self.buf.push(*b as u8);
                }
                LuaValue::Integer(i) => {
                    self.buf.push(TAG_INTEGER);
                    self.write_u64(*i as u64);
                }
                LuaValue::Float(n) => {
                    self.buf.push(TAG_NUMBER);
                    self.write_u64(n.to_bits());
                }
                LuaValue::String(s) => {
                    self.buf
                        .push(if s.len() < 40 { TAG_SHORT_STR } else { TAG_LONG_STR });
                    self.write_string(Some(s));
                }
                LuaValue::Nil | LuaValue::Table(_) | LuaValue::Function(_) => {
                    self.buf.push(TAG_NIL);
                }
            }
        }

        self.write_count(chunk.upvalues.len());
        for uv in &chunk.upvalues {
            self.buf.push(uv.instack as u8);
            self.buf.push(uv.idx);
        }

        self.write_count(chunk.protos.len());
        for p in &chunk.protos {
            self.write_proto(p, Some(&chunk.source));
        }

        if self.strip {
            self.write_count(0);
            self.write_count(0);
            self.write_count(0);
            return;
        }
        self.write_count(chunk.line_info.len());
        for &line in &chunk.line_info {
            self.write_u32(line);
        }
        self.write_count(chunk.loc_vars.len());
        for v in &chunk.loc_vars {
            self.write_string(Some(v.name.as_bytes()));
            self.write_u32(v.start_pc);
            self.write_u32(v.end_pc);
        }
        self.write_count(chunk.upvalue_names.len());
        for name in &chunk.upvalue_names {
            self.write_string(Some(name.as_bytes()));
        }
    }
}
