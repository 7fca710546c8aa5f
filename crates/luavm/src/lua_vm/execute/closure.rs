// Support API used by the instruction handlers: program counter,
// constants, varargs, closure creation and upvalue closing.
use std::rc::Rc;

use crate::binchunk::Chunk;
use crate::lua_value::{LuaClosure, LuaValue, Upvalue};
use crate::lua_vm::{Instruction, LuaError, LuaResult, LuaVM};

impl LuaVM {
    pub(crate) fn current_chunk(&self) -> LuaResult<Rc<Chunk>> {
        self.frame()
            .chunk()
            .cloned()
            .ok_or_else(|| LuaError::Runtime("no Lua function is running".to_string()))
    }

    pub fn pc(&self) -> usize {
        self.frame().pc
    }

    pub fn add_pc(&mut self, n: i32) {
        let frame = self.frame_mut();
        frame.pc = frame.pc.wrapping_add_signed(n as isize);
    }

    /// Fetch the instruction at pc and advance pc
    pub fn fetch(&mut self) -> LuaResult<u32> {
        let frame = self.frame_mut();
        let pc = frame.pc;
        let instr = frame
            .chunk()
            .and_then(|c| c.code.get(pc).copied())
            .ok_or_else(|| LuaError::Runtime(format!("pc {} out of range", pc)))?;
        frame.pc += 1;
        Ok(instr)
    }

    pub fn get_const(&mut self, idx: usize) -> LuaResult<()> {
        let chunk = self.current_chunk()?;
        let val = chunk
            .constants
            .get(idx)
            .cloned()
            .ok_or_else(|| LuaError::Runtime(format!("constant {} out of range", idx)))?;
        self.push(val)
    }

    /// Push a register (0-based) or, with bit 8 set, a constant
    pub fn get_rk(&mut self, rk: u32) -> LuaResult<()> {
        if Instruction::is_k(rk) {
            self.get_const(Instruction::rk_index(rk) as usize)
        } else {
            self.push_value(rk as i32 + 1)
        }
    }

    pub fn register_count(&self) -> i32 {
        self.frame()
            .chunk()
            .map(|c| c.max_stack_size as i32)
            .unwrap_or(0)
    }

    /// Push `n` varargs (nil-padded); `n < 0` pushes them all
    pub fn load_vararg(&mut self, n: i32) -> LuaResult<()> {
        let varargs = self.frame().varargs.clone();
        let count = if n < 0 { varargs.len() } else { n as usize };
        self.ensure_stack(count)?;
        self.frame_mut().push_n(varargs, n)
    }

    /// Instantiate nested prototype `idx` as a closure and push it.
    /// Register upvalues share the open cell of this frame when one exists.
    pub fn load_proto(&mut self, idx: usize) -> LuaResult<()> {
        let depth = self.frames.len() - 1;
        let parent = self
            .frame()
            .closure
            .clone()
            .ok_or_else(|| LuaError::Runtime("no Lua function is running".to_string()))?;
        let proto = parent
            .chunk()
            .and_then(|c| c.protos.get(idx).cloned())
            .ok_or_else(|| LuaError::Runtime(format!("prototype {} out of range", idx)))?;

        let mut upvalues = Vec::with_capacity(proto.upvalues.len());
        for desc in &proto.upvalues {
            let slot = desc.idx as usize;
            if desc.instack {
                let frame = self.frame_mut();
                let cell = frame
                    .open_upvalues
                    .entry(slot)
                    .or_insert_with(|| {
                        Rc::new(std::cell::RefCell::new(Upvalue::Open { frame: depth, slot }))
                    })
                    .clone();
                upvalues.push(cell);
            } else {
                let cell = parent.upvalues().get(slot).cloned().ok_or_else(|| {
                    LuaError::Runtime(format!("upvalue {} out of range", slot))
                })?;
                upvalues.push(cell);
            }
        }

        self.push(LuaValue::Function(Rc::new(LuaClosure::lua(proto, upvalues))))
    }

    /// Close the open upvalues of registers `a - 1` and above (`a` is 1-based)
    pub fn close_upvalues(&mut self, a: i32) {
        let from = (a - 1).max(0) as usize;
        self.frame_mut().close_upvalues_from(from);
    }

    /// "chunkname:line: " of the function `level` calls up from the running
    /// one; empty when that function has no line information.
    pub fn location(&self, level: usize) -> String {
        let Some(depth) = self.frames.len().checked_sub(level + 1) else {
            return String::new();
        };
        let frame = &self.frames[depth];
        let Some(chunk) = frame.chunk() else {
            return String::new();
        };
        match chunk.line_at(frame.pc.saturating_sub(1)) {
            Some(line) if line > 0 => format!("{}:{}: ", chunk_id(&chunk.source), line),
            _ => String::new(),
        }
    }
}

/// Display name of a chunk source: `@file` and `=name` drop the prefix,
/// anything else is source text
fn chunk_id(source: &str) -> String {
    if let Some(name) = source.strip_prefix('@').or_else(|| source.strip_prefix('=')) {
        return name.to_string();
    }
    let first_line = source.lines().next().unwrap_or("");
    format!("[string \"{}\"]", first_line)
}
