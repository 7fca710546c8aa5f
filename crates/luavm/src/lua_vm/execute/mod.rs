// Call protocol and the fetch-decode-execute loop
//
// Every call pushes a fresh frame and pops it again on both the success and
// the error path, so a fault unwinds the call stack one level at a time and
// open upvalues are closed before their frame disappears.
mod arith;
mod closure;
mod compare;
mod concat;
mod metamethod;

use std::rc::Rc;

use tracing::{debug, trace};

pub use metamethod::TmKind;

use super::dispatcher::dispatch_instruction;
use super::{
    Instruction, LUA_MINSTACK, LUA_RIDX_GLOBALS, LuaCallFrame, LuaError, LuaResult, LuaStatus,
    LuaVM, OpCode,
};
use crate::binchunk::{self, Chunk};
use crate::lua_value::{CFunction, FunctionRef, LuaClosure, LuaValue, closed_upvalue};

impl LuaVM {
    /// Wrap a prototype in a closure and push it. The first upvalue is bound
    /// to the globals table.
    pub fn load(&mut self, chunk: Rc<Chunk>) -> LuaResult<()> {
        let globals = self.registry.borrow().get_int(LUA_RIDX_GLOBALS);
        let upvalues = (0..chunk.upvalues.len())
            .map(|i| closed_upvalue(if i == 0 { globals.clone() } else { LuaValue::Nil }))
            .collect();
        debug!(source = %chunk.source, "loaded chunk");
        self.push(LuaValue::function(LuaClosure::lua(chunk, upvalues)))
    }

    /// Undump a precompiled chunk and push it as a closure
    pub fn load_binary(&mut self, data: &[u8]) -> LuaResult<()> {
        let chunk = binchunk::undump(data)?;
        self.load(chunk)
    }

    /// Serialize the Lua function on the top of the stack; `None` for host functions
    pub fn dump(&self, strip: bool) -> Option<Vec<u8>> {
        match self.get_value(-1) {
            LuaValue::Function(f) => f.chunk().map(|c| binchunk::dump(c, strip)),
            _ => None,
        }
    }

    /// Call the function below the `nargs` values at the top.
    /// Results are adjusted to `nresults` unless it is `LUA_MULTRET`.
    pub fn call(&mut self, nargs: usize, nresults: i32) -> LuaResult<()> {
        let mut nargs = nargs;
        let func_idx = -(nargs as i32) - 1;
        let val = self.get_value(func_idx);

        let closure = match &val {
            LuaValue::Function(f) => f.clone(),
            _ => {
                // callable object: its __call receives the object as first argument
                let mm = self.get_metafield(&val, TmKind::Call);
                let LuaValue::Function(f) = mm.clone() else {
                    return Err(LuaError::Type(format!(
                        "attempt to call a {} value",
                        val.type_name()
                    )));
                };
                self.ensure_stack(1)?;
                self.push(val)?;
                self.insert(func_idx)?;
                self.set_value(func_idx - 1, mm)?;
                nargs += 1;
                f
            }
        };

        if self.frames.len() >= self.safe_option.max_call_depth {
            return Err(LuaError::StackOverflow);
        }

        match &*closure {
            LuaClosure::Lua { chunk, .. } => {
                let chunk = chunk.clone();
                self.call_lua_closure(nargs, nresults, closure, chunk)
            }
            LuaClosure::Native { func, .. } => {
                let func = *func;
                self.call_rust_closure(nargs, nresults, closure, func)
            }
        }
    }

    fn call_lua_closure(
        &mut self,
        nargs: usize,
        nresults: i32,
        closure: FunctionRef,
        chunk: Rc<Chunk>,
    ) -> LuaResult<()> {
        let nregs = chunk.max_stack_size as usize;
        let nparams = chunk.num_params as usize;

        let mut frame = LuaCallFrame::new(nregs.max(nparams) + LUA_MINSTACK, Some(closure));
        let mut args = self.frame_mut().pop_n(nargs)?;
        self.pop(1)?;
        if chunk.is_vararg && nargs > nparams {
            frame.varargs = args.split_off(nparams);
        }
        frame.push_n(args, nparams as i32)?;
        frame.top = nregs;

        self.push_frame(frame);
        let result = self.execute();
        let frame = self.pop_frame()?;
        result?;

        if nresults != 0 {
            let results = frame.slots[nregs.min(frame.top)..frame.top].to_vec();
            self.push_results(results, nresults)?;
        }
        Ok(())
    }

    fn call_rust_closure(
        &mut self,
        nargs: usize,
        nresults: i32,
        closure: FunctionRef,
        func: CFunction,
    ) -> LuaResult<()> {
        let mut frame = LuaCallFrame::new(nargs + LUA_MINSTACK, Some(closure));
        let args = self.frame_mut().pop_n(nargs)?;
        self.pop(1)?;
        frame.push_n(args, nargs as i32)?;

        self.push_frame(frame);
        let result = func(self);
        let frame = self.pop_frame()?;
        let n = result?;

        if nresults != 0 {
            let start = frame.top.saturating_sub(n);
            let results = frame.slots[start..frame.top].to_vec();
            self.push_results(results, nresults)?;
        }
        Ok(())
    }

    fn push_results(&mut self, results: Vec<LuaValue>, nresults: i32) -> LuaResult<()> {
        let count = if nresults < 0 {
            results.len()
        } else {
            nresults as usize
        };
        self.ensure_stack(count)?;
        self.frame_mut().push_n(results, nresults)
    }

    fn push_frame(&mut self, frame: LuaCallFrame) {
        self.frames.push(frame);
        trace!(depth = self.frames.len(), "push frame");
    }

    /// Pop the running frame, closing its open upvalues
    fn pop_frame(&mut self) -> LuaResult<LuaCallFrame> {
        if self.frames.len() <= 1 {
            return Err(LuaError::StackUnderflow);
        }
        let mut frame = self.frames.pop().ok_or(LuaError::StackUnderflow)?;
        frame.close_upvalues_from(0);
        trace!(depth = self.frames.len(), "pop frame");
        Ok(frame)
    }

    /// Run the current Lua frame until RETURN
    fn execute(&mut self) -> LuaResult<()> {
        loop {
            let instr = Instruction::from_u32(self.fetch()?);
            if let Some(left) = self.budget.as_mut() {
                if *left == 0 {
                    return Err(LuaError::Budget);
                }
                *left -= 1;
            }
            let op = instr.get_opcode().ok_or_else(|| {
                LuaError::Runtime(format!("unknown opcode {}", instr.opcode_bits()))
            })?;
            trace!(pc = self.pc() - 1, op = op.name(), "dispatch");
            dispatch_instruction(self, op, instr)?;
            if op == OpCode::Return {
                return Ok(());
            }
        }
    }

    /// Protected call. On a fault the call stack is unwound to its depth
    /// before the call and the callee slot is replaced by a single error value.
    /// With a non-zero `msgh` the handler at that index receives the error
    /// value and its result is used instead.
    pub fn pcall(&mut self, nargs: usize, nresults: i32, msgh: i32) -> LuaStatus {
        let depth = self.frames.len();
        let func_pos = (self.frame().top).saturating_sub(nargs + 1);
        let handler = if msgh != 0 {
            Some(self.get_value(msgh))
        } else {
            None
        };

        let err = match self.call(nargs, nresults) {
            Ok(()) => return LuaStatus::Ok,
            Err(e) => e,
        };
        debug!(error = %err, depth, "protected call caught error");

        while self.frames.len() > depth {
            if self.pop_frame().is_err() {
                break;
            }
        }
        self.unwind_to(func_pos);

        let mut status = LuaStatus::ErrRun;
        let mut payload = err.payload();
        if let Some(handler) = handler {
            match self.call_message_handler(handler, payload.clone()) {
                Ok(v) => payload = v,
                Err(e) => {
                    while self.frames.len() > depth {
                        if self.pop_frame().is_err() {
                            break;
                        }
                    }
                    payload = e.payload();
                    status = LuaStatus::ErrErr;
                }
            }
            self.unwind_to(func_pos);
        }

        let frame = self.frame_mut();
        frame.slots[func_pos] = payload;
        frame.top = func_pos + 1;
        status
    }

    fn call_message_handler(&mut self, handler: LuaValue, payload: LuaValue) -> LuaResult<LuaValue> {
        self.ensure_stack(2)?;
        self.push(handler)?;
        self.push(payload)?;
        self.call(1, 1)?;
        self.pop_value()
    }

    /// Clear the slots from `pos` upward and reset the top there
    fn unwind_to(&mut self, pos: usize) {
        let frame = self.frame_mut();
        if frame.slots.len() <= pos {
            frame.slots.resize(pos + 1, LuaValue::Nil);
        }
        let end = frame.top.max(pos);
        for slot in &mut frame.slots[pos..end] {
            *slot = LuaValue::Nil;
        }
        frame.top = pos;
    }
}
