// Test module organization
//
// There is no compiler in this crate, so scenario tests assemble prototypes
// by hand with the helpers below. Comments next to each program give the
// Lua source it corresponds to.
pub mod test_arith;
pub mod test_binchunk;
pub mod test_calls;
pub mod test_closures;
pub mod test_table;

use std::rc::Rc;

use crate::binchunk::{Chunk, UpvalueDesc};
use crate::lua_value::LuaValue;
use crate::lua_vm::{Instruction, LUA_MULTRET, LuaResult, LuaVM, OpCode};

pub fn abc(op: OpCode, a: u32, b: u32, c: u32) -> u32 {
    Instruction::create_abc(op, a, b, c).as_u32()
}

pub fn abx(op: OpCode, a: u32, bx: u32) -> u32 {
    Instruction::create_abx(op, a, bx).as_u32()
}

pub fn asbx(op: OpCode, a: u32, sbx: i32) -> u32 {
    Instruction::create_asbx(op, a, sbx).as_u32()
}

pub fn ax(op: OpCode, ax: u32) -> u32 {
    Instruction::create_ax(op, ax).as_u32()
}

/// RK operand for constant `idx`
pub fn k(idx: u32) -> u32 {
    Instruction::rk_const(idx)
}

/// A main chunk: variadic, `_ENV` as its only upvalue
pub fn main_chunk(max_stack: u8, code: Vec<u32>, constants: Vec<LuaValue>) -> Chunk {
    Chunk {
        source: "=test".to_string(),
        is_vararg: true,
        max_stack_size: max_stack,
        code,
        constants,
        upvalues: vec![UpvalueDesc { instack: true, idx: 0 }],
        ..Default::default()
    }
}

/// A nested function prototype
pub fn function(num_params: u8, max_stack: u8, code: Vec<u32>, constants: Vec<LuaValue>) -> Chunk {
    Chunk {
        source: "=test".to_string(),
        num_params,
        max_stack_size: max_stack,
        code,
        constants,
        ..Default::default()
    }
}

/// Upvalue captured from register `idx` of the enclosing function
pub fn from_register(idx: u8) -> UpvalueDesc {
    UpvalueDesc { instack: true, idx }
}

/// Upvalue inherited from upvalue `idx` of the enclosing closure
pub fn from_upvalue(idx: u8) -> UpvalueDesc {
    UpvalueDesc { instack: false, idx }
}

pub fn new_vm() -> LuaVM {
    let mut vm = LuaVM::new();
    vm.open_libs().unwrap();
    vm
}

/// Load `chunk` and call it with no arguments, keeping every result
pub fn run(vm: &mut LuaVM, chunk: Chunk) -> LuaResult<()> {
    vm.load(Rc::new(chunk))?;
    vm.call(0, LUA_MULTRET)
}
