/// Upvalue instructions
///
/// Upvalue `n` of the running closure is reached through the pseudo-index
/// `lua_upvalue_index(n + 1)`.
use crate::lua_vm::{Instruction, LuaResult, LuaVM, lua_upvalue_index};

/// GETUPVAL A B
/// R[A] := UpValue[B]
pub fn exec_getupval(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32 + 1;
    vm.copy(lua_upvalue_index(b), a)
}

/// SETUPVAL A B
/// UpValue[B] := R[A]
pub fn exec_setupval(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32 + 1;
    vm.copy(a, lua_upvalue_index(b))
}

/// GETTABUP A B C
/// R[A] := UpValue[B][RK(C)]
pub fn exec_gettabup(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32 + 1;
    vm.get_rk(instr.get_c())?;
    vm.get_table(lua_upvalue_index(b))?;
    vm.replace(a)
}

/// SETTABUP A B C
/// UpValue[A][RK(B)] := RK(C)
pub fn exec_settabup(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    vm.get_rk(instr.get_b())?;
    vm.get_rk(instr.get_c())?;
    vm.set_table(lua_upvalue_index(a))
}

/// CLOSURE A Bx
/// R[A] := closure(KPROTO[Bx])
pub fn exec_closure(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    vm.load_proto(instr.get_bx() as usize)?;
    vm.replace(a)
}
