/// Load and Move instructions
///
/// These instructions handle loading constants and moving values between registers.
use crate::lua_vm::{Instruction, LuaResult, LuaVM};

/// MOVE A B
/// R[A] := R[B]
pub fn exec_move(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32 + 1;
    vm.copy(b, a)
}

/// LOADK A Bx
/// R[A] := K[Bx]
pub fn exec_loadk(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    vm.get_const(instr.get_bx() as usize)?;
    vm.replace(a)
}

/// LOADKX A
/// R[A] := K[extra arg]
pub fn exec_loadkx(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let ax = Instruction::from_u32(vm.fetch()?).get_ax();
    vm.get_const(ax as usize)?;
    vm.replace(a)
}

/// LOADBOOL A B C
/// R[A] := (Bool)B; if (C) pc++
pub fn exec_loadbool(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    vm.push_boolean(instr.get_b() != 0)?;
    vm.replace(a)?;
    if instr.get_c() != 0 {
        vm.add_pc(1);
    }
    Ok(())
}

/// LOADNIL A B
/// R[A], R[A+1], ..., R[A+B] := nil
pub fn exec_loadnil(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32;
    vm.push_nil()?;
    for i in a..=a + b {
        vm.copy(-1, i)?;
    }
    vm.pop(1)
}
