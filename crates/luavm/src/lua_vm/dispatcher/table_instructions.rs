/// Table instructions
use super::fb2int;
use crate::lua_vm::{Instruction, LFIELDS_PER_FLUSH, LuaResult, LuaVM};

/// GETTABLE A B C
/// R[A] := R[B][RK(C)]
pub fn exec_gettable(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32 + 1;
    vm.get_rk(instr.get_c())?;
    vm.get_table(b)?;
    vm.replace(a)
}

/// SETTABLE A B C
/// R[A][RK(B)] := RK(C)
pub fn exec_settable(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    vm.get_rk(instr.get_b())?;
    vm.get_rk(instr.get_c())?;
    vm.set_table(a)
}

/// NEWTABLE A B C
/// R[A] := {} with B array slots and C hash slots (floating byte encoded)
pub fn exec_newtable(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    vm.create_table(fb2int(instr.get_b()), fb2int(instr.get_c()))?;
    vm.replace(a)
}

/// SELF A B C
/// R[A+1] := R[B]; R[A] := R[B][RK(C)]
pub fn exec_self(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32 + 1;
    vm.copy(b, a + 1)?;
    vm.get_rk(instr.get_c())?;
    vm.get_table(b)?;
    vm.replace(a)
}

/// SETLIST A B C
/// R[A][(C-1)*FPF+i] := R[A+i], 1 <= i <= B
///
/// C == 0 takes the (1-based) batch number from the following EXTRAARG; B == 0 also
/// stores every pending value left by a preceding multi-result call.
pub fn exec_setlist(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let mut b = instr.get_b() as i32;
    let batch = match instr.get_c() {
        0 => Instruction::from_u32(vm.fetch()?).get_ax() as i64,
        c => c as i64,
    };
    let c = batch - 1;

    let multi = b == 0;
    if multi {
        b = vm.to_integer(-1) as i32 - a - 1;
        vm.pop(1)?;
    }

    vm.ensure_stack(1)?;
    let mut idx = c * LFIELDS_PER_FLUSH;
    for j in 1..=b {
        idx += 1;
        vm.push_value(a + j)?;
        vm.raw_seti(a, idx)?;
    }

    if multi {
        let nregs = vm.register_count();
        for j in nregs + 1..=vm.get_top() {
            idx += 1;
            vm.push_value(j)?;
            vm.raw_seti(a, idx)?;
        }
        vm.set_top(nregs)?;
    }
    Ok(())
}
