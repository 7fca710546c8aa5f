/// Control flow instructions
///
/// Jumps, conditional skips and the call protocol (CALL, TAILCALL, RETURN,
/// VARARG).
use super::{fix_stack, pop_results, push_func_and_args};
use crate::lua_vm::{CompareOp, Instruction, LUA_MULTRET, LuaResult, LuaVM};

/// JMP A sBx
/// pc += sBx; if (A) close all upvalues >= R[A-1]
pub fn exec_jmp(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    vm.add_pc(instr.get_sbx());
    let a = instr.get_a() as i32;
    if a != 0 {
        vm.close_upvalues(a);
    }
    Ok(())
}

/// EQ/LT/LE A B C
/// if ((RK(B) op RK(C)) ~= A) then pc++
pub fn exec_compare(vm: &mut LuaVM, instr: Instruction, op: CompareOp) -> LuaResult<()> {
    let expected = instr.get_a() != 0;
    vm.get_rk(instr.get_b())?;
    vm.get_rk(instr.get_c())?;
    if vm.compare(-2, -1, op)? != expected {
        vm.add_pc(1);
    }
    vm.pop(2)
}

/// TEST A C
/// if not (R[A] <=> C) then pc++
pub fn exec_test(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    if vm.to_boolean(a) != (instr.get_c() != 0) {
        vm.add_pc(1);
    }
    Ok(())
}

/// TESTSET A B C
/// if (R[B] <=> C) then R[A] := R[B] else pc++
pub fn exec_testset(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32 + 1;
    if vm.to_boolean(b) == (instr.get_c() != 0) {
        vm.copy(b, a)
    } else {
        vm.add_pc(1);
        Ok(())
    }
}

/// CALL A B C
/// R[A], ... ,R[A+C-2] := R[A](R[A+1], ... ,R[A+B-1])
pub fn exec_call(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32;
    let c = instr.get_c() as i32;
    let nargs = push_func_and_args(vm, a, b)?;
    vm.call(nargs, c - 1)?;
    pop_results(vm, a, c)
}

/// TAILCALL A B
/// return R[A](R[A+1], ... ,R[A+B-1])
///
/// Runs as an ordinary call; every result is kept for the RETURN that follows.
pub fn exec_tailcall(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32;
    let nargs = push_func_and_args(vm, a, b)?;
    vm.call(nargs, LUA_MULTRET)?;
    pop_results(vm, a, 0)
}

/// RETURN A B
/// return R[A], ... ,R[A+B-2]
pub fn exec_return(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32;
    if b == 1 {
        // no return values
    } else if b > 1 {
        vm.ensure_stack((b - 1) as usize)?;
        for i in a..=a + b - 2 {
            vm.push_value(i)?;
        }
    } else {
        fix_stack(vm, a)?;
    }
    Ok(())
}

/// VARARG A B
/// R[A], R[A+1], ..., R[A+B-2] = vararg
pub fn exec_vararg(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32;
    if b != 1 {
        vm.load_vararg(b - 1)?;
        pop_results(vm, a, b)?;
    }
    Ok(())
}
