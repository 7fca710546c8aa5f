/// Arithmetic, bitwise, length and concatenation instructions
use crate::lua_vm::{ArithOp, Instruction, LuaResult, LuaVM};

/// ADD/SUB/MUL/MOD/POW/DIV/IDIV/BAND/BOR/BXOR/SHL/SHR A B C
/// R[A] := RK(B) op RK(C)
pub fn exec_binary_arith(vm: &mut LuaVM, instr: Instruction, op: ArithOp) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    vm.get_rk(instr.get_b())?;
    vm.get_rk(instr.get_c())?;
    vm.arith(op)?;
    vm.replace(a)
}

/// UNM/BNOT A B
/// R[A] := op R[B]
pub fn exec_unary_arith(vm: &mut LuaVM, instr: Instruction, op: ArithOp) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32 + 1;
    vm.push_value(b)?;
    vm.arith(op)?;
    vm.replace(a)
}

/// NOT A B
/// R[A] := not R[B]
pub fn exec_not(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32 + 1;
    let v = !vm.to_boolean(b);
    vm.push_boolean(v)?;
    vm.replace(a)
}

/// LEN A B
/// R[A] := #R[B]
pub fn exec_len(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32 + 1;
    vm.len(b)?;
    vm.replace(a)
}

/// CONCAT A B C
/// R[A] := R[B].. ... ..R[C]
pub fn exec_concat(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let b = instr.get_b() as i32 + 1;
    let c = instr.get_c() as i32 + 1;
    let n = (c - b + 1).max(0) as usize;
    vm.ensure_stack(n)?;
    for i in b..=c {
        vm.push_value(i)?;
    }
    vm.concat(n)?;
    vm.replace(a)
}
