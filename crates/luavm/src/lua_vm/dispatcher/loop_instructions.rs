/// Loop instructions
///
/// Numeric for loops keep (index, limit, step, user variable) in R[A]..R[A+3];
/// generic for loops keep (iterator, state, control) in R[A]..R[A+2] and
/// receive the iterator results from R[A+3].
use super::{pop_results, push_func_and_args};
use crate::lua_vm::{ArithOp, CompareOp, Instruction, LuaError, LuaResult, LuaType, LuaVM};

/// FORPREP A sBx
/// R[A] -= R[A+2]; pc += sBx
pub fn exec_forprep(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;

    const WHAT: [&str; 3] = ["initial value", "limit", "step"];
    for (i, what) in WHAT.iter().enumerate() {
        let idx = a + i as i32;
        match vm.type_of(idx) {
            LuaType::Number => {}
            LuaType::String if vm.is_number(idx) => {
                let n = vm.to_number(idx);
                vm.push_number(n)?;
                vm.replace(idx)?;
            }
            _ => {
                return Err(LuaError::Runtime(format!(
                    "'for' {} must be a number",
                    what
                )));
            }
        }
    }

    vm.push_value(a)?;
    vm.push_value(a + 2)?;
    vm.arith(ArithOp::Sub)?;
    vm.replace(a)?;
    vm.add_pc(instr.get_sbx());
    Ok(())
}

/// FORLOOP A sBx
/// R[A] += R[A+2]; if R[A] <?= R[A+1] then { pc += sBx; R[A+3] = R[A] }
pub fn exec_forloop(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;

    vm.push_value(a + 2)?;
    vm.push_value(a)?;
    vm.arith(ArithOp::Add)?;
    vm.replace(a)?;

    let positive_step = vm.to_number(a + 2) >= 0.0;
    let keep_going = if positive_step {
        vm.compare(a, a + 1, CompareOp::Le)?
    } else {
        vm.compare(a + 1, a, CompareOp::Le)?
    };
    if keep_going {
        vm.add_pc(instr.get_sbx());
        vm.copy(a, a + 3)?;
    }
    Ok(())
}

/// TFORCALL A C
/// R[A+3], ... ,R[A+2+C] := R[A](R[A+1], R[A+2])
pub fn exec_tforcall(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    let c = instr.get_c() as i32;
    push_func_and_args(vm, a, 3)?;
    vm.call(2, c)?;
    pop_results(vm, a + 3, c + 1)
}

/// TFORLOOP A sBx
/// if R[A+1] ~= nil then { R[A] = R[A+1]; pc += sBx }
pub fn exec_tforloop(vm: &mut LuaVM, instr: Instruction) -> LuaResult<()> {
    let a = instr.get_a() as i32 + 1;
    if !vm.is_nil(a + 1) {
        vm.copy(a + 1, a)?;
        vm.add_pc(instr.get_sbx());
    }
    Ok(())
}
