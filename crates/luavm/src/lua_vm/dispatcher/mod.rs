/// Instruction dispatcher module
///
/// One handler per opcode, grouped by family. Handlers are written against
/// the stack API: register `n` (0-based in the instruction) is stack index
/// `n + 1` of the running frame.
///
/// Calls with a variable number of arguments or results leave the values
/// above the register window followed by an integer marker holding the
/// stack index where the values logically begin. The next instruction that
/// consumes them (CALL, RETURN or SETLIST with a zero operand) reads and
/// pops that marker.
mod arithmetic_instructions;
mod control_instructions;
mod load_instructions;
mod loop_instructions;
mod table_instructions;
mod upvalue_instructions;

pub use arithmetic_instructions::*;
pub use control_instructions::*;
pub use load_instructions::*;
pub use loop_instructions::*;
pub use table_instructions::*;
pub use upvalue_instructions::*;

use super::{ArithOp, CompareOp, Instruction, LuaResult, LuaVM, OpCode};

/// Execute one decoded instruction
#[inline(always)]
pub(super) fn dispatch_instruction(vm: &mut LuaVM, op: OpCode, instr: Instruction) -> LuaResult<()> {
    match op {
        // Load instructions
        OpCode::Move => exec_move(vm, instr),
        OpCode::LoadK => exec_loadk(vm, instr),
        OpCode::LoadKX => exec_loadkx(vm, instr),
        OpCode::LoadBool => exec_loadbool(vm, instr),
        OpCode::LoadNil => exec_loadnil(vm, instr),

        // Upvalue instructions
        OpCode::GetUpval => exec_getupval(vm, instr),
        OpCode::SetUpval => exec_setupval(vm, instr),
        OpCode::GetTabUp => exec_gettabup(vm, instr),
        OpCode::SetTabUp => exec_settabup(vm, instr),
        OpCode::Closure => exec_closure(vm, instr),

        // Table instructions
        OpCode::GetTable => exec_gettable(vm, instr),
        OpCode::SetTable => exec_settable(vm, instr),
        OpCode::NewTable => exec_newtable(vm, instr),
        OpCode::Self_ => exec_self(vm, instr),
        OpCode::SetList => exec_setlist(vm, instr),

        // Arithmetic and bitwise instructions
        OpCode::Add => exec_binary_arith(vm, instr, ArithOp::Add),
        OpCode::Sub => exec_binary_arith(vm, instr, ArithOp::Sub),
        OpCode::Mul => exec_binary_arith(vm, instr, ArithOp::Mul),
        OpCode::Mod => exec_binary_arith(vm, instr, ArithOp::Mod),
        OpCode::Pow => exec_binary_arith(vm, instr, ArithOp::Pow),
        OpCode::Div => exec_binary_arith(vm, instr, ArithOp::Div),
        OpCode::IDiv => exec_binary_arith(vm, instr, ArithOp::IDiv),
        OpCode::BAnd => exec_binary_arith(vm, instr, ArithOp::BAnd),
        OpCode::BOr => exec_binary_arith(vm, instr, ArithOp::BOr),
        OpCode::BXor => exec_binary_arith(vm, instr, ArithOp::BXor),
        OpCode::Shl => exec_binary_arith(vm, instr, ArithOp::Shl),
        OpCode::Shr => exec_binary_arith(vm, instr, ArithOp::Shr),
        OpCode::Unm => exec_unary_arith(vm, instr, ArithOp::Unm),
        OpCode::BNot => exec_unary_arith(vm, instr, ArithOp::BNot),
        OpCode::Not => exec_not(vm, instr),
        OpCode::Len => exec_len(vm, instr),
        OpCode::Concat => exec_concat(vm, instr),

        // Comparison and control flow
        OpCode::Jmp => exec_jmp(vm, instr),
        OpCode::Eq => exec_compare(vm, instr, CompareOp::Eq),
        OpCode::Lt => exec_compare(vm, instr, CompareOp::Lt),
        OpCode::Le => exec_compare(vm, instr, CompareOp::Le),
        OpCode::Test => exec_test(vm, instr),
        OpCode::TestSet => exec_testset(vm, instr),
        OpCode::Call => exec_call(vm, instr),
        OpCode::TailCall => exec_tailcall(vm, instr),
        OpCode::Return => exec_return(vm, instr),
        OpCode::Vararg => exec_vararg(vm, instr),

        // Loops
        OpCode::ForLoop => exec_forloop(vm, instr),
        OpCode::ForPrep => exec_forprep(vm, instr),
        OpCode::TForCall => exec_tforcall(vm, instr),
        OpCode::TForLoop => exec_tforloop(vm, instr),

        // Consumed by the preceding LOADKX or SETLIST
        OpCode::ExtraArg => Ok(()),
    }
}

/// Decode a "floating point byte" (eeeeexxx) table size hint
pub fn fb2int(x: u32) -> usize {
    if x < 8 {
        x as usize
    } else {
        (((x & 7) + 8) as usize) << ((x >> 3) - 1)
    }
}

/// Push the function at stack index `a` and its arguments.
/// `b > 0` means `b - 1` fixed arguments; `b == 0` takes every value up to
/// the top (see the module docs). Returns the argument count.
pub(crate) fn push_func_and_args(vm: &mut LuaVM, a: i32, b: i32) -> LuaResult<usize> {
    if b >= 1 {
        vm.ensure_stack(b as usize)?;
        for i in a..a + b {
            vm.push_value(i)?;
        }
        Ok((b - 1) as usize)
    } else {
        fix_stack(vm, a)?;
        Ok((vm.get_top() - vm.register_count() - 1) as usize)
    }
}

/// Move the results of a call into registers starting at stack index `a`.
/// `c == 0` keeps them on the stack and pushes the marker.
pub(crate) fn pop_results(vm: &mut LuaVM, a: i32, c: i32) -> LuaResult<()> {
    if c == 1 {
        // no results
    } else if c > 1 {
        for i in (a..=a + c - 2).rev() {
            vm.replace(i)?;
        }
    } else {
        vm.ensure_stack(1)?;
        vm.push_integer(a as i64)?;
    }
    Ok(())
}

/// Consume the marker: copy registers `a..marker` above the register window
/// and rotate them below the pending values so the whole run is contiguous
pub(crate) fn fix_stack(vm: &mut LuaVM, a: i32) -> LuaResult<()> {
    let x = vm.to_integer(-1) as i32;
    vm.pop(1)?;
    let n = (x - a).max(0);
    vm.ensure_stack(n as usize)?;
    for i in a..x {
        vm.push_value(i)?;
    }
    if n == 0 {
        return Ok(());
    }
    let start = vm.register_count() + 1;
    vm.rotate(start, n)
}
