// Standard libraries
// Host functions take their arguments at stack indices 1..=top and return
// how many values on the top of their stack are results.

pub mod basic;

use crate::lua_vm::{LuaError, LuaResult, LuaType, LuaVM};

/// "bad argument #n to 'fname' (msg)"
pub(crate) fn arg_error(n: i32, fname: &str, msg: &str) -> LuaError {
    LuaError::Runtime(format!("bad argument #{} to '{}' ({})", n, fname, msg))
}

pub(crate) fn check_any(vm: &LuaVM, n: i32, fname: &str) -> LuaResult<()> {
    if vm.is_none(n) {
        return Err(arg_error(n, fname, "value expected"));
    }
    Ok(())
}

pub(crate) fn check_type(vm: &LuaVM, n: i32, fname: &str, tp: LuaType) -> LuaResult<()> {
    let actual = vm.type_of(n);
    if actual != tp {
        return Err(arg_error(
            n,
            fname,
            &format!("{} expected, got {}", tp.name(), actual.name()),
        ));
    }
    Ok(())
}

pub(crate) fn check_integer(vm: &LuaVM, n: i32, fname: &str) -> LuaResult<i64> {
    match vm.to_integerx(n) {
        Some(i) => Ok(i),
        None if vm.is_number(n) => Err(arg_error(n, fname, "number has no integer representation")),
        None => Err(arg_error(
            n,
            fname,
            &format!("number expected, got {}", vm.type_name_of(n)),
        )),
    }
}
