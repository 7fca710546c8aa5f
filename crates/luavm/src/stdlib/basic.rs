// Basic library (_G global functions)
// Implements: print, type, tostring, tonumber, assert, error, pcall, xpcall,
// select, next, pairs, ipairs, getmetatable, setmetatable,
// rawget, rawset, rawequal, rawlen
use std::io::Write;

use super::{arg_error, check_any, check_integer, check_type};
use crate::lib_registry::LibraryModule;
use crate::lua_value::LuaValue;
use crate::lua_vm::{LUA_MULTRET, LuaError, LuaResult, LuaStatus, LuaType, LuaVM, TmKind};

pub fn create_basic_lib() -> LibraryModule {
    crate::lib_module!("_G", {
        "print" => lua_print,
        "type" => lua_type,
        "tostring" => lua_tostring,
        "tonumber" => lua_tonumber,
        "assert" => lua_assert,
        "error" => lua_error,
        "pcall" => lua_pcall,
        "xpcall" => lua_xpcall,
        "select" => lua_select,
        "next" => lua_next,
        "pairs" => lua_pairs,
        "ipairs" => lua_ipairs,
        "getmetatable" => lua_getmetatable,
        "setmetatable" => lua_setmetatable,
        "rawget" => lua_rawget,
        "rawset" => lua_rawset,
        "rawequal" => lua_rawequal,
        "rawlen" => lua_rawlen,
    })
    .with_value("_VERSION", |_| LuaValue::string("Lua 5.3"))
}

/// print(...) - Print values to stdout, tab separated
fn lua_print(vm: &mut LuaVM) -> LuaResult<usize> {
    let n = vm.get_top();
    let mut line = Vec::new();
    for i in 1..=n {
        if i > 1 {
            line.push(b'\t');
        }
        line.extend_from_slice(&vm.to_display_string(i)?);
    }
    line.push(b'\n');

    let mut out = std::io::stdout().lock();
    out.write_all(&line)
        .and_then(|_| out.flush())
        .map_err(|e| LuaError::Runtime(format!("print: {}", e)))?;
    Ok(0)
}

/// type(v) - Name of the type of a value
fn lua_type(vm: &mut LuaVM) -> LuaResult<usize> {
    check_any(vm, 1, "type")?;
    let name = vm.type_name_of(1);
    vm.push_string(name)?;
    Ok(1)
}

/// tostring(v) - Convert a value to a string, honouring __tostring
fn lua_tostring(vm: &mut LuaVM) -> LuaResult<usize> {
    check_any(vm, 1, "tostring")?;
    let s = vm.to_display_string(1)?;
    vm.push(LuaValue::String(s))?;
    Ok(1)
}

/// tonumber(e [, base]) - Convert to a number, nil on failure
fn lua_tonumber(vm: &mut LuaVM) -> LuaResult<usize> {
    if vm.is_none_or_nil(2) {
        check_any(vm, 1, "tonumber")?;
        match vm.type_of(1) {
            LuaType::Number => {
                vm.set_top(1)?;
                return Ok(1);
            }
            LuaType::String => {
                let s = vm.to_string(1)?;
                if vm.string_to_number(&s) {
                    return Ok(1);
                }
            }
            _ => {}
        }
        vm.push_nil()?;
        return Ok(1);
    }

    let base = check_integer(vm, 2, "tonumber")?;
    check_type(vm, 1, "tonumber", LuaType::String)?;
    if !(2..=36).contains(&base) {
        return Err(arg_error(2, "tonumber", "base out of range"));
    }
    let s = vm.to_string(1)?;
    match parse_with_base(&s, base as u32) {
        Some(n) => vm.push_integer(n)?,
        None => vm.push_nil()?,
    }
    Ok(1)
}

/// Integer numeral in `base`; overflow wraps around
fn parse_with_base(s: &str, base: u32) -> Option<i64> {
    let s = s.trim_matches(|c: char| c.is_ascii_whitespace());
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if digits.is_empty() {
        return None;
    }
    let mut n: i64 = 0;
    for c in digits.chars() {
        let d = c.to_digit(base)?;
        n = n.wrapping_mul(base as i64).wrapping_add(d as i64);
    }
    Some(if neg { n.wrapping_neg() } else { n })
}

/// assert(v [, message]) - Raise an error if v is false or nil; return all arguments otherwise
fn lua_assert(vm: &mut LuaVM) -> LuaResult<usize> {
    check_any(vm, 1, "assert")?;
    if vm.to_boolean(1) {
        return Ok(vm.get_top() as usize);
    }
    if vm.is_none(2) {
        return Err(LuaError::Runtime("assertion failed!".to_string()));
    }
    vm.set_top(2)?;
    Err(vm.error())
}

/// error(message [, level]) - Raise an error with any value as payload.
/// String messages get position information for `level` (default 1).
fn lua_error(vm: &mut LuaVM) -> LuaResult<usize> {
    let level = if vm.is_none_or_nil(2) {
        1
    } else {
        check_integer(vm, 2, "error")?
    };
    vm.set_top(1)?;
    if level > 0 && vm.type_of(1) == LuaType::String {
        let position = vm.location(level as usize);
        if !position.is_empty() {
            vm.push_string(&position)?;
            vm.insert(1)?;
            vm.concat(2)?;
        }
    }
    Err(vm.error())
}

/// pcall(f, ...) - Call f in protected mode: true plus its results, or false plus the error
fn lua_pcall(vm: &mut LuaVM) -> LuaResult<usize> {
    check_any(vm, 1, "pcall")?;
    let nargs = (vm.get_top() - 1) as usize;
    let status = vm.pcall(nargs, LUA_MULTRET, 0);
    vm.ensure_stack(1)?;
    vm.push_boolean(status == LuaStatus::Ok)?;
    vm.insert(1)?;
    Ok(vm.get_top() as usize)
}

/// xpcall(f, msgh, ...) - pcall with a message handler applied to the error
fn lua_xpcall(vm: &mut LuaVM) -> LuaResult<usize> {
    check_type(vm, 2, "xpcall", LuaType::Function)?;
    // move the handler below the function: msgh, f, args...
    vm.push_value(2)?;
    vm.remove(2)?;
    vm.insert(1)?;
    let nargs = (vm.get_top() - 2) as usize;
    let status = vm.pcall(nargs, LUA_MULTRET, 1);
    vm.ensure_stack(1)?;
    vm.push_boolean(status == LuaStatus::Ok)?;
    vm.replace(1)?;
    Ok(vm.get_top() as usize)
}

/// select(n, ...) - Arguments after the n-th, or their count for '#'
fn lua_select(vm: &mut LuaVM) -> LuaResult<usize> {
    let n = vm.get_top() as i64;
    if vm.type_of(1) == LuaType::String && vm.to_string(1)? == "#" {
        vm.push_integer(n - 1)?;
        return Ok(1);
    }
    let mut i = check_integer(vm, 1, "select")?;
    if i < 0 {
        i += n;
    } else if i > n {
        i = n;
    }
    if i < 1 {
        return Err(arg_error(1, "select", "index out of range"));
    }
    Ok((n - i) as usize)
}

/// next(table [, key]) - Next key/value pair of a traversal, nil at the end
fn lua_next(vm: &mut LuaVM) -> LuaResult<usize> {
    check_type(vm, 1, "next", LuaType::Table)?;
    vm.set_top(2)?;
    if vm.next(1)? {
        Ok(2)
    } else {
        vm.push_nil()?;
        Ok(1)
    }
}

/// pairs(t) - next, t, nil; or the results of __pairs(t)
fn lua_pairs(vm: &mut LuaVM) -> LuaResult<usize> {
    check_any(vm, 1, "pairs")?;
    let t = vm.get_value(1);
    let mm = vm.get_metafield(&t, TmKind::Pairs);
    vm.ensure_stack(3)?;
    if mm.is_nil() {
        vm.push_rust_function(lua_next)?;
        vm.push(t)?;
        vm.push_nil()?;
    } else {
        vm.push(mm)?;
        vm.push(t)?;
        vm.call(1, 3)?;
    }
    Ok(3)
}

/// ipairs(t) - Iterator over t[1], t[2], ... up to the first nil
fn lua_ipairs(vm: &mut LuaVM) -> LuaResult<usize> {
    check_any(vm, 1, "ipairs")?;
    vm.ensure_stack(3)?;
    vm.push_rust_function(ipairs_aux)?;
    vm.push_value(1)?;
    vm.push_integer(0)?;
    Ok(3)
}

fn ipairs_aux(vm: &mut LuaVM) -> LuaResult<usize> {
    let i = vm.to_integer(2).wrapping_add(1);
    vm.push_integer(i)?;
    if vm.get_i(1, i)? == LuaType::Nil {
        Ok(1)
    } else {
        Ok(2)
    }
}

/// getmetatable(obj) - The metatable, or its __metatable field when set
fn lua_getmetatable(vm: &mut LuaVM) -> LuaResult<usize> {
    check_any(vm, 1, "getmetatable")?;
    let val = vm.get_value(1);
    match vm.metatable_of(&val) {
        None => vm.push_nil()?,
        Some(mt) => {
            let protected = mt.borrow().get_str(TmKind::Metatable.name());
            if protected.is_nil() {
                vm.push(LuaValue::Table(mt))?;
            } else {
                vm.push(protected)?;
            }
        }
    }
    Ok(1)
}

/// setmetatable(table, metatable) - Set or clear (nil) the metatable of a table
fn lua_setmetatable(vm: &mut LuaVM) -> LuaResult<usize> {
    check_type(vm, 1, "setmetatable", LuaType::Table)?;
    if !matches!(vm.type_of(2), LuaType::Nil | LuaType::Table) {
        return Err(arg_error(2, "setmetatable", "nil or table expected"));
    }
    let t = vm.get_value(1);
    if !vm.get_metafield(&t, TmKind::Metatable).is_nil() {
        return Err(LuaError::Runtime(
            "cannot change a protected metatable".to_string(),
        ));
    }
    vm.set_top(2)?;
    vm.set_metatable(1)?;
    Ok(1)
}

/// rawget(table, key) - t[key] without metamethods
fn lua_rawget(vm: &mut LuaVM) -> LuaResult<usize> {
    check_type(vm, 1, "rawget", LuaType::Table)?;
    check_any(vm, 2, "rawget")?;
    vm.set_top(2)?;
    vm.raw_get(1)?;
    Ok(1)
}

/// rawset(table, key, value) - t[key] = value without metamethods; returns the table
fn lua_rawset(vm: &mut LuaVM) -> LuaResult<usize> {
    check_type(vm, 1, "rawset", LuaType::Table)?;
    check_any(vm, 2, "rawset")?;
    check_any(vm, 3, "rawset")?;
    vm.set_top(3)?;
    vm.raw_set(1)?;
    Ok(1)
}

/// rawequal(a, b) - Primitive equality
fn lua_rawequal(vm: &mut LuaVM) -> LuaResult<usize> {
    check_any(vm, 1, "rawequal")?;
    check_any(vm, 2, "rawequal")?;
    let eq = vm.raw_equal(1, 2);
    vm.push_boolean(eq)?;
    Ok(1)
}

/// rawlen(v) - Length of a table or string without metamethods
fn lua_rawlen(vm: &mut LuaVM) -> LuaResult<usize> {
    if !matches!(vm.type_of(1), LuaType::Table | LuaType::String) {
        return Err(arg_error(1, "rawlen", "table or string expected"));
    }
    let n = vm.raw_len(1) as i64;
    vm.push_integer(n)?;
    Ok(1)
}
