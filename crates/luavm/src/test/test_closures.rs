// Closures and upvalue sharing
use std::rc::Rc;

use super::*;
use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaVM, OpCode};

#[test]
fn test_counter_survives_its_frame() {
    // local function make()
    //   local n = 0
    //   return function() n = n + 1; return n end
    // end
    // local c = make(); c(); c(); return c()
    let inner = Chunk {
        upvalues: vec![from_register(0)],
        ..function(
            0,
            2,
            vec![
                abc(OpCode::GetUpval, 0, 0, 0),
                abc(OpCode::Add, 0, 0, k(0)),
                abc(OpCode::SetUpval, 0, 0, 0),
                abc(OpCode::GetUpval, 0, 0, 0),
                abc(OpCode::Return, 0, 2, 0),
                abc(OpCode::Return, 0, 1, 0),
            ],
            vec![LuaValue::Integer(1)],
        )
    };
    let make = Chunk {
        protos: vec![Rc::new(inner)],
        ..function(
            0,
            2,
            vec![
                abx(OpCode::LoadK, 0, 0),
                abx(OpCode::Closure, 1, 0),
                abc(OpCode::Return, 1, 2, 0),
                abc(OpCode::Return, 0, 1, 0),
            ],
            vec![LuaValue::Integer(0)],
        )
    };
    let main = Chunk {
        protos: vec![Rc::new(make)],
        ..main_chunk(
            3,
            vec![
                abx(OpCode::Closure, 0, 0),
                abc(OpCode::Move, 1, 0, 0),
                abc(OpCode::Call, 1, 1, 2),
                abc(OpCode::Move, 2, 1, 0),
                abc(OpCode::Call, 2, 1, 1),
                abc(OpCode::Move, 2, 1, 0),
                abc(OpCode::Call, 2, 1, 1),
                abc(OpCode::Move, 2, 1, 0),
                abc(OpCode::Call, 2, 1, 0),
                abc(OpCode::Return, 2, 0, 0),
            ],
            vec![],
        )
    };

    let mut vm = LuaVM::new();
    run(&mut vm, main).unwrap();
    assert_eq!(vm.get_top(), 1);
    assert_eq!(vm.to_integer(1), 3);
}

#[test]
fn test_open_upvalue_aliases_register() {
    // local x = 1
    // local function set() x = 5 end
    // set(); return x
    let set = Chunk {
        upvalues: vec![from_register(0)],
        ..function(
            0,
            1,
            vec![
                abx(OpCode::LoadK, 0, 0),
                abc(OpCode::SetUpval, 0, 0, 0),
                abc(OpCode::Return, 0, 1, 0),
            ],
            vec![LuaValue::Integer(5)],
        )
    };
    let main = Chunk {
        protos: vec![Rc::new(set)],
        ..main_chunk(
            2,
            vec![
                abx(OpCode::LoadK, 0, 0),
                abx(OpCode::Closure, 1, 0),
                abc(OpCode::Call, 1, 1, 1),
                abc(OpCode::Return, 0, 2, 0),
            ],
            vec![LuaValue::Integer(1)],
        )
    };

    let mut vm = LuaVM::new();
    run(&mut vm, main).unwrap();
    assert_eq!(vm.to_integer(-1), 5);
}

#[test]
fn test_sibling_closures_share_a_cell() {
    // local function mk()
    //   local v = 10
    //   return function() return v end, function(x) v = x end
    // end
    // local get, set = mk(); set(20); return get()
    let get = Chunk {
        upvalues: vec![from_register(0)],
        ..function(
            0,
            1,
            vec![
                abc(OpCode::GetUpval, 0, 0, 0),
                abc(OpCode::Return, 0, 2, 0),
            ],
            vec![],
        )
    };
    let set = Chunk {
        upvalues: vec![from_register(0)],
        ..function(
            1,
            1,
            vec![
                abc(OpCode::SetUpval, 0, 0, 0),
                abc(OpCode::Return, 0, 1, 0),
            ],
            vec![],
        )
    };
    let mk = Chunk {
        protos: vec![Rc::new(get), Rc::new(set)],
        ..function(
            0,
            3,
            vec![
                abx(OpCode::LoadK, 0, 0),
                abx(OpCode::Closure, 1, 0),
                abx(OpCode::Closure, 2, 1),
                abc(OpCode::Return, 1, 3, 0),
                abc(OpCode::Return, 0, 1, 0),
            ],
            vec![LuaValue::Integer(10)],
        )
    };
    let main = Chunk {
        protos: vec![Rc::new(mk)],
        ..main_chunk(
            4,
            vec![
                abx(OpCode::Closure, 0, 0),
                abc(OpCode::Call, 0, 1, 3),
                abc(OpCode::Move, 2, 1, 0),
                abx(OpCode::LoadK, 3, 0),
                abc(OpCode::Call, 2, 2, 1),
                abc(OpCode::Move, 2, 0, 0),
                abc(OpCode::Call, 2, 1, 2),
                abc(OpCode::Return, 2, 2, 0),
                abc(OpCode::Return, 0, 1, 0),
            ],
            vec![LuaValue::Integer(20)],
        )
    };

    let mut vm = LuaVM::new();
    run(&mut vm, main).unwrap();
    assert_eq!(vm.get_top(), 1);
    assert_eq!(vm.to_integer(1), 20);
}

#[test]
fn test_chunk_env_is_globals() {
    // x = 7; return x
    let main = main_chunk(
        1,
        vec![
            abc(OpCode::SetTabUp, 0, k(0), k(1)),
            abc(OpCode::GetTabUp, 0, 0, k(0)),
            abc(OpCode::Return, 0, 2, 0),
        ],
        vec![LuaValue::string("x"), LuaValue::Integer(7)],
    );
    let mut vm = LuaVM::new();
    run(&mut vm, main).unwrap();
    assert_eq!(vm.to_integer(-1), 7);
    vm.get_global("x").unwrap();
    assert_eq!(vm.to_integer(-1), 7);
}

/// local f; do local x = 1; f = function() return x end end
/// local y = 99  -- reuses x's register
/// return f()
/// `close_block` picks whether the JMP leaving the block closes R0
fn capture_then_overwrite(close_block: bool) -> Chunk {
    let getter = Chunk {
        upvalues: vec![from_register(0)],
        ..function(
            0,
            1,
            vec![
                abc(OpCode::GetUpval, 0, 0, 0),
                abc(OpCode::Return, 0, 2, 0),
            ],
            vec![],
        )
    };
    let close = if close_block { 1 } else { 0 };
    Chunk {
        protos: vec![Rc::new(getter)],
        ..main_chunk(
            3,
            vec![
                abx(OpCode::LoadK, 0, 0),
                abx(OpCode::Closure, 1, 0),
                asbx(OpCode::Jmp, close, 0),
                abx(OpCode::LoadK, 0, 1),
                abc(OpCode::Move, 2, 1, 0),
                abc(OpCode::Call, 2, 1, 2),
                abc(OpCode::Return, 2, 2, 0),
            ],
            vec![LuaValue::Integer(1), LuaValue::Integer(99)],
        )
    }
}

#[test]
fn test_jmp_closes_upvalues() {
    let mut vm = LuaVM::new();
    run(&mut vm, capture_then_overwrite(true)).unwrap();
    assert_eq!(vm.to_integer(-1), 1);

    // without the close the cell still aliases the register
    let mut vm = LuaVM::new();
    run(&mut vm, capture_then_overwrite(false)).unwrap();
    assert_eq!(vm.to_integer(-1), 99);
}
