// Call protocol: argument and result adjustment, varargs, host functions
use std::rc::Rc;

use super::*;
use crate::lua_value::LuaValue;
use crate::lua_vm::{LUA_MULTRET, LuaError, LuaResult, LuaVM, OpCode, SafeOption};

fn double(vm: &mut LuaVM) -> LuaResult<usize> {
    let n = vm.to_integer(1);
    vm.push_integer(n * 2)?;
    Ok(1)
}

fn count_args(vm: &mut LuaVM) -> LuaResult<usize> {
    let n = vm.get_top() as i64;
    vm.push_integer(n)?;
    Ok(1)
}

#[test]
fn test_fixed_params_are_nil_padded() {
    // function(a, b) return a, b end
    let f = function(2, 2, vec![abc(OpCode::Return, 0, 3, 0)], vec![]);
    let mut vm = LuaVM::new();
    vm.load(Rc::new(f)).unwrap();
    let f = vm.pop_value().unwrap();

    vm.push(f.clone()).unwrap();
    vm.push_integer(1).unwrap();
    vm.call(1, 2).unwrap();
    assert_eq!(vm.get_top(), 2);
    assert_eq!(vm.to_integer(1), 1);
    assert!(vm.is_nil(2));
    vm.set_top(0).unwrap();

    // extra arguments of a non-variadic function are dropped
    vm.push(f).unwrap();
    for i in 1..=3 {
        vm.push_integer(i).unwrap();
    }
    vm.call(3, LUA_MULTRET).unwrap();
    assert_eq!(vm.get_top(), 2);
    assert_eq!(vm.to_integer(2), 2);
}

#[test]
fn test_missing_results_are_nil() {
    let f = function(0, 0, vec![abc(OpCode::Return, 0, 1, 0)], vec![]);
    let mut vm = LuaVM::new();
    vm.load(Rc::new(f)).unwrap();
    vm.call(0, 2).unwrap();
    assert_eq!(vm.get_top(), 2);
    assert!(vm.is_nil(1));
    assert!(vm.is_nil(2));
}

#[test]
fn test_vararg_count() {
    // return select('#', ...)
    let chunk = main_chunk(
        3,
        vec![
            abc(OpCode::GetTabUp, 0, 0, k(0)),
            abx(OpCode::LoadK, 1, 1),
            abc(OpCode::Vararg, 2, 0, 0),
            abc(OpCode::Call, 0, 0, 0),
            abc(OpCode::Return, 0, 0, 0),
        ],
        vec![LuaValue::string("select"), LuaValue::string("#")],
    );
    let chunk = Rc::new(chunk);
    let mut vm = new_vm();

    vm.load(chunk.clone()).unwrap();
    for i in 1..=3 {
        vm.push_integer(i * 10).unwrap();
    }
    vm.call(3, 1).unwrap();
    assert_eq!(vm.to_integer(-1), 3);

    vm.load(chunk).unwrap();
    vm.call(0, 1).unwrap();
    assert_eq!(vm.to_integer(-1), 0);
}

#[test]
fn test_host_function_from_lua() {
    // return double(21)
    let chunk = main_chunk(
        2,
        vec![
            abc(OpCode::GetTabUp, 0, 0, k(0)),
            abx(OpCode::LoadK, 1, 1),
            abc(OpCode::Call, 0, 2, 2),
            abc(OpCode::Return, 0, 2, 0),
        ],
        vec![LuaValue::string("double"), LuaValue::Integer(21)],
    );
    let mut vm = LuaVM::new();
    vm.register("double", double).unwrap();
    run(&mut vm, chunk).unwrap();
    assert_eq!(vm.get_top(), 1);
    assert_eq!(vm.to_integer(1), 42);
}

#[test]
fn test_tail_call_keeps_all_results() {
    // return double(4)
    let chunk = main_chunk(
        2,
        vec![
            abc(OpCode::GetTabUp, 0, 0, k(0)),
            abx(OpCode::LoadK, 1, 1),
            abc(OpCode::TailCall, 0, 2, 0),
            abc(OpCode::Return, 0, 0, 0),
        ],
        vec![LuaValue::string("double"), LuaValue::Integer(4)],
    );
    let mut vm = LuaVM::new();
    vm.register("double", double).unwrap();
    run(&mut vm, chunk).unwrap();
    assert_eq!(vm.get_top(), 1);
    assert_eq!(vm.to_integer(1), 8);
    assert_eq!(vm.call_depth(), 1);
}

#[test]
fn test_call_non_function() {
    let mut vm = LuaVM::new();
    vm.push_integer(3).unwrap();
    let err = vm.call(0, 0).unwrap_err();
    assert_eq!(err.to_string(), "attempt to call a number value");
}

#[test]
fn test_call_metamethod_receives_object() {
    let mut vm = LuaVM::new();
    vm.new_table().unwrap();
    vm.new_table().unwrap();
    vm.push_rust_function(count_args).unwrap();
    vm.set_field(2, "__call").unwrap();
    vm.set_metatable(1).unwrap();

    vm.push_integer(10).unwrap();
    vm.call(1, 1).unwrap();
    assert_eq!(vm.get_top(), 1);
    assert_eq!(vm.to_integer(1), 2);
}

#[test]
fn test_unbounded_recursion_overflows() {
    // function f() f() end; f()
    let f = Chunk {
        upvalues: vec![from_upvalue(0)],
        ..function(
            0,
            1,
            vec![
                abc(OpCode::GetTabUp, 0, 0, k(0)),
                abc(OpCode::Call, 0, 1, 1),
                abc(OpCode::Return, 0, 1, 0),
            ],
            vec![LuaValue::string("f")],
        )
    };
    let main = Chunk {
        protos: vec![Rc::new(f)],
        ..main_chunk(
            1,
            vec![
                abx(OpCode::Closure, 0, 0),
                abc(OpCode::SetTabUp, 0, k(0), 0),
                abc(OpCode::Call, 0, 1, 1),
                abc(OpCode::Return, 0, 1, 0),
            ],
            vec![LuaValue::string("f")],
        )
    };

    let mut vm = LuaVM::with_options(SafeOption {
        max_call_depth: 50,
        ..Default::default()
    });
    let err = run(&mut vm, main).unwrap_err();
    assert!(matches!(err, LuaError::StackOverflow));
    assert_eq!(vm.call_depth(), 1);
}

/// local function f(n) if 0 < n then return f(n - 1) + 1 end return 0 end
/// return f(n)
fn counting_recursion(n: i64) -> Chunk {
    let f = Chunk {
        upvalues: vec![from_upvalue(0)],
        ..function(
            1,
            3,
            vec![
                abc(OpCode::Lt, 0, k(0), 0),
                asbx(OpCode::Jmp, 0, 5),
                abc(OpCode::GetTabUp, 1, 0, k(1)),
                abc(OpCode::Sub, 2, 0, k(2)),
                abc(OpCode::Call, 1, 2, 2),
                abc(OpCode::Add, 1, 1, k(2)),
                abc(OpCode::Return, 1, 2, 0),
                abx(OpCode::LoadK, 1, 0),
                abc(OpCode::Return, 1, 2, 0),
            ],
            vec![LuaValue::Integer(0), LuaValue::string("f"), LuaValue::Integer(1)],
        )
    };
    Chunk {
        protos: vec![Rc::new(f)],
        ..main_chunk(
            2,
            vec![
                abx(OpCode::Closure, 0, 0),
                abc(OpCode::SetTabUp, 0, k(0), 0),
                abx(OpCode::LoadK, 1, 1),
                abc(OpCode::Call, 0, 2, 2),
                abc(OpCode::Return, 0, 2, 0),
            ],
            vec![LuaValue::string("f"), LuaValue::Integer(n)],
        )
    }
}

#[test]
fn test_deep_recursion_within_default_depth() {
    // same stack size the interpreter binary gives the VM
    let worker = std::thread::Builder::new()
        .stack_size(16 * 1024 * 1024)
        .spawn(|| {
            let mut vm = LuaVM::new();
            run(&mut vm, counting_recursion(900)).unwrap();
            assert_eq!(vm.to_integer(-1), 900);

            let mut vm = LuaVM::new();
            let err = run(&mut vm, counting_recursion(5000)).unwrap_err();
            assert!(matches!(err, LuaError::StackOverflow));
            assert_eq!(vm.call_depth(), 1);
        })
        .unwrap();
    worker.join().unwrap();
}

#[test]
fn test_instruction_budget() {
    // while true do end
    let chunk = main_chunk(1, vec![asbx(OpCode::Jmp, 0, -1)], vec![]);
    let mut vm = LuaVM::new();
    vm.set_instruction_budget(Some(1000));
    let err = run(&mut vm, chunk).unwrap_err();
    assert!(matches!(err, LuaError::Budget));
    assert_eq!(vm.call_depth(), 1);
}

#[test]
fn test_unknown_opcode() {
    let chunk = main_chunk(1, vec![63], vec![]);
    let mut vm = LuaVM::new();
    let err = run(&mut vm, chunk).unwrap_err();
    assert_eq!(err.to_string(), "unknown opcode 63");
}
