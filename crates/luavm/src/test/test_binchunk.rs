// Precompiled chunk reading and writing
use std::rc::Rc;

use super::*;
use crate::binchunk::{LocVar, dump, is_binary_chunk, undump};
use crate::lua_value::LuaValue;
use crate::lua_vm::{LUA_MULTRET, LuaError, LuaVM, OpCode};

fn sample() -> Chunk {
    let inner = Chunk {
        upvalues: vec![from_register(0), from_upvalue(0)],
        line_defined: 2,
        last_line_defined: 4,
        line_info: vec![3, 4],
        upvalue_names: vec!["n".to_string(), "_ENV".to_string()],
        ..function(
            1,
            2,
            vec![abc(OpCode::GetUpval, 1, 0, 0), abc(OpCode::Return, 1, 2, 0)],
            vec![LuaValue::Float(0.5), LuaValue::string(&"long ".repeat(20))],
        )
    };
    Chunk {
        source: "@sample.lua".to_string(),
        protos: vec![Rc::new(inner)],
        line_info: vec![1, 2, 5],
        loc_vars: vec![LocVar {
            name: "n".to_string(),
            start_pc: 1,
            end_pc: 3,
        }],
        upvalue_names: vec!["_ENV".to_string()],
        ..main_chunk(
            2,
            vec![
                abx(OpCode::LoadK, 0, 0),
                abx(OpCode::Closure, 1, 0),
                abc(OpCode::Return, 0, 1, 0),
            ],
            vec![
                LuaValue::Nil,
                LuaValue::Boolean(true),
                LuaValue::Integer(-42),
                LuaValue::Float(2.5),
                LuaValue::string("short"),
            ],
        )
    }
}

fn load_error(data: &[u8]) -> String {
    match undump(data) {
        Err(LuaError::Load(msg)) => msg,
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("undump accepted malformed input"),
    }
}

#[test]
fn test_dump_undump_preserves_prototypes() {
    let chunk = sample();
    let bytes = dump(&chunk, false);
    assert!(is_binary_chunk(&bytes));

    let loaded = undump(&bytes).unwrap();
    assert_eq!(loaded.source, "@sample.lua");
    assert!(loaded.is_vararg);
    assert_eq!(loaded.max_stack_size, 2);
    assert_eq!(loaded.code, chunk.code);
    assert_eq!(loaded.constants, chunk.constants);
    assert_eq!(loaded.upvalues, chunk.upvalues);
    assert_eq!(loaded.line_info, chunk.line_info);
    assert_eq!(loaded.loc_vars, chunk.loc_vars);
    assert_eq!(loaded.upvalue_names, chunk.upvalue_names);

    let inner = &loaded.protos[0];
    // nested prototypes inherit the source of their parent
    assert_eq!(inner.source, "@sample.lua");
    assert_eq!(inner.num_params, 1);
    assert_eq!((inner.line_defined, inner.last_line_defined), (2, 4));
    assert_eq!(inner.constants, chunk.protos[0].constants);
    assert_eq!(inner.upvalues, chunk.protos[0].upvalues);
    assert_eq!(inner.upvalue_names, chunk.protos[0].upvalue_names);
}

#[test]
fn test_strip_drops_debug_info() {
    let chunk = sample();
    let full = dump(&chunk, false);
    let stripped = dump(&chunk, true);
    assert!(stripped.len() < full.len());

    let loaded = undump(&stripped).unwrap();
    assert_eq!(loaded.source, "");
    assert!(loaded.line_info.is_empty());
    assert!(loaded.loc_vars.is_empty());
    assert!(loaded.protos[0].upvalue_names.is_empty());
    assert_eq!(loaded.code, chunk.code);
}

#[test]
fn test_header_checks() {
    assert_eq!(load_error(b"print('hi')"), "not a precompiled chunk");

    let mut bytes = dump(&sample(), false);
    bytes[4] = 0x52;
    assert_eq!(load_error(&bytes), "version mismatch");

    let mut bytes = dump(&sample(), false);
    bytes[12] = 8;
    assert_eq!(load_error(&bytes), "int size mismatch");
}

#[test]
fn test_truncated_input() {
    let bytes = dump(&sample(), false);
    assert_eq!(load_error(&bytes[..3]), "truncated precompiled chunk");
    assert_eq!(load_error(&bytes[..bytes.len() - 1]), "truncated precompiled chunk");
    assert_eq!(load_error(&bytes[..40]), "truncated precompiled chunk");
}

#[test]
fn test_load_binary_and_run() {
    // return 6 * 7
    let chunk = main_chunk(
        1,
        vec![
            abc(OpCode::Mul, 0, k(0), k(1)),
            abc(OpCode::Return, 0, 2, 0),
        ],
        vec![LuaValue::Integer(6), LuaValue::Integer(7)],
    );
    let bytes = dump(&chunk, true);

    let mut vm = LuaVM::new();
    vm.load_binary(&bytes).unwrap();
    vm.call(0, LUA_MULTRET).unwrap();
    assert_eq!(vm.to_integer(-1), 42);
}

#[test]
fn test_vm_dump_of_loaded_function() {
    let mut vm = LuaVM::new();
    vm.load(Rc::new(sample())).unwrap();
    let bytes = vm.dump(false).unwrap();
    let loaded = undump(&bytes).unwrap();
    assert_eq!(loaded.protos.len(), 1);

    vm.push_rust_function(|_| Ok(0)).unwrap();
    assert!(vm.dump(false).is_none());
}
