/// Table tests through the stack API
use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaError, LuaType, LuaVM};

#[test]
fn test_field_round_trip() {
    let mut vm = LuaVM::new();
    vm.new_table().unwrap();
    vm.push_integer(5).unwrap();
    vm.set_field(1, "x").unwrap();
    assert_eq!(vm.get_field(1, "x").unwrap(), LuaType::Number);
    assert_eq!(vm.to_integer(-1), 5);
    vm.pop(1).unwrap();

    // assigning nil removes the field
    vm.push_nil().unwrap();
    vm.set_field(1, "x").unwrap();
    assert_eq!(vm.get_field(1, "x").unwrap(), LuaType::Nil);
    assert_eq!(vm.get_top(), 2);
}

#[test]
fn test_float_keys_normalize() {
    let mut vm = LuaVM::new();
    vm.new_table().unwrap();
    vm.push_number(2.0).unwrap();
    vm.push_string("two").unwrap();
    vm.set_table(1).unwrap();
    vm.get_i(1, 2).unwrap();
    assert_eq!(vm.to_string(-1).unwrap(), "two");
}

#[test]
fn test_sequence_length() {
    let mut vm = LuaVM::new();
    vm.create_table(4, 0).unwrap();
    for i in 1..=3 {
        vm.push_integer(i * 10).unwrap();
        vm.raw_seti(1, i).unwrap();
    }
    assert_eq!(vm.raw_len(1), 3);
    vm.len(1).unwrap();
    assert_eq!(vm.to_integer(-1), 3);
    vm.pop(1).unwrap();

    vm.push_nil().unwrap();
    vm.raw_seti(1, 3).unwrap();
    assert_eq!(vm.raw_len(1), 2);
}

#[test]
fn test_nil_and_nan_keys_rejected() {
    let mut vm = LuaVM::new();
    vm.new_table().unwrap();
    vm.push_nil().unwrap();
    vm.push_integer(1).unwrap();
    let err = vm.set_table(1).unwrap_err();
    assert_eq!(err.to_string(), "table index is nil");

    vm.push_number(f64::NAN).unwrap();
    vm.push_integer(1).unwrap();
    let err = vm.raw_set(1).unwrap_err();
    assert_eq!(err.to_string(), "table index is NaN");

    // reading with a nil key is not an error
    vm.push_nil().unwrap();
    assert_eq!(vm.get_table(1).unwrap(), LuaType::Nil);
}

#[test]
fn test_next_traversal() {
    let mut vm = LuaVM::new();
    vm.new_table().unwrap();
    for (k, v) in [("a", 1), ("b", 2), ("c", 3)] {
        vm.push_integer(v).unwrap();
        vm.set_field(1, k).unwrap();
    }
    vm.push_integer(100).unwrap();
    vm.raw_seti(1, 1).unwrap();

    let mut sum = 0;
    let mut count = 0;
    vm.push_nil().unwrap();
    while vm.next(1).unwrap() {
        sum += vm.to_integer(-1);
        count += 1;
        vm.pop(1).unwrap();
    }
    assert_eq!(count, 4);
    assert_eq!(sum, 106);
    assert_eq!(vm.get_top(), 1);
}

#[test]
fn test_next_clearing_fields() {
    let mut vm = LuaVM::new();
    vm.new_table().unwrap();
    for i in 1..=5 {
        vm.push_integer(i).unwrap();
        vm.set_field(1, &format!("k{}", i)).unwrap();
    }

    let mut seen = 0;
    vm.push_nil().unwrap();
    while vm.next(1).unwrap() {
        seen += 1;
        vm.pop(1).unwrap();
        // clear the current key while traversing
        vm.push_value(-1).unwrap();
        vm.push_nil().unwrap();
        vm.set_table(1).unwrap();
    }
    assert_eq!(seen, 5);
    vm.push_nil().unwrap();
    assert!(!vm.next(1).unwrap());
}

#[test]
fn test_next_invalid_key() {
    let mut vm = LuaVM::new();
    vm.new_table().unwrap();
    vm.push_integer(1).unwrap();
    vm.set_field(1, "a").unwrap();
    vm.push_string("missing").unwrap();
    assert!(matches!(vm.next(1), Err(LuaError::Runtime(_))));
}

#[test]
fn test_globals() {
    let mut vm = LuaVM::new();
    vm.push_integer(7).unwrap();
    vm.set_global("answer").unwrap();
    assert_eq!(vm.get_global("answer").unwrap(), LuaType::Number);
    assert_eq!(vm.to_integer(-1), 7);
    assert_eq!(vm.get_global("missing").unwrap(), LuaType::Nil);

    let globals = vm.globals();
    let t = globals.as_table().unwrap();
    assert_eq!(t.borrow().get_str("answer"), LuaValue::Integer(7));
}

#[test]
fn test_raw_access_requires_table() {
    let mut vm = LuaVM::new();
    vm.push_integer(1).unwrap();
    vm.push_string("k").unwrap();
    assert!(matches!(vm.raw_get(1), Err(LuaError::Type(_))));
}

#[test]
fn test_index_non_table() {
    let mut vm = LuaVM::new();
    vm.push_integer(3).unwrap();
    let err = vm.get_field(1, "x").unwrap_err();
    assert_eq!(err.to_string(), "attempt to index a number value");

    vm.push_integer(1).unwrap();
    let err = vm.set_field(1, "x").unwrap_err();
    assert_eq!(err.to_string(), "attempt to index a number value");
}
