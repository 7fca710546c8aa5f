/// Arithmetic, comparison, length and concatenation through the stack API
use crate::lua_value::LuaValue;
use crate::lua_vm::{ArithOp, CompareOp, LuaError, LuaVM};

fn arith(a: LuaValue, b: LuaValue, op: ArithOp) -> Result<LuaValue, LuaError> {
    let mut vm = LuaVM::new();
    vm.push(a)?;
    if !op.is_unary() {
        vm.push(b)?;
    }
    vm.arith(op)?;
    assert_eq!(vm.get_top(), 1);
    vm.pop_value()
}

fn compare(a: LuaValue, b: LuaValue, op: CompareOp) -> Result<bool, LuaError> {
    let mut vm = LuaVM::new();
    vm.push(a)?;
    vm.push(b)?;
    vm.compare(1, 2, op)
}

#[test]
fn test_integer_arith_wraps() {
    let r = arith(LuaValue::Integer(i64::MAX), LuaValue::Integer(1), ArithOp::Add).unwrap();
    assert_eq!(r, LuaValue::Integer(i64::MIN));
    let r = arith(LuaValue::Integer(6), LuaValue::Integer(7), ArithOp::Mul).unwrap();
    assert_eq!(r, LuaValue::Integer(42));
}

#[test]
fn test_mixed_arith_is_float() {
    let r = arith(LuaValue::Integer(1), LuaValue::Float(0.5), ArithOp::Add).unwrap();
    assert_eq!(r, LuaValue::Float(1.5));
    let r = arith(LuaValue::Integer(7), LuaValue::Integer(2), ArithOp::Div).unwrap();
    assert_eq!(r, LuaValue::Float(3.5));
    let r = arith(LuaValue::Integer(2), LuaValue::Integer(10), ArithOp::Pow).unwrap();
    assert_eq!(r, LuaValue::Float(1024.0));
}

#[test]
fn test_floor_division_and_modulo() {
    let r = arith(LuaValue::Integer(-7), LuaValue::Integer(2), ArithOp::IDiv).unwrap();
    assert_eq!(r, LuaValue::Integer(-4));
    let r = arith(LuaValue::Integer(-7), LuaValue::Integer(2), ArithOp::Mod).unwrap();
    assert_eq!(r, LuaValue::Integer(1));
    let r = arith(LuaValue::Float(5.5), LuaValue::Integer(-2), ArithOp::Mod).unwrap();
    assert_eq!(r, LuaValue::Float(-0.5));
    let r = arith(LuaValue::Float(7.0), LuaValue::Integer(2), ArithOp::IDiv).unwrap();
    assert_eq!(r, LuaValue::Float(3.0));
}

#[test]
fn test_integer_division_by_zero() {
    let err = arith(LuaValue::Integer(1), LuaValue::Integer(0), ArithOp::IDiv).unwrap_err();
    assert_eq!(err.to_string(), "attempt to perform 'n//0'");
    let err = arith(LuaValue::Integer(1), LuaValue::Integer(0), ArithOp::Mod).unwrap_err();
    assert_eq!(err.to_string(), "attempt to perform 'n%0'");
    // float division by zero is IEEE
    let r = arith(LuaValue::Integer(1), LuaValue::Integer(0), ArithOp::Div).unwrap();
    assert_eq!(r, LuaValue::Float(f64::INFINITY));
}

#[test]
fn test_string_coercion() {
    let r = arith(LuaValue::string("10"), LuaValue::Integer(1), ArithOp::Add).unwrap();
    assert_eq!(r, LuaValue::Integer(11));
    let r = arith(LuaValue::string("0x10"), LuaValue::string("1.5"), ArithOp::Mul).unwrap();
    assert_eq!(r, LuaValue::Float(24.0));
    let err = arith(LuaValue::string("abc"), LuaValue::Integer(1), ArithOp::Add).unwrap_err();
    assert!(matches!(err, LuaError::Arithmetic(_)));
}

#[test]
fn test_bitwise() {
    let r = arith(LuaValue::Integer(0b1100), LuaValue::Integer(0b1010), ArithOp::BXor).unwrap();
    assert_eq!(r, LuaValue::Integer(0b0110));
    let r = arith(LuaValue::Float(3.0), LuaValue::Integer(1), ArithOp::Shl).unwrap();
    assert_eq!(r, LuaValue::Integer(6));
    let r = arith(LuaValue::Integer(-1), LuaValue::Integer(63), ArithOp::Shr).unwrap();
    assert_eq!(r, LuaValue::Integer(1));
    let r = arith(LuaValue::Integer(1), LuaValue::Integer(64), ArithOp::Shl).unwrap();
    assert_eq!(r, LuaValue::Integer(0));
    let r = arith(LuaValue::Integer(5), LuaValue::Nil, ArithOp::BNot).unwrap();
    assert_eq!(r, LuaValue::Integer(-6));

    let err = arith(LuaValue::Float(1.5), LuaValue::Integer(1), ArithOp::BAnd).unwrap_err();
    assert_eq!(err.to_string(), "number has no integer representation");
}

#[test]
fn test_unary_minus() {
    let r = arith(LuaValue::Integer(5), LuaValue::Nil, ArithOp::Unm).unwrap();
    assert_eq!(r, LuaValue::Integer(-5));
    let r = arith(LuaValue::Float(0.25), LuaValue::Nil, ArithOp::Unm).unwrap();
    assert_eq!(r, LuaValue::Float(-0.25));
}

#[test]
fn test_arith_error_names_type() {
    let err = arith(LuaValue::Integer(1), LuaValue::new_table(), ArithOp::Sub).unwrap_err();
    assert_eq!(err.to_string(), "attempt to perform arithmetic on a table value");
}

#[test]
fn test_equality() {
    assert!(compare(LuaValue::Integer(1), LuaValue::Float(1.0), CompareOp::Eq).unwrap());
    assert!(!compare(LuaValue::string("1"), LuaValue::Integer(1), CompareOp::Eq).unwrap());
    assert!(compare(LuaValue::string("a"), LuaValue::string("a"), CompareOp::Eq).unwrap());
    assert!(!compare(LuaValue::new_table(), LuaValue::new_table(), CompareOp::Eq).unwrap());
    assert!(!compare(LuaValue::Float(f64::NAN), LuaValue::Float(f64::NAN), CompareOp::Eq).unwrap());
}

#[test]
fn test_ordering() {
    assert!(compare(LuaValue::Integer(1), LuaValue::Integer(2), CompareOp::Lt).unwrap());
    assert!(!compare(LuaValue::Integer(2), LuaValue::Integer(1), CompareOp::Lt).unwrap());
    assert!(compare(LuaValue::Integer(2), LuaValue::Float(2.0), CompareOp::Le).unwrap());
    assert!(compare(LuaValue::string("abc"), LuaValue::string("abd"), CompareOp::Lt).unwrap());
    assert!(!compare(LuaValue::Float(f64::NAN), LuaValue::Integer(1), CompareOp::Le).unwrap());
}

#[test]
fn test_ordering_errors() {
    let err = compare(LuaValue::Integer(1), LuaValue::string("2"), CompareOp::Lt).unwrap_err();
    assert_eq!(err.to_string(), "attempt to compare number with string");
    let err = compare(LuaValue::new_table(), LuaValue::new_table(), CompareOp::Le).unwrap_err();
    assert_eq!(err.to_string(), "attempt to compare two table values");
}

#[test]
fn test_concat() {
    let mut vm = LuaVM::new();
    vm.push_string("a").unwrap();
    vm.push_integer(1).unwrap();
    vm.push_number(2.5).unwrap();
    vm.concat(3).unwrap();
    assert_eq!(vm.get_top(), 1);
    assert_eq!(vm.to_string(-1).unwrap(), "a12.5");

    vm.concat(0).unwrap();
    assert_eq!(vm.to_string(-1).unwrap(), "");

    vm.push_boolean(true).unwrap();
    let err = vm.concat(2).unwrap_err();
    assert_eq!(err.to_string(), "attempt to concatenate a boolean value");
}

#[test]
fn test_len_of_string_and_error() {
    let mut vm = LuaVM::new();
    vm.push_string("hello").unwrap();
    vm.len(1).unwrap();
    assert_eq!(vm.to_integer(-1), 5);
    vm.push_integer(3).unwrap();
    let err = vm.len(-1).unwrap_err();
    assert_eq!(err.to_string(), "attempt to get length of a number value");
}
