use super::TmKind;
use crate::lua_value::{LuaValue, str_to_number};
use crate::lua_value::lua_number::{ffloor_div, fmod, ifloor_div, imod, shift_left, shift_right};
use crate::lua_vm::{ArithOp, LuaError, LuaResult, LuaVM};

type IntKernel = fn(i64, i64) -> LuaResult<i64>;
type FloatKernel = fn(f64, f64) -> f64;

/// Integer kernel of an operator; `Pow` and `Div` always work on floats
fn int_kernel(op: ArithOp) -> Option<IntKernel> {
    let f: IntKernel = match op {
        ArithOp::Add => |a, b| Ok(a.wrapping_add(b)),
        ArithOp::Sub => |a, b| Ok(a.wrapping_sub(b)),
        ArithOp::Mul => |a, b| Ok(a.wrapping_mul(b)),
        ArithOp::Mod => int_mod,
        ArithOp::IDiv => int_floor_div,
        ArithOp::BAnd => |a, b| Ok(a & b),
        ArithOp::BOr => |a, b| Ok(a | b),
        ArithOp::BXor => |a, b| Ok(a ^ b),
        ArithOp::Shl => |a, b| Ok(shift_left(a, b)),
        ArithOp::Shr => |a, b| Ok(shift_right(a, b)),
        ArithOp::Unm => |a, _| Ok(a.wrapping_neg()),
        ArithOp::BNot => |a, _| Ok(!a),
        ArithOp::Pow | ArithOp::Div => return None,
    };
    Some(f)
}

/// Float kernel of an operator; bitwise operators have none
fn float_kernel(op: ArithOp) -> Option<FloatKernel> {
    let f: FloatKernel = match op {
        ArithOp::Add => |a, b| a + b,
        ArithOp::Sub => |a, b| a - b,
        ArithOp::Mul => |a, b| a * b,
        ArithOp::Mod => fmod,
        ArithOp::Pow => f64::powf,
        ArithOp::Div => |a, b| a / b,
        ArithOp::IDiv => ffloor_div,
        ArithOp::Unm => |a, _| -a,
        ArithOp::BAnd
        | ArithOp::BOr
        | ArithOp::BXor
        | ArithOp::Shl
        | ArithOp::Shr
        | ArithOp::BNot => return None,
    };
    Some(f)
}

fn int_mod(a: i64, b: i64) -> LuaResult<i64> {
    if b == 0 {
        return Err(LuaError::Arithmetic("attempt to perform 'n%0'".to_string()));
    }
    Ok(imod(a, b))
}

fn int_floor_div(a: i64, b: i64) -> LuaResult<i64> {
    if b == 0 {
        return Err(LuaError::Arithmetic("attempt to perform 'n//0'".to_string()));
    }
    Ok(ifloor_div(a, b))
}

/// Numeric evaluation without metamethods; `None` when the operands do not coerce
pub(crate) fn arith_raw(a: &LuaValue, b: &LuaValue, op: ArithOp) -> LuaResult<Option<LuaValue>> {
    let int_kernel = int_kernel(op);

    let Some(float_kernel) = float_kernel(op) else {
        // bitwise: both operands must have an integer representation
        let (Some(x), Some(y), Some(f)) = (a.to_integer(), b.to_integer(), int_kernel) else {
            return Ok(None);
        };
        return f(x, y).map(|r| Some(LuaValue::Integer(r)));
    };

    let (Some(a), Some(b)) = (numeric(a), numeric(b)) else {
        return Ok(None);
    };
    if let (Some(f), LuaValue::Integer(x), LuaValue::Integer(y)) = (int_kernel, &a, &b) {
        return f(*x, *y).map(|r| Some(LuaValue::Integer(r)));
    }
    match (a.to_number(), b.to_number()) {
        (Some(x), Some(y)) => Ok(Some(LuaValue::Float(float_kernel(x, y)))),
        _ => Ok(None),
    }
}

/// Numbers pass through; strings convert to an integer or a float numeral
fn numeric(v: &LuaValue) -> Option<LuaValue> {
    match v {
        LuaValue::Integer(_) | LuaValue::Float(_) => Some(v.clone()),
        LuaValue::String(s) => str_to_number(s),
        _ => None,
    }
}

fn arith_error(a: &LuaValue, b: &LuaValue, op: ArithOp) -> LuaError {
    if op.is_bitwise() {
        if a.is_number() && b.is_number() {
            return LuaError::Arithmetic("number has no integer representation".to_string());
        }
        let bad = if a.to_number().is_none() { a } else { b };
        return LuaError::Arithmetic(format!(
            "attempt to perform bitwise operation on a {} value",
            bad.type_name()
        ));
    }
    let bad = if a.to_number().is_none() { a } else { b };
    LuaError::Arithmetic(format!(
        "attempt to perform arithmetic on a {} value",
        bad.type_name()
    ))
}

impl LuaVM {
    /// Pop the operand(s), push the result. Unary operators use the single
    /// operand as both sides.
    pub fn arith(&mut self, op: ArithOp) -> LuaResult<()> {
        let b = self.pop_value()?;
        let a = if op.is_unary() { b.clone() } else { self.pop_value()? };
        let result = self.arith_values(&a, &b, op)?;
        self.push(result)
    }

    pub(crate) fn arith_values(&mut self, a: &LuaValue, b: &LuaValue, op: ArithOp) -> LuaResult<LuaValue> {
        if let Some(v) = arith_raw(a, b, op)? {
            return Ok(v);
        }
        if let Some(v) = self.try_bin_metamethod(a, b, TmKind::from_arith(op))? {
            return Ok(v);
        }
        Err(arith_error(a, b, op))
    }
}
