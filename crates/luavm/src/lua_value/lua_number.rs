//! Numeric helpers shared by the value model and the arithmetic kernels.
//!
//! Covers the Lua 5.3 numeral grammar (decimal and hexadecimal integers and
//! floats), exact float to integer conversion, floor division and modulo for
//! both number subtypes, logical shifts, and `%.14g` number formatting.

/// Parse a Lua integer numeral. Hexadecimal numerals wrap around on overflow;
/// decimal numerals that overflow are rejected so the caller can retry as a float.
pub fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim_matches(is_lua_space);
    let (neg, body) = split_sign(s);
    if body.is_empty() {
        return None;
    }

    if let Some(hex) = strip_hex_prefix(body) {
        if hex.is_empty() {
            return None;
        }
        let mut n: i64 = 0;
        for c in hex.chars() {
            let d = c.to_digit(16)? as i64;
            n = n.wrapping_mul(16).wrapping_add(d);
        }
        return Some(if neg { n.wrapping_neg() } else { n });
    }

    let mut n: i64 = 0;
    for c in body.chars() {
        let d = c.to_digit(10)? as i64;
        n = if neg {
            n.checked_mul(10)?.checked_sub(d)?
        } else {
            n.checked_mul(10)?.checked_add(d)?
        };
    }
    Some(n)
}

/// Parse a Lua float numeral. `inf` and `nan` spellings are not numerals.
pub fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim_matches(is_lua_space);
    let (neg, body) = split_sign(s);
    if body.is_empty() || body.starts_with(['+', '-']) {
        return None;
    }

    let value = match strip_hex_prefix(body) {
        Some(hex) => parse_hex_float(hex)?,
        None => {
            if !body
                .bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
            {
                return None;
            }
            // reject "e5" and "." which Rust would otherwise refuse or accept inconsistently
            if !body.bytes().any(|b| b.is_ascii_digit()) {
                return None;
            }
            body.parse::<f64>().ok()?
        }
    };
    Some(if neg { -value } else { value })
}

fn parse_hex_float(s: &str) -> Option<f64> {
    let mut mantissa: f64 = 0.0;
    let mut exp: i64 = 0;
    let mut any_digit = false;
    let mut seen_dot = false;
    let mut chars = s.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c == '.' {
            if seen_dot {
                return None;
            }
            seen_dot = true;
        } else if let Some(d) = c.to_digit(16) {
            mantissa = mantissa * 16.0 + d as f64;
            any_digit = true;
            if seen_dot {
                exp -= 4;
            }
        } else {
            break;
        }
        chars.next();
    }
    if !any_digit {
        return None;
    }

    if let Some(&c) = chars.peek()
        && (c == 'p' || c == 'P')
    {
        chars.next();
        let rest: String = chars.collect();
        let (neg, digits) = split_sign(&rest);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let e: i64 = digits.parse().ok()?;
        exp += if neg { -e } else { e };
    } else if chars.next().is_some() {
        return None;
    }

    Some(mantissa * 2f64.powi(exp.clamp(i32::MIN as i64, i32::MAX as i64) as i32))
}

fn split_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    }
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

fn is_lua_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// Convert a float to an integer only when the conversion is exact.
pub fn float_to_integer(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; i64::MAX is not
    if f.floor() == f && f >= -9223372036854775808.0 && f < 9223372036854775808.0 {
        Some(f as i64)
    } else {
        None
    }
}

/// Integer modulo with the sign of the divisor. The caller rejects `b == 0`.
pub fn imod(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && (r ^ b) < 0 { r + b } else { r }
}

/// Float modulo with the sign of the divisor.
pub fn fmod(a: f64, b: f64) -> f64 {
    let m = a % b;
    if (m > 0.0 && b < 0.0) || (m < 0.0 && b > 0.0) {
        m + b
    } else {
        m
    }
}

/// Integer floor division. The caller rejects `b == 0`.
pub fn ifloor_div(a: i64, b: i64) -> i64 {
    if b == -1 {
        return a.wrapping_neg();
    }
    let q = a / b;
    if a % b != 0 && (a ^ b) < 0 { q - 1 } else { q }
}

pub fn ffloor_div(a: f64, b: f64) -> f64 {
    (a / b).floor()
}

/// Logical left shift; negative counts shift right, counts of 64 or more yield zero.
pub fn shift_left(a: i64, n: i64) -> i64 {
    if n <= -64 || n >= 64 {
        0
    } else if n >= 0 {
        ((a as u64) << n) as i64
    } else {
        ((a as u64) >> (-n)) as i64
    }
}

pub fn shift_right(a: i64, n: i64) -> i64 {
    if n == i64::MIN {
        return 0;
    }
    shift_left(a, -n)
}

/// Format an integer the way `tostring` does.
pub fn fmt_integer(i: i64) -> String {
    let mut buffer = itoa::Buffer::new();
    buffer.format(i).to_owned()
}

/// Format a float with `%.14g`, appending `.0` when the text would read as an integer.
pub fn fmt_float(f: f64) -> String {
    if f.is_nan() {
        return if f.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if f.is_infinite() {
        return if f < 0.0 { "-inf" } else { "inf" }.to_string();
    }

    let mut s = fmt_g14(f);
    if s.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        s.push_str(".0");
    }
    s
}

const G_PRECISION: i32 = 14;

fn fmt_g14(f: f64) -> String {
    if f == 0.0 {
        return if f.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // The exponent after rounding to the target precision picks the notation.
    let sci = format!("{:.*e}", (G_PRECISION - 1) as usize, f);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= G_PRECISION {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (G_PRECISION - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, f)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
