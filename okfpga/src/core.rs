//! Values that can be written to a wire register

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{0}` is not a non-negative integer")]
pub struct InvalidValue(pub String);

/// Anything a caller may hand to [`crate::device::OpalKelly::set_register`]
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterValue {
    Integer(i128),
    /// Truncated toward zero
    Float(f64),
    /// Decimal, or prefixed with `0x`, `0o` or `0b`
    Literal(String),
}

fn parse_literal(s: &str) -> Option<u128> {
    let s = s.trim().replace('_', "");
    let s = s.strip_prefix('+').unwrap_or(&s);
    let lower = s.to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (oct, 8)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin, 2)
    } else {
        (lower.as_str(), 10)
    };
    // `from_str_radix` would accept a second sign
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    u128::from_str_radix(digits, radix).ok()
}

impl RegisterValue {
    /// The unsigned integer this value stands for
    /// # Errors
    /// Returns an error for negative or non-finite numbers and malformed literals
    pub fn resolve(&self) -> Result<u128, InvalidValue> {
        match self {
            RegisterValue::Integer(v) => {
                u128::try_from(*v).map_err(|_| InvalidValue(v.to_string()))
            }
            RegisterValue::Float(v) => {
                if v.is_finite() && v.trunc() >= 0.0 {
                    // Saturates above u128::MAX, which no register can hold anyway
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    Ok(v.trunc() as u128)
                } else {
                    Err(InvalidValue(v.to_string()))
                }
            }
            RegisterValue::Literal(s) => parse_literal(s).ok_or_else(|| InvalidValue(s.clone())),
        }
    }
}

macro_rules! from_int {
    ($num:ty) => {
        impl From<$num> for RegisterValue {
            fn from(v: $num) -> Self {
                RegisterValue::Integer(v.into())
            }
        }
    };
}

from_int!(u8);
from_int!(u16);
from_int!(u32);
from_int!(u64);
from_int!(i8);
from_int!(i16);
from_int!(i32);
from_int!(i64);
from_int!(i128);

impl From<usize> for RegisterValue {
    fn from(v: usize) -> Self {
        RegisterValue::Integer(v as i128)
    }
}

impl From<f32> for RegisterValue {
    fn from(v: f32) -> Self {
        RegisterValue::Float(v.into())
    }
}

impl From<f64> for RegisterValue {
    fn from(v: f64) -> Self {
        RegisterValue::Float(v)
    }
}

impl From<&str> for RegisterValue {
    fn from(v: &str) -> Self {
        RegisterValue::Literal(v.to_owned())
    }
}

impl From<String> for RegisterValue {
    fn from(v: String) -> Self {
        RegisterValue::Literal(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paste::paste;

    macro_rules! test_resolve {
        ($name:ident, $v:expr, $expected:expr) => {
            paste! {
                #[test]
                fn [<test_resolve_ $name>]() {
                    assert_eq!(RegisterValue::from($v).resolve(), $expected);
                }
            }
        };
    }

    test_resolve!(u8, 7u8, Ok(7));
    test_resolve!(u32_max, u32::MAX, Ok(u128::from(u32::MAX)));
    test_resolve!(negative, -1i32, Err(InvalidValue("-1".to_owned())));
    test_resolve!(float, 3.9f64, Ok(3));
    test_resolve!(float_small, 0.5f32, Ok(0));
    test_resolve!(float_negative, -2.5f64, Err(InvalidValue("-2.5".to_owned())));
    test_resolve!(nan, f64::NAN, Err(InvalidValue("NaN".to_owned())));
    test_resolve!(decimal, "42", Ok(42));
    test_resolve!(hex, "0xFF", Ok(255));
    test_resolve!(hex_upper, "0XfF", Ok(255));
    test_resolve!(octal, "0o17", Ok(15));
    test_resolve!(binary, "0b101", Ok(5));
    test_resolve!(padded, " 1_000 ", Ok(1000));
    test_resolve!(bad_literal, "ten", Err(InvalidValue("ten".to_owned())));
    test_resolve!(empty_hex, "0x", Err(InvalidValue("0x".to_owned())));
    test_resolve!(double_sign, "+-1", Err(InvalidValue("+-1".to_owned())));
}
