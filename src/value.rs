//! Numeric values shared by literals, the constant pool and the VM stack.
//!
//! The language is untyped: every value is a number, either an integer or a
//! float. The kind follows the literal form and survives `+`, `-` and `*` when
//! both operands are integers; `/` and `^` always produce floats.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Integer overflow in {operation}")]
pub struct OverflowError {
    pub operation: &'static str,
}

impl Value {
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Integer(value) => value as f64,
            Value::Float(value) => value,
        }
    }

    pub fn add(self, rhs: Value) -> Result<Value, OverflowError> {
        self.integer_or_float(rhs, "addition", i64::checked_add, |a, b| a + b)
    }

    pub fn sub(self, rhs: Value) -> Result<Value, OverflowError> {
        self.integer_or_float(rhs, "subtraction", i64::checked_sub, |a, b| a - b)
    }

    pub fn mul(self, rhs: Value) -> Result<Value, OverflowError> {
        self.integer_or_float(rhs, "multiplication", i64::checked_mul, |a, b| a * b)
    }

    /// Always a float; dividing by zero yields `inf` or `NaN`.
    pub fn div(self, rhs: Value) -> Value {
        Value::Float(self.as_f64() / rhs.as_f64())
    }

    pub fn pow(self, rhs: Value) -> Value {
        Value::Float(self.as_f64().powf(rhs.as_f64()))
    }

    fn integer_or_float(
        self,
        rhs: Value,
        operation: &'static str,
        integer_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value, OverflowError> {
        match (self, rhs) {
            (Value::Integer(left), Value::Integer(right)) => integer_op(left, right)
                .map(Value::Integer)
                .ok_or(OverflowError { operation }),
            (left, right) => Ok(Value::Float(float_op(left.as_f64(), right.as_f64()))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{value}"),
            Value::Float(value) if value.is_nan() => write!(f, "nan"),
            Value::Float(value) if value.is_infinite() => {
                write!(f, "{}", if *value > 0.0 { "inf" } else { "-inf" })
            }
            // Integral floats keep a visible fractional part: 6.0, not 6.
            Value::Float(value) if value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            Value::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_keeps_integer_kind() {
        let sum = Value::Integer(2).add(Value::Integer(3)).expect("add");
        let product = Value::Integer(4).mul(Value::Integer(4)).expect("mul");
        assert_eq!(sum, Value::Integer(5));
        assert_eq!(product, Value::Integer(16));
    }

    #[test]
    fn mixed_operands_promote_to_float() {
        let sum = Value::Integer(1).add(Value::Float(2.5)).expect("add");
        assert_eq!(sum, Value::Float(3.5));
    }

    #[test]
    fn division_and_power_are_always_float() {
        assert_eq!(Value::Integer(1).div(Value::Integer(2)), Value::Float(0.5));
        assert_eq!(Value::Integer(2).pow(Value::Integer(3)), Value::Float(8.0));
        assert_eq!(Value::Integer(9).pow(Value::Float(0.5)), Value::Float(3.0));
    }

    #[test]
    fn division_by_zero_follows_float_rules() {
        assert_eq!(
            Value::Integer(1).div(Value::Integer(0)),
            Value::Float(f64::INFINITY)
        );
        assert!(Value::Integer(0).div(Value::Integer(0)).as_f64().is_nan());
    }

    #[test]
    fn reports_integer_overflow() {
        let err = Value::Integer(i64::MAX)
            .add(Value::Integer(1))
            .expect_err("expected overflow");
        assert_eq!(err.to_string(), "Integer overflow in addition");
    }

    #[test]
    fn renders_floats_with_fraction() {
        assert_eq!(Value::Float(6.0).to_string(), "6.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Integer(16).to_string(), "16");
        assert_eq!(Value::Float(f64::NEG_INFINITY).to_string(), "-inf");
    }

    #[test]
    fn large_integral_floats_keep_fraction() {
        assert_eq!(Value::Float(1e16).to_string(), "10000000000000000.0");
        assert_eq!(Value::Float(-2e17).to_string(), "-200000000000000000.0");
        assert_ne!(
            Value::Float(1e16).to_string(),
            Value::Integer(10_000_000_000_000_000).to_string()
        );
    }
}
