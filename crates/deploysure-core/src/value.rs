//! Scalar values returned by the warehouse
//!
//! Warehouse cells are converted into [`Value`] at the adapter boundary. The
//! `Display` form of a value is its canonical text: this is what test case
//! results are compared against and what ends up in exported tables.

use rust_decimal::prelude::ToPrimitive;
use std::fmt;

pub use rust_decimal::Decimal;

/// One cell of a warehouse result
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Decimal(_) | Value::Float(_))
    }

    /// Integer view of the value (counts come back as NUMBER(18,0) or text)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            Value::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Some(*v as i64),
            Value::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Decimal(d) => d.to_f64(),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Fixed-point number `unscaled / 10^scale`
    ///
    /// Snowflake NUMBER carries up to 38 digits; past the 28 a [`Decimal`]
    /// holds, the value becomes a float.
    pub fn from_scaled(unscaled: i128, scale: u32) -> Value {
        match Decimal::try_from_i128_with_scale(unscaled, scale) {
            Ok(d) => Value::Decimal(d),
            Err(_) => Value::Float(unscaled as f64 / 10f64.powi(scale as i32)),
        }
    }

    /// Parse a plain decimal literal such as `-12.50`
    ///
    /// Exponent notation is not accepted; those values come back from the
    /// warehouse as floats.
    pub fn parse_decimal(text: &str) -> Option<Value> {
        let text = text.trim();
        let plain = text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.'));
        if text.is_empty() || !plain {
            return None;
        }

        match Decimal::from_str_exact(text) {
            Ok(d) => Some(Value::Decimal(d)),
            Err(_) => text.parse::<f64>().ok().map(Value::Float),
        }
    }

    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int(v) => Some(Decimal::from(*v)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// `self - other` when both sides are numeric
    ///
    /// Integers and decimals subtract exactly; as soon as one side is a float
    /// the difference is computed in floating point.
    pub fn numeric_difference(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(match a.checked_sub(*b) {
                Some(diff) => Value::Int(diff),
                None => Value::from_scaled(i128::from(*a) - i128::from(*b), 0),
            }),
            (Value::Float(_), _) | (_, Value::Float(_)) => {
                Some(Value::Float(self.to_f64()? - other.to_f64()?))
            }
            _ => {
                let lhs = self.to_decimal()?;
                let rhs = other.to_decimal()?;
                match lhs.checked_sub(rhs) {
                    Some(diff) => Some(Value::Decimal(diff)),
                    None => Some(Value::Float(lhs.to_f64()? - rhs.to_f64()?)),
                }
            }
        }
    }

    /// True for a numeric zero of any representation
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(v) => *v == 0,
            Value::Decimal(d) => d.is_zero(),
            Value::Float(v) => *v == 0.0,
            _ => false,
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_literals() {
        assert_eq!(Value::parse_decimal("10.50"), Some(Value::Decimal(Decimal::new(1050, 2))));
        assert_eq!(Value::parse_decimal("10.50").unwrap().to_string(), "10.50");
        assert_eq!(Value::parse_decimal("-0.005").unwrap().to_string(), "-0.005");
        assert_eq!(Value::parse_decimal("42").unwrap().to_string(), "42");
        assert_eq!(Value::parse_decimal(".5").unwrap().to_string(), "0.5");
        assert_eq!(Value::parse_decimal("1e5"), None);
        assert_eq!(Value::parse_decimal(""), None);
        assert_eq!(Value::parse_decimal("12a"), None);
    }

    #[test]
    fn wide_numbers_fall_back_to_float() {
        assert_eq!(Value::from_scaled(1050, 2), Value::Decimal(Decimal::new(1050, 2)));

        let wide = Value::parse_decimal("123456789012345678901234567890.5").unwrap();
        assert!(matches!(wide, Value::Float(_)));

        let scaled = Value::from_scaled(10i128.pow(30), 37);
        assert!(matches!(scaled, Value::Float(v) if (v - 1e-7).abs() < 1e-12));
    }

    #[test]
    fn decimal_subtraction_keeps_scale() {
        let diff = Value::parse_decimal("10.5")
            .unwrap()
            .numeric_difference(&Value::parse_decimal("10.25").unwrap())
            .unwrap();
        assert_eq!(diff.to_string(), "0.25");
        assert!(!diff.is_zero());

        let same = Value::Decimal(Decimal::new(105, 1))
            .numeric_difference(&Value::parse_decimal("10.50").unwrap())
            .unwrap();
        assert!(same.is_zero());
    }

    #[test]
    fn integer_overflow_stays_exact() {
        let diff = Value::Int(i64::MAX).numeric_difference(&Value::Int(-1)).unwrap();
        assert_eq!(diff.to_string(), "9223372036854775808");
    }

    #[test]
    fn decimal_to_integer() {
        assert_eq!(Value::Decimal(Decimal::new(1000, 2)).as_i64(), Some(10));
        assert_eq!(Value::Decimal(Decimal::new(1050, 2)).as_i64(), None);
    }

    #[test]
    fn value_text_forms() {
        assert_eq!(Value::Int(10).to_string(), "10");
        assert_eq!(Value::Float(10.0).to_string(), "10.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Decimal(Decimal::new(1050, 2)).to_string(), "10.50");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Bool(false).to_string(), "False");
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::from("abc").to_string(), "abc");
    }

    #[test]
    fn numeric_difference_is_source_minus_target() {
        assert_eq!(Value::Int(10).numeric_difference(&Value::Int(9)), Some(Value::Int(1)));
        assert_eq!(Value::Int(9).numeric_difference(&Value::Int(10)), Some(Value::Int(-1)));

        let diff = Value::Decimal(Decimal::new(1050, 2))
            .numeric_difference(&Value::Int(10))
            .unwrap();
        assert_eq!(diff.to_string(), "0.50");

        let diff = Value::Float(1.5).numeric_difference(&Value::Int(1)).unwrap();
        assert_eq!(diff, Value::Float(0.5));

        assert!(Value::from("x").numeric_difference(&Value::Int(1)).is_none());
    }

    #[test]
    fn integer_view() {
        assert_eq!(Value::Int(3).as_i64(), Some(3));
        assert_eq!(Value::from(" 7 ").as_i64(), Some(7));
        assert_eq!(Value::Float(2.0).as_i64(), Some(2));
        assert_eq!(Value::Null.as_i64(), None);
    }
}
