//! Text conversion for primitive values.
//!
//! The converter is used for path segments, query parameters and rendered
//! output alike, so a value rendered by an encoder always parses back to
//! the same value.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::ConversionError;
use crate::types::Primitive;
use crate::value::Value;

/// Format used for date and time values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
/// Format used for dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Format used for times.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Converts primitive values to and from their text form.
///
/// # Example
///
/// ```
/// use daedalus_core::{Converter, Primitive, Value};
///
/// let converter = Converter;
/// let value = converter.as_value(" TRUE ", Primitive::Bool).unwrap();
/// assert_eq!(value, Value::Bool(true));
/// assert_eq!(converter.as_string(&value).unwrap(), "true");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Converter;

impl Converter {
    /// Renders a primitive value as text.
    pub fn as_string(&self, value: &Value) -> Result<String, ConversionError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
            Value::DateTime(dt) => Ok(dt.format(DATETIME_FORMAT).to_string()),
            Value::Date(d) => Ok(d.format(DATE_FORMAT).to_string()),
            Value::Time(t) => Ok(t.format(TIME_FORMAT).to_string()),
            other => Err(ConversionError::Unsupported { kind: other.kind() }),
        }
    }

    /// Parses text into a value of the requested primitive.
    pub fn as_value(&self, text: &str, primitive: Primitive) -> Result<Value, ConversionError> {
        let invalid = || ConversionError::Invalid {
            value: text.to_string(),
            expected: primitive,
        };
        match primitive {
            Primitive::Str => Ok(Value::Str(text.to_string())),
            Primitive::Int => text.trim().parse::<i64>().map(Value::Int).map_err(|_| invalid()),
            Primitive::Float => {
                let parsed = text.trim().parse::<f64>().map_err(|_| invalid())?;
                if parsed.is_finite() {
                    Ok(Value::Float(parsed))
                } else {
                    Err(invalid())
                }
            }
            Primitive::Bool => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            Primitive::DateTime => NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT)
                .map(Value::DateTime)
                .map_err(|_| invalid()),
            Primitive::Date => NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                .map(Value::Date)
                .map_err(|_| invalid()),
            Primitive::Time => NaiveTime::parse_from_str(text.trim(), TIME_FORMAT)
                .map(Value::Time)
                .map_err(|_| invalid()),
        }
    }

    /// Coerces an already typed value into the requested primitive.
    ///
    /// Values of the right variant pass through, integers widen to floats,
    /// and text is parsed.
    pub fn normalize(&self, value: Value, primitive: Primitive) -> Result<Value, ConversionError> {
        match (primitive, value) {
            (_, Value::Null) => Ok(Value::Null),
            (Primitive::Str, v @ Value::Str(_))
            | (Primitive::Int, v @ Value::Int(_))
            | (Primitive::Float, v @ Value::Float(_))
            | (Primitive::Bool, v @ Value::Bool(_))
            | (Primitive::DateTime, v @ Value::DateTime(_))
            | (Primitive::Date, v @ Value::Date(_))
            | (Primitive::Time, v @ Value::Time(_)) => Ok(v),
            (Primitive::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (primitive, Value::Str(text)) => self.as_value(&text, primitive),
            (primitive, other) => {
                let text = self.as_string(&other)?;
                self.as_value(&text, primitive)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bool_parsing() {
        let c = Converter;
        assert_eq!(c.as_value("True", Primitive::Bool).unwrap(), Value::Bool(true));
        assert_eq!(c.as_value(" false\n", Primitive::Bool).unwrap(), Value::Bool(false));
        assert!(c.as_value("yes", Primitive::Bool).is_err());
    }

    #[test]
    fn test_temporal_formats() {
        let c = Converter;
        let dt = c.as_value("2024-02-29T13:05:00Z", Primitive::DateTime).unwrap();
        assert_eq!(c.as_string(&dt).unwrap(), "2024-02-29T13:05:00Z");
        assert!(c.as_value("2024-02-30", Primitive::Date).is_err());
        assert!(c.as_value("25:00:00", Primitive::Time).is_err());
    }

    #[test]
    fn test_float_rejects_non_finite() {
        let c = Converter;
        assert!(c.as_value("inf", Primitive::Float).is_err());
        assert!(c.as_value("NaN", Primitive::Float).is_err());
        assert_eq!(c.as_value("1.5", Primitive::Float).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_composite_values_are_not_text() {
        let c = Converter;
        assert!(c.as_string(&Value::List(vec![])).is_err());
        assert!(c.as_string(&Value::Null).is_err());
    }

    #[test]
    fn test_normalize() {
        let c = Converter;
        assert_eq!(
            c.normalize(Value::Int(2), Primitive::Float).unwrap(),
            Value::Float(2.0)
        );
        assert_eq!(
            c.normalize(Value::from("7"), Primitive::Int).unwrap(),
            Value::Int(7)
        );
        assert_eq!(
            c.normalize(Value::Int(7), Primitive::Str).unwrap(),
            Value::from("7")
        );
    }

    proptest! {
        #[test]
        fn prop_int_round_trip(i in any::<i64>()) {
            let c = Converter;
            let text = c.as_string(&Value::Int(i)).unwrap();
            prop_assert_eq!(c.as_value(&text, Primitive::Int).unwrap(), Value::Int(i));
        }

        #[test]
        fn prop_float_round_trip(f in -1.0e12f64..1.0e12f64) {
            let c = Converter;
            let text = c.as_string(&Value::Float(f)).unwrap();
            prop_assert_eq!(c.as_value(&text, Primitive::Float).unwrap(), Value::Float(f));
        }

        #[test]
        fn prop_str_round_trip(s in ".*") {
            let c = Converter;
            let text = c.as_string(&Value::Str(s.clone())).unwrap();
            prop_assert_eq!(c.as_value(&text, Primitive::Str).unwrap(), Value::Str(s));
        }

        #[test]
        fn prop_datetime_round_trip(secs in 0i64..4_102_444_800i64) {
            let c = Converter;
            let dt = chrono::DateTime::from_timestamp(secs, 0).unwrap().naive_utc();
            let text = c.as_string(&Value::DateTime(dt)).unwrap();
            prop_assert_eq!(c.as_value(&text, Primitive::DateTime).unwrap(), Value::DateTime(dt));
        }

        #[test]
        fn prop_date_round_trip(days in 0i64..100_000i64) {
            let c = Converter;
            let date = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap() + chrono::Days::new(days as u64);
            let text = c.as_string(&Value::Date(date)).unwrap();
            prop_assert_eq!(c.as_value(&text, Primitive::Date).unwrap(), Value::Date(date));
        }

        #[test]
        fn prop_time_round_trip(secs in 0u32..86_400u32) {
            let c = Converter;
            let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap();
            let text = c.as_string(&Value::Time(time)).unwrap();
            prop_assert_eq!(c.as_value(&text, Primitive::Time).unwrap(), Value::Time(time));
        }
    }
}
