//! Conversion of raw field values into typed data points

use kairosdb_core::datapoint::DataPoint;
use kairosdb_core::error::{KairosError, KairosResult};
use kairosdb_core::time::Timestamp;

/// Type a raw field value, in order of precedence:
///
/// 1. trailing `i`: signed 64-bit integer
/// 2. wrapped in double quotes: text with the outer quotes removed
/// 3. `t`/`true`, `f`/`false` in any case: integer 1 or 0
/// 4. anything else: 64-bit float
pub fn parse_field_value(timestamp: Timestamp, raw: &str) -> KairosResult<DataPoint> {
    if let Some(digits) = raw.strip_suffix('i') {
        return digits
            .parse::<i64>()
            .map(|value| DataPoint::new_long(timestamp, value))
            .map_err(|_| unparseable(raw));
    }

    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Ok(DataPoint::new_text(timestamp, &raw[1..raw.len() - 1]));
    }

    if let Some(flag) = parse_bool(raw) {
        return Ok(DataPoint::new_long(timestamp, i64::from(flag)));
    }

    if !is_decimal_literal(raw) {
        return Err(unparseable(raw));
    }

    raw.parse::<f64>()
        .map(|value| DataPoint::new_double(timestamp, value))
        .map_err(|_| unparseable(raw))
}

/// Digits with optional sign, point and exponent. Rules out `inf` and `nan`.
fn is_decimal_literal(raw: &str) -> bool {
    raw.bytes().any(|b| b.is_ascii_digit())
        && raw
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-' | b'e' | b'E'))
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("t") || raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("f") || raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn unparseable(raw: &str) -> KairosError {
    KairosError::parse(format!("Unable to parse field value: {}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairosdb_core::datapoint::DataPointValue;

    fn value(raw: &str) -> DataPointValue {
        parse_field_value(Timestamp::from_millis(1), raw).unwrap().value
    }

    #[test]
    fn test_integers() {
        assert_eq!(value("42i"), DataPointValue::Long(42));
        assert_eq!(value("-7i"), DataPointValue::Long(-7));
        assert_eq!(value("9223372036854775807i"), DataPointValue::Long(i64::MAX));
    }

    #[test]
    fn test_text() {
        assert_eq!(value(r#""hi""#), DataPointValue::Text("hi".to_string()));
        assert_eq!(value(r#""""#), DataPointValue::Text(String::new()));
        assert_eq!(
            value(r#""7 days, 5:46""#),
            DataPointValue::Text("7 days, 5:46".to_string())
        );
    }

    #[test]
    fn test_booleans() {
        for raw in ["t", "T", "true", "True", "TRUE"] {
            assert_eq!(value(raw), DataPointValue::Long(1), "{}", raw);
        }
        for raw in ["f", "F", "false", "False", "FALSE"] {
            assert_eq!(value(raw), DataPointValue::Long(0), "{}", raw);
        }
    }

    #[test]
    fn test_floats() {
        assert_eq!(value("3.5").as_f64(), Some(3.5));
        assert_eq!(value("-1e3").as_f64(), Some(-1000.0));
        assert_eq!(value("2").as_f64(), Some(2.0));
        assert_eq!(value("2").type_name(), "double");
    }

    #[test]
    fn test_timestamp_is_carried() {
        let dp = parse_field_value(Timestamp::from_millis(1234), "1i").unwrap();
        assert_eq!(dp.timestamp_millis(), 1234);
    }

    #[test]
    fn test_unparseable_values() {
        for raw in [
            "abc", "1.5i", "i", "\"", "yes", "", "inf", "-inf", "Infinity", "NaN", "nan", "e",
        ] {
            let err = parse_field_value(Timestamp::from_millis(0), raw).unwrap_err();
            assert!(matches!(err, KairosError::Parse(_)), "{}", raw);
            assert_eq!(err.message(), format!("Unable to parse field value: {}", raw));
        }
    }
}
