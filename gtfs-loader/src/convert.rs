//! Conversion of raw cell text into typed values
use crate::error::ConversionError;
use crate::field::{FieldSpec, FieldType, ScalarType};
use crate::value::{Value, DATE_FORMAT};
use chrono::NaiveDate;

/// Converts the raw text of a cell according to its field spec
///
/// An empty cell of an optional field takes the field default without any parsing.
/// List fields hold an embedded JSON array, whose items are kept as the JSON literals read.
pub fn convert(spec: &FieldSpec, raw: &str) -> Result<Value, ConversionError> {
    if !spec.required && raw.is_empty() {
        return Ok(spec.default.clone());
    }

    if let FieldType::List(_) = spec.ty {
        return parse_embedded_list(raw);
    }

    convert_scalar(spec.ty.inner(), raw)
}

/// Converts text into a concrete (non optional, non list) type
pub(crate) fn convert_scalar(ty: &FieldType, raw: &str) -> Result<Value, ConversionError> {
    match ty {
        FieldType::Enum(def) => {
            let code = parse_int(raw)?;
            def.member(code).map(Value::Enum).ok_or_else(|| {
                ConversionError::new(raw, format!("{} is not a valid {}", code, def.name))
            })
        }
        FieldType::Scalar(scalar) => parse_scalar(*scalar, raw),
        other => Err(ConversionError::new(
            raw,
            format!("cannot convert text into {}", other),
        )),
    }
}

fn parse_scalar(scalar: ScalarType, raw: &str) -> Result<Value, ConversionError> {
    match scalar {
        ScalarType::Str => Ok(Value::Str(raw.to_owned())),
        ScalarType::Int => parse_int(raw).map(Value::Int),
        ScalarType::Float => raw
            .parse()
            .map(Value::Float)
            .map_err(|e| ConversionError::new(raw, format!("invalid float: {}", e))),
        ScalarType::Bool => match parse_int(raw)? {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            _ => Err(ConversionError::new(raw, "expected 0 or 1")),
        },
        ScalarType::Date => parse_date(raw).map(Value::Date),
        ScalarType::Time => parse_time(raw).map(Value::Time),
        ScalarType::Json => serde_json::from_str(raw)
            .map(Value::Json)
            .map_err(|e| ConversionError::new(raw, format!("invalid json: {}", e))),
    }
}

fn parse_int(raw: &str) -> Result<i64, ConversionError> {
    raw.parse()
        .map_err(|e| ConversionError::new(raw, format!("invalid integer: {}", e)))
}

fn parse_embedded_list(raw: &str) -> Result<Value, ConversionError> {
    match serde_json::from_str(raw) {
        Ok(serde_json::Value::Array(items)) => {
            Ok(Value::List(items.iter().map(Value::from_json).collect()))
        }
        Ok(_) => Err(ConversionError::new(raw, "expected a json array")),
        Err(e) => Err(ConversionError::new(raw, format!("invalid json array: {}", e))),
    }
}

/// Parses a `YYYYMMDD` date
pub fn parse_date(raw: &str) -> Result<NaiveDate, ConversionError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| ConversionError::new(raw, format!("invalid date: {}", e)))
}

/// Parses a `H:MM:SS` time into seconds since midnight. Hours can go past 24.
pub fn parse_time(raw: &str) -> Result<u32, ConversionError> {
    let invalid = || ConversionError::new(raw, "invalid time, H:MM:SS format is expected");
    let mut parts = raw.trim().split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    if m.len() != 2 || s.len() != 2 || h.is_empty() {
        return Err(invalid());
    }
    let hours: u32 = h.parse().map_err(|_| invalid())?;
    let minutes: u32 = m.parse().map_err(|_| invalid())?;
    let seconds: u32 = s.parse().map_err(|_| invalid())?;
    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }
    hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{ExceptionType, TransferType};

    fn required(ty: FieldType) -> FieldSpec {
        FieldSpec::required(ty)
    }

    #[test]
    fn empty_optional_takes_default() {
        let spec = FieldSpec::optional(FieldType::FLOAT, Value::Float(-1.0));
        assert_eq!(Value::Float(-1.0), convert(&spec, "").unwrap());
        let spec = FieldSpec::optional(FieldType::optional(FieldType::FLOAT), Value::Null);
        assert_eq!(Value::Null, convert(&spec, "").unwrap());
        assert_eq!(Value::Float(45.5), convert(&spec, "45.5").unwrap());
    }

    #[test]
    fn embedded_list() {
        let spec = required(FieldType::list(FieldType::INT));
        let value = convert(&spec, "[1,2,3]").unwrap();
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            value
        );
        assert_eq!("[1,2,3]", value.to_string());

        let err = convert(&spec, "[1,2").unwrap_err();
        assert_eq!("[1,2", err.raw);
        assert!(convert(&spec, "{}").is_err());
    }

    #[test]
    fn bool_codes() {
        let spec = required(FieldType::BOOL);
        let value = convert(&spec, "1").unwrap();
        assert_eq!(Value::Bool(true), value);
        assert_eq!("1", value.to_string());
        assert_eq!(Value::Bool(false), convert(&spec, "0").unwrap());
        assert!(convert(&spec, "true").is_err());
        assert!(convert(&spec, "2").is_err());
    }

    #[test]
    fn enum_codes() {
        let spec = required(FieldType::Enum(&TransferType::DEF));
        let value = convert(&spec, "2").unwrap();
        assert_eq!(Some(2), value.as_enum().map(|e| e.code));
        assert_eq!("2", value.to_string());

        let spec = required(FieldType::Enum(&ExceptionType::DEF));
        let err = convert(&spec, "9").unwrap_err();
        assert_eq!("9", err.raw);
        assert!(convert(&spec, "x").is_err());
    }

    #[test]
    fn times_past_midnight() {
        assert_eq!(3600 + 60 + 1, parse_time("01:01:01").unwrap());
        assert_eq!(8 * 3600, parse_time("8:00:00").unwrap());
        assert_eq!(25 * 3600 + 30 * 60, parse_time("25:30:00").unwrap());
        assert!(parse_time("25:30").is_err());
        assert!(parse_time("10:61:00").is_err());
    }

    #[test]
    fn times_too_large() {
        assert_eq!(u32::MAX, parse_time("1193046:28:15").unwrap());
        assert!(parse_time("1193046:28:16").is_err());
        assert!(parse_time("4294967:00:00").is_err());
        assert!(parse_time("99999999999:00:00").is_err());
    }

    #[test]
    fn dates() {
        let spec = required(FieldType::DATE);
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()),
            convert(&spec, "20240309").unwrap()
        );
        assert!(convert(&spec, "2024-03-09").is_err());
    }

    #[test]
    fn strings_pass_through() {
        let spec = required(FieldType::STR);
        assert_eq!(Value::Str("A 1".to_owned()), convert(&spec, "A 1").unwrap());
    }
}
