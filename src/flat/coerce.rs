//! Text to value conversions behind `Value::set_text`.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::CoercionError;
use crate::schema::{Kind, Node};

pub(crate) fn parse_string(raw: &str) -> Result<String, CoercionError> {
    Ok(raw.to_string())
}

/// Accepts the same spellings as Go's `strconv.ParseBool`.
pub(crate) fn parse_bool(raw: &str) -> Result<bool, CoercionError> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(CoercionError::invalid(
            Kind::Bool,
            raw,
            "expected true or false",
        )),
    }
}

pub(crate) fn parse_signed<T: TryFrom<i128>>(raw: &str) -> Result<T, CoercionError> {
    let (negative, magnitude) = parse_magnitude(raw, Kind::Int)?;
    let value = if negative {
        0i128.checked_sub_unsigned(magnitude)
    } else {
        i128::try_from(magnitude).ok()
    };
    value
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| CoercionError::invalid(Kind::Int, raw, "value out of range"))
}

pub(crate) fn parse_unsigned<T: TryFrom<u128>>(raw: &str) -> Result<T, CoercionError> {
    let (negative, magnitude) = parse_magnitude(raw, Kind::Uint)?;
    if negative {
        return Err(CoercionError::invalid(
            Kind::Uint,
            raw,
            "negative value for unsigned field",
        ));
    }
    T::try_from(magnitude)
        .map_err(|_| CoercionError::invalid(Kind::Uint, raw, "value out of range"))
}

pub(crate) fn parse_float<T>(raw: &str) -> Result<T, CoercionError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|e| CoercionError::invalid(Kind::Float, raw, e))
}

/// Comma separated list; elements are trimmed and coerced individually.
pub(crate) fn parse_list<T: Node>(raw: &str) -> Result<Vec<T>, CoercionError> {
    raw.split(',').map(|part| T::parse_text(part.trim())).collect()
}

/// Sign and magnitude of an integer literal with an optional base prefix
/// (`0x`, `0o`, `0b`, leading `0` for octal) and `_` digit separators.
fn parse_magnitude(raw: &str, kind: Kind) -> Result<(bool, u128), CoercionError> {
    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let (radix, digits) = split_radix(body);
    if !digits.starts_with(|c: char| c.is_ascii_alphanumeric())
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return Err(CoercionError::invalid(kind, raw, "invalid syntax"));
    }

    let cleaned = digits.replace('_', "");
    u128::from_str_radix(&cleaned, radix)
        .map(|magnitude| (negative, magnitude))
        .map_err(|e| CoercionError::invalid(kind, raw, e))
}

fn split_radix(body: &str) -> (u32, &str) {
    let prefix = body.get(..2).map(str::to_ascii_lowercase);
    match prefix.as_deref() {
        Some("0x") => (16, &body[2..]),
        Some("0o") => (8, &body[2..]),
        Some("0b") => (2, &body[2..]),
        _ if body.len() > 1 && body.starts_with('0') => (8, &body[1..]),
        _ => (10, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_spellings() {
        for raw in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(parse_bool(raw), Ok(true), "{raw}");
        }
        for raw in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(parse_bool(raw), Ok(false), "{raw}");
        }
        assert!(parse_bool("yes").is_err());
        assert!(parse_bool("").is_err());
    }

    #[test]
    fn test_parse_signed_bases() {
        assert_eq!(parse_signed::<i64>("42"), Ok(42));
        assert_eq!(parse_signed::<i64>("-42"), Ok(-42));
        assert_eq!(parse_signed::<i64>("+7"), Ok(7));
        assert_eq!(parse_signed::<i64>("0x1F"), Ok(31));
        assert_eq!(parse_signed::<i64>("0o17"), Ok(15));
        assert_eq!(parse_signed::<i64>("017"), Ok(15));
        assert_eq!(parse_signed::<i64>("0b101"), Ok(5));
        assert_eq!(parse_signed::<i64>("1_000_000"), Ok(1_000_000));
        assert_eq!(parse_signed::<i64>("0"), Ok(0));
    }

    #[test]
    fn test_parse_signed_width_limits() {
        assert_eq!(parse_signed::<i8>("127"), Ok(127));
        assert_eq!(parse_signed::<i8>("-128"), Ok(-128));
        assert!(parse_signed::<i8>("128").is_err());
        assert!(parse_signed::<i8>("-129").is_err());
        assert_eq!(
            parse_signed::<i128>("-170141183460469231731687303715884105728"),
            Ok(i128::MIN)
        );
    }

    #[test]
    fn test_parse_signed_rejects_malformed() {
        for raw in ["", "-", "abc", "1.5", "0x", "--1", "0x-1", "1__0", "10_", "_10"] {
            assert!(parse_signed::<i64>(raw).is_err(), "{raw:?}");
        }
    }

    #[test]
    fn test_parse_unsigned() {
        assert_eq!(parse_unsigned::<u8>("255"), Ok(255));
        assert!(parse_unsigned::<u8>("256").is_err());
        assert!(parse_unsigned::<u32>("-1").is_err());
        assert_eq!(parse_unsigned::<u32>("0xff"), Ok(255));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float::<f64>("1.5"), Ok(1.5));
        assert_eq!(parse_float::<f64>("-2e3"), Ok(-2000.0));
        assert_eq!(parse_float::<f32>("0.25"), Ok(0.25));
        let err = parse_float::<f64>("1,5").unwrap_err();
        assert!(matches!(err, CoercionError::Invalid { kind: Kind::Float, .. }));
    }

    #[test]
    fn test_parse_list_trims_elements() {
        let hosts: Vec<String> = parse_list(" a , b,c ").unwrap();
        assert_eq!(hosts, vec!["a", "b", "c"]);

        let ports: Result<Vec<u16>, _> = parse_list("80, nope");
        assert!(ports.is_err());
    }
}
