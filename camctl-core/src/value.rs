//! Argument decoding and return value formatting

use crate::error::{Error, Result};

/// Parse an integer argument
pub fn parse_int(arg: &str) -> Result<i64> {
    arg.trim()
        .parse::<i64>()
        .map_err(|_| Error::InvalidArgument(format!("'{}' is not an integer", arg)))
}

/// Parse a floating point argument
pub fn parse_double(arg: &str) -> Result<f64> {
    let value = arg
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::InvalidArgument(format!("'{}' is not a number", arg)))?;

    if !value.is_finite() {
        return Err(Error::InvalidArgument(format!("'{}' is not finite", arg)));
    }
    Ok(value)
}

/// Parse a boolean argument
///
/// Only `true` (any case) is true; everything else is false.
pub fn parse_bool(arg: &str) -> bool {
    arg.trim().eq_ignore_ascii_case("true")
}

/// Parse exactly two integer arguments
pub fn parse_pair(args: &[String]) -> Result<(i64, i64)> {
    if args.len() != 2 {
        return Err(Error::WrongArity {
            expected: 2,
            actual: args.len(),
        });
    }
    Ok((parse_int(&args[0])?, parse_int(&args[1])?))
}

pub fn format_double(value: f64) -> String {
    format!("{:.6}", value)
}

pub fn format_bool(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_bool_case_insensitive() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("True"));
        assert!(!parse_bool("yes"));
        assert!(!parse_bool("1"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42").unwrap(), 42);
        assert_eq!(parse_int(" -7 ").unwrap(), -7);
        assert!(matches!(parse_int("4.2"), Err(Error::InvalidArgument(_))));
        assert!(parse_int("abc").is_err());
    }

    #[test]
    fn test_parse_double() {
        assert_eq!(parse_double("1500.5").unwrap(), 1500.5);
        assert_eq!(parse_double("10").unwrap(), 10.0);
        assert!(parse_double("NaN").is_err());
        assert!(parse_double("inf").is_err());
        assert!(parse_double("fast").is_err());
    }

    #[test]
    fn test_parse_pair_arity() {
        let args = vec!["640".to_string(), "480".to_string()];
        assert_eq!(parse_pair(&args).unwrap(), (640, 480));

        let short = vec!["640".to_string()];
        assert!(matches!(
            parse_pair(&short),
            Err(Error::WrongArity { expected: 2, actual: 1 })
        ));

        let long = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        assert!(parse_pair(&long).is_err());
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_double(1000.0), "1000.000000");
        assert_eq!(format_double(0.1234567), "0.123457");
        assert_eq!(format_bool(true), "True");
        assert_eq!(format_bool(false), "False");
    }
}
