//! Lenient conversion of form text into numbers.
//!
//! Every numeric field typed by the operator goes through these helpers before
//! it reaches the store. They never fail: unparsable text yields the default.

use crate::error::{PayrollError, PayrollResult};

/// Parse `text` as a real number, or return `default`.
pub fn parse_decimal(text: &str, default: f64) -> f64 {
    text.trim().parse::<f64>().unwrap_or(default)
}

/// Parse `text` as a real number and truncate it toward zero, so "12.9" is 12.
pub fn parse_integer(text: &str, default: i64) -> i64 {
    parse_truncated(text).unwrap_or(default)
}

/// Parse a row identity. `None` when the field is blank or not a number.
pub fn parse_id(text: &str) -> Option<i64> {
    parse_truncated(text)
}

fn parse_truncated(text: &str) -> Option<i64> {
    let value = text.trim().parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.trunc() as i64)
}

/// Trim a required text field, rejecting it when nothing is left.
pub fn required_text(text: &str, field: &str) -> PayrollResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PayrollError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_truncates_real_input() {
        assert_eq!(parse_integer("12.9", 0), 12);
        assert_eq!(parse_integer("-3.7", 0), -3);
        assert_eq!(parse_integer(" 25 ", 0), 25);
    }

    #[test]
    fn integer_falls_back_to_default() {
        assert_eq!(parse_integer("", 7), 7);
        assert_eq!(parse_integer("twelve", 7), 7);
        assert_eq!(parse_integer("inf", 7), 7);
        assert_eq!(parse_integer("NaN", 7), 7);
    }

    #[test]
    fn decimal_falls_back_to_default() {
        assert_eq!(parse_decimal("abc", 5.0), 5.0);
        assert_eq!(parse_decimal("", 0.0), 0.0);
        assert_eq!(parse_decimal("30000", 0.0), 30000.0);
        assert_eq!(parse_decimal(" 12.50 ", 0.0), 12.5);
    }

    #[test]
    fn id_is_absent_for_blank_field() {
        assert_eq!(parse_id(""), None);
        assert_eq!(parse_id("x1"), None);
        assert_eq!(parse_id("3"), Some(3));
        assert_eq!(parse_id("3.0"), Some(3));
    }

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("  Asha ", "Name").unwrap(), "Asha");
        let err = required_text("   ", "Month").unwrap_err();
        assert!(matches!(err, PayrollError::Validation(ref m) if m == "Month is required"));
    }
}
