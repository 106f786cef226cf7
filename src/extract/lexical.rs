//! Recognizers for the date and money tokens that anchor statement rows.

use crate::model::Amount;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

/// `MM/DD/YY` or `MM/DD/YYYY`, slashes only.
pub(crate) const DATE_PATTERN: &str = r"\d{1,2}/\d{1,2}/\d{2,4}";

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{DATE_PATTERN}$")).expect("valid date regex"));

static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\$?\d{1,3}(?:,\d{3})*(?:\.\d{2})?$").expect("valid money regex")
});

/// True if the trimmed token is a slash-separated date such as `3/1/24` or `03/01/2024`.
pub fn looks_like_date(token: &str) -> bool {
    DATE_RE.is_match(token.trim())
}

/// True if the trimmed token looks like a dollar amount: an optional minus, an optional `$`,
/// digits grouped by commas in threes and an optional two-digit fraction.
///
/// Parenthesized negatives are not recognized here; see `parse_money`.
pub fn looks_like_money(token: &str) -> bool {
    MONEY_RE.is_match(token.trim())
}

/// Parses a money token, returning `None` for anything that is not money. Callers treat `None`
/// as "not money" and skip the value.
pub fn parse_money(token: &str) -> Option<Amount> {
    Amount::from_str(token).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_date() {
        assert!(looks_like_date("03/01/24"));
        assert!(looks_like_date(" 3/1/2024 "));
        assert!(!looks_like_date("03-01-24"));
        assert!(!looks_like_date("03/01"));
        assert!(!looks_like_date("03/01/24 COFFEE"));
        assert!(!looks_like_date("Date"));
    }

    #[test]
    fn test_looks_like_money() {
        assert!(looks_like_money("45.00"));
        assert!(looks_like_money("1,200.00"));
        assert!(looks_like_money("-$1,234.56"));
        assert!(looks_like_money("$7"));
        assert!(!looks_like_money("1200,00"));
        assert!(!looks_like_money("(45.00)"));
        assert!(!looks_like_money("45.0"));
        assert!(!looks_like_money("COFFEE"));
        assert!(!looks_like_money(""));
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("(123.45)").unwrap().to_string(), "-123.45");
        assert_eq!(parse_money("$1,234.56").unwrap().to_string(), "1234.56");
        assert_eq!(parse_money("-$1,234.56").unwrap().to_string(), "-1234.56");
        assert!(parse_money("abc").is_none());
        assert!(parse_money("").is_none());
    }

    #[test]
    fn test_parse_money_is_idempotent() {
        for s in ["0.99", "1,000", "(2,500.10)", "$12.00", "-3.50"] {
            let first = parse_money(s).unwrap();
            let again = parse_money(&first.to_string()).unwrap();
            assert_eq!(first, again);
        }
    }
}
