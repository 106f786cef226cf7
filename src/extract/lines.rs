//! Recovers transactions from the plain text of a page, one line at a time.
//!
//! This is the fallback for statements whose tables could not be recovered. A line is a
//! transaction only if the whole line fits `<date> [<date>] <description> <amount> [<balance>]`;
//! everything else (headers, totals, page furniture) is skipped.

use crate::extract::lexical::{looks_like_date, parse_money, DATE_PATTERN};
use crate::model::ActivityRecord;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// A signed, optionally parenthesized, optionally dollar-prefixed number with cents.
const MONEY_PATTERN: &str = r"-?\(?\$?\d[\d,]*\.\d{2}\)?";

// The description is lazy so that trailing numbers are claimed by amount and balance first.
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<tran_date>{DATE_PATTERN})\s+(?:(?P<post_date>{DATE_PATTERN})\s+)?(?P<desc>.*?)\s+(?P<amount>{MONEY_PATTERN})(?:\s+(?P<balance>{MONEY_PATTERN}))?\s*$"
    ))
    .expect("valid transaction line regex")
});

/// The records recovered from a page of text along with the number of candidate lines.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct LinesOutcome {
    pub records: Vec<ActivityRecord>,
    /// Lines that opened with a date token.
    pub attempted: usize,
}

/// Extracts every transaction line from `lines`.
pub fn extract_lines<S: AsRef<str>>(lines: &[S]) -> LinesOutcome {
    let mut outcome = LinesOutcome::default();
    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        let opens_with_date = line
            .split_whitespace()
            .next()
            .is_some_and(looks_like_date);
        if opens_with_date {
            outcome.attempted += 1;
        }
        match extract_line(line) {
            Some(record) => outcome.records.push(record),
            None if opens_with_date => trace!("Skipping line that is not a transaction: {line}"),
            None => {}
        }
    }
    outcome
}

fn extract_line(line: &str) -> Option<ActivityRecord> {
    let caps = LINE_RE.captures(line)?;
    let group = |name: &str| caps.name(name).map(|m| m.as_str().trim()).unwrap_or_default();

    let amount = parse_money(group("amount"))?;
    let balance = match group("balance") {
        "" => None,
        text => parse_money(text),
    };

    Some(ActivityRecord::new(
        group("tran_date"),
        group("post_date"),
        group("desc"),
        amount,
        balance,
        line,
    ))
}
