//! Recovers transactions from a table of text cells.
//!
//! Statement tables differ in column count and alignment, so rows are anchored on two things
//! that hold across layouts: a transaction row opens with a date, and it ends in its money
//! cells. With a single money cell that cell is the amount; with two or more, the rightmost is
//! the running balance and the one before it is the amount, the same order the line layout
//! uses.

use crate::extract::lexical::{looks_like_date, looks_like_money, parse_money};
use crate::model::ActivityRecord;
use tracing::trace;

/// One table: rows of cells, where a cell may be missing.
pub type Table = Vec<Vec<Option<String>>>;

/// The records recovered from a table along with the number of rows that were candidates.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct TableOutcome {
    pub records: Vec<ActivityRecord>,
    /// Rows that opened with a date and were therefore considered transactions.
    pub attempted: usize,
}

/// Extracts every transaction row from `table`.
pub fn extract_table(table: &[Vec<Option<String>>]) -> TableOutcome {
    let mut outcome = TableOutcome::default();
    for raw_row in table {
        let row: Vec<String> = raw_row
            .iter()
            .map(|cell| cell.as_deref().unwrap_or_default().trim().to_string())
            .collect();
        if row.is_empty() || is_header(&row) || !looks_like_date(&row[0]) {
            continue;
        }
        outcome.attempted += 1;
        match extract_row(&row) {
            Some(record) => outcome.records.push(record),
            None => trace!("Skipping table row without a usable amount: {row:?}"),
        }
    }
    outcome
}

fn is_header(row: &[String]) -> bool {
    let joined = row.join(" ").to_lowercase();
    joined.contains("date") && joined.contains("description")
}

/// Turns one normalized row that opens with a date into a record.
fn extract_row(row: &[String]) -> Option<ActivityRecord> {
    let transaction_date = &row[0];
    let mut ix = 1;

    let mut post_date = "";
    if ix < row.len() && looks_like_date(&row[ix]) {
        post_date = &row[ix];
        ix += 1;
    }

    while ix < row.len() && row[ix].is_empty() {
        ix += 1;
    }

    let mut parts: Vec<&str> = Vec::new();
    while ix < row.len() && !looks_like_money(&row[ix]) {
        if !row[ix].is_empty() {
            parts.push(&row[ix]);
        }
        ix += 1;
    }
    let mut description = parts.join(" ").trim().to_string();
    if description.is_empty() && row.len() > 2 {
        description = row[1..row.len() - 1]
            .iter()
            .filter(|c| !c.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
    }

    let money: Vec<usize> = row
        .iter()
        .enumerate()
        .filter(|(_, cell)| looks_like_money(cell))
        .map(|(i, _)| i)
        .collect();
    let (amount_ix, balance_ix) = match money.as_slice() {
        [] => return None,
        [only] => (*only, None),
        [.., amount, balance] => (*amount, Some(*balance)),
    };

    let amount = parse_money(&row[amount_ix])?;
    let balance = balance_ix.and_then(|i| parse_money(&row[i]));

    Some(ActivityRecord::new(
        transaction_date.as_str(),
        post_date,
        description,
        amount,
        balance,
        row.join(" | "),
    ))
}
