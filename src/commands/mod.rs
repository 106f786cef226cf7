//! Command handlers for the stmtcat CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod activity;
mod categorize;
mod init;
mod learn;

use crate::extract::ACTIVITY_SUFFIX;
use crate::Result;
use anyhow::{bail, Context};
use serde::Serialize;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use activity::{activity, ActivitySummary};
pub use categorize::{categorize, CategorizeSummary};
pub use init::{init, InitSummary};
pub use learn::{learn, LearnSummary};

/// The suffix of the CSV written by `categorize` and `learn`.
const CATEGORIZED_SUFFIX: &str = ".categorized.csv";

/// The suffix of the unmatched merchants report.
const UNMATCHED_SUFFIX: &str = ".unmatched_merchants.csv";

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Places a file named after `input` next to it, replacing its `.activity.csv` or `.csv` ending
/// with `suffix`.
fn sibling_path(input: &Path, suffix: &str) -> Result<PathBuf> {
    let name = input
        .file_name()
        .with_context(|| format!("The path '{}' has no file name", input.display()))?
        .to_string_lossy()
        .to_string();
    let stem = name
        .strip_suffix(ACTIVITY_SUFFIX)
        .or_else(|| name.strip_suffix(".csv"))
        .unwrap_or(name.as_str());
    Ok(input.with_file_name(format!("{stem}{suffix}")))
}

/// Finds the first of `names` among `headers`.
fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|h| h.trim() == *name))
}

/// Like `find_column`, but a missing column is an error naming the file and the headers it has.
fn require_column(path: &Path, headers: &csv::StringRecord, names: &[&str]) -> Result<usize> {
    match find_column(headers, names) {
        Some(ix) => Ok(ix),
        None => bail!(
            "{} does not have a '{}' column; headers={:?}",
            path.display(),
            names.join("' or '"),
            headers.iter().collect::<Vec<_>>()
        ),
    }
}

/// Reads a CSV file into its header and rows.
fn read_csv(path: &Path) -> Result<(csv::StringRecord, Vec<csv::StringRecord>)> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Unable to open {}", path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("Unable to read the header of {}", path.display()))?
        .clone();
    let mut rows = Vec::new();
    for result in rdr.records() {
        rows.push(result.with_context(|| format!("Malformed row in {}", path.display()))?);
    }
    Ok((headers, rows))
}

/// Renders a header and rows as CSV and writes the file in one step.
fn write_csv<I>(path: &Path, headers: &csv::StringRecord, rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(headers)
        .with_context(|| format!("Unable to write the header of {}", path.display()))?;
    for row in rows {
        wtr.write_record(&row)
            .with_context(|| format!("Unable to write a row of {}", path.display()))?;
    }
    let data = wtr
        .into_inner()
        .with_context(|| format!("Unable to flush {}", path.display()))?;
    crate::utils::write_atomic(path, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_path() {
        let p = Path::new("/data/march.activity.csv");
        assert_eq!(
            sibling_path(p, CATEGORIZED_SUFFIX).unwrap(),
            PathBuf::from("/data/march.categorized.csv")
        );
        assert_eq!(
            sibling_path(Path::new("export.csv"), UNMATCHED_SUFFIX).unwrap(),
            PathBuf::from("export.unmatched_merchants.csv")
        );
        assert_eq!(
            sibling_path(Path::new("notes"), CATEGORIZED_SUFFIX).unwrap(),
            PathBuf::from("notes.categorized.csv")
        );
    }

    #[test]
    fn test_require_column() {
        let headers = csv::StringRecord::from(vec!["Date", "description", "Amount"]);
        let path = Path::new("in.csv");
        assert_eq!(
            require_column(path, &headers, &["Description", "description"]).unwrap(),
            1
        );
        let err = require_column(path, &headers, &["Category"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"in.csv does not have a 'Category' column; headers=["Date", "description", "Amount"]"#
        );
    }
}
