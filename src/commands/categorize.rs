use crate::args::CategorizeArgs;
use crate::categorize::{RuleSnapshot, UnmatchedTally};
use crate::commands::{
    read_csv, require_column, sibling_path, write_csv, Out, CATEGORIZED_SUFFIX, UNMATCHED_SUFFIX,
};
use crate::model::{CategoryRegistry, RuleSet};
use crate::{utils, Config, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

const CATEGORY: &str = "Category";
const MERCHANT_COLUMNS: [&str; 3] = ["Merchant", "Description", "description"];

/// What the `categorize` command produced.
#[derive(Debug, Clone, Serialize)]
pub struct CategorizeSummary {
    pub out: PathBuf,
    pub unmatched: PathBuf,
    pub rows: usize,
    /// Rows that already had a category and were copied unchanged.
    pub kept: usize,
    /// Rows that were given the fallback category.
    pub uncategorized: usize,
    pub unmatched_merchants: usize,
}

/// Fills in the empty `Category` cells of a CSV using the rules, and writes a report of the
/// merchants that got the fallback category.
///
/// Rows that already have a category are copied unchanged, so running this on its own output
/// changes nothing. A label that is not in the categories file is replaced by the fallback
/// category.
///
/// # Errors
/// - The input, rules or categories file does not exist.
/// - The input has no `Category` column, or no `Merchant`/`Description` column.
pub fn categorize(config: &Config, args: &CategorizeArgs) -> Result<Out<CategorizeSummary>> {
    let input = args.input();
    let rules_path = args
        .rules()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.rules_path());
    let categories_path = args
        .categories()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.categories_path());
    utils::require_file(input, "Input")?;
    utils::require_file(&rules_path, "Rules file")?;
    utils::require_file(&categories_path, "Categories file")?;

    let out = match args.out() {
        Some(p) => p.to_path_buf(),
        None => sibling_path(input, CATEGORIZED_SUFFIX)?,
    };
    let unmatched_path = match args.unmatched() {
        Some(p) => p.to_path_buf(),
        None => sibling_path(input, UNMATCHED_SUFFIX)?,
    };

    let rules = RuleSnapshot::new(&RuleSet::load(&rules_path)?);
    let mut registry = CategoryRegistry::default();
    registry.parse_categories(&utils::read(&categories_path)?);
    let fallback = config.fallback_category();

    let (headers, rows) = read_csv(input)?;
    let category_ix = require_column(input, &headers, &[CATEGORY])?;
    let merchant_ix = require_column(input, &headers, &MERCHANT_COLUMNS)?;

    let mut tally = UnmatchedTally::default();
    let mut kept = 0;
    let mut uncategorized = 0;
    let mut output = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut fields: Vec<String> = row.iter().map(str::to_string).collect();
        let existing = fields.get(category_ix).map(|c| c.trim()).unwrap_or_default();
        if !existing.is_empty() {
            kept += 1;
            output.push(fields);
            continue;
        }

        let merchant = row.get(merchant_ix).unwrap_or_default();
        let label = rules
            .categorize(merchant)
            .filter(|label| registry.contains(label))
            .unwrap_or_else(|| fallback.to_string());
        if label == fallback {
            debug!("No category for '{merchant}'");
            uncategorized += 1;
            tally.record(merchant);
        }
        if let Some(cell) = fields.get_mut(category_ix) {
            *cell = label;
        }
        output.push(fields);
    }

    write_csv(&out, &headers, output)?;
    tally.write_csv(&unmatched_path)?;

    let summary = CategorizeSummary {
        out,
        unmatched: unmatched_path,
        rows: rows.len(),
        kept,
        uncategorized,
        unmatched_merchants: tally.report().len(),
    };
    Ok(Out::new(
        format!(
            "Categorized {} rows into {}, {} left as {fallback}",
            summary.rows,
            summary.out.display(),
            summary.uncategorized
        ),
        summary,
    ))
}
