//! Matching merchants against a rule set.

use crate::model::RuleSet;
use crate::{utils, Result};
use anyhow::Context;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// The header of the unmatched merchants report.
pub const UNMATCHED_HEADERS: [&str; 2] = ["Merchant", "Count"];

/// Trims `merchant` and collapses each run of inner whitespace to a single space.
pub fn normalize_merchant(merchant: &str) -> String {
    merchant.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A read-only view of a `RuleSet` prepared for matching.
///
/// Exact and learned keys are normalized and patterns are compiled once, case-insensitively. A
/// pattern that does not compile is left out of the snapshot, but it stays in the `RuleSet` it
/// came from.
#[derive(Debug, Clone, Default)]
pub struct RuleSnapshot {
    exact: BTreeMap<String, String>,
    learned: BTreeMap<String, String>,
    raw_to_canonical: BTreeMap<String, String>,
    patterns: Vec<CompiledPattern>,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    regex: Regex,
    canonical: Option<String>,
    category: Option<String>,
}

impl RuleSnapshot {
    pub fn new(rules: &RuleSet) -> Self {
        let exact = rules
            .merchant_categories()
            .into_iter()
            .map(|(canonical, category)| (normalize_merchant(canonical), category.to_string()))
            .collect();
        let learned = rules
            .raw_to_canonical()
            .iter()
            .map(|(raw, canonical)| (normalize_merchant(raw), canonical.clone()))
            .collect();

        let mut patterns = Vec::new();
        for rule in rules.patterns() {
            if rule.pattern().is_empty() {
                continue;
            }
            match RegexBuilder::new(rule.pattern())
                .case_insensitive(true)
                .build()
            {
                Ok(regex) => patterns.push(CompiledPattern {
                    regex,
                    canonical: rule.canonical().map(str::to_string),
                    category: rule.category().map(str::to_string),
                }),
                Err(e) => warn!("Ignoring the pattern '{}': {e}", rule.pattern()),
            }
        }
        debug!(
            "Prepared {} exact rules, {} learned mappings and {} patterns",
            rules.merchant_categories().len(),
            rules.raw_to_canonical().len(),
            patterns.len()
        );

        Self {
            exact,
            learned,
            raw_to_canonical: rules.raw_to_canonical().clone(),
            patterns,
        }
    }

    /// Finds the label for `merchant`.
    ///
    /// The exact rules are consulted first, then the canonical merchant learned for this raw
    /// text, then the patterns in order. A matching pattern gives its category, or failing that
    /// the category of its canonical merchant, or failing that the canonical merchant itself.
    pub fn categorize(&self, merchant: &str) -> Option<String> {
        let merchant = normalize_merchant(merchant);

        if let Some(category) = self.exact.get(&merchant) {
            return Some(category.clone());
        }

        if let Some(category) = self
            .learned
            .get(&merchant)
            .and_then(|canonical| self.exact_category(canonical))
        {
            return Some(category.to_string());
        }

        for pattern in &self.patterns {
            if !pattern.regex.is_match(&merchant) {
                continue;
            }
            if let Some(category) = &pattern.category {
                return Some(category.clone());
            }
            if let Some(canonical) = &pattern.canonical {
                let label = self.exact_category(canonical).unwrap_or(canonical.as_str());
                return Some(label.to_string());
            }
        }
        None
    }

    /// The category of the exact rule for `canonical`, if there is one.
    pub fn exact_category(&self, canonical: &str) -> Option<&str> {
        self.exact
            .get(&normalize_merchant(canonical))
            .map(String::as_str)
    }

    /// The canonical merchant stored for the raw description `raw`.
    pub fn canonical_for_raw(&self, raw: &str) -> Option<&str> {
        self.raw_to_canonical.get(raw.trim()).map(String::as_str)
    }

    /// Suggests a canonical merchant for `raw` from the first pattern that matches it. A
    /// pattern that names no canonical merchant suggests the raw text itself.
    pub fn suggest_canonical(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(raw))
            .map(|p| p.canonical.clone().unwrap_or_else(|| raw.to_string()))
    }
}

/// Finds the label for `merchant` in `rules`. See `RuleSnapshot::categorize`.
pub fn categorize(merchant: &str, rules: &RuleSnapshot) -> Option<String> {
    rules.categorize(merchant)
}

/// Counts merchants that could not be categorized.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct UnmatchedTally {
    counts: BTreeMap<String, u64>,
}

impl UnmatchedTally {
    /// Counts one occurrence of `merchant`. Blank merchants are not counted.
    pub fn record(&mut self, merchant: &str) {
        let merchant = normalize_merchant(merchant);
        if merchant.is_empty() {
            return;
        }
        *self.counts.entry(merchant).or_default() += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The merchants and their counts, most frequent first and then alphabetically.
    pub fn report(&self) -> Vec<(&str, u64)> {
        let mut rows: Vec<(&str, u64)> = self
            .counts
            .iter()
            .map(|(merchant, count)| (merchant.as_str(), *count))
            .collect();
        // `counts` iterates alphabetically and the sort is stable.
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows
    }

    /// Writes the report as a `Merchant,Count` CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(UNMATCHED_HEADERS)
            .context("Unable to write unmatched merchants header")?;
        for (merchant, count) in self.report() {
            wtr.write_record([merchant, count.to_string().as_str()])
                .with_context(|| format!("Unable to write unmatched merchant '{merchant}'"))?;
        }
        let data = wtr
            .into_inner()
            .context("Unable to flush unmatched merchants CSV")?;
        utils::write_atomic(path, data)
    }
}
