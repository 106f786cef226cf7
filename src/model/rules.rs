//! The persisted rule set that maps raw descriptions to canonical merchants and canonical
//! merchants to categories.

use crate::{utils, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const RULES_VERSION: u32 = 1;
const MERCHANTS: &str = "merchants";

/// The rule set as stored in `rules.json`.
///
/// Example:
/// ```json
/// {
///   "exact": { "Blue Bottle": { "category": "Coffee" } },
///   "patterns": [ { "canonical": "Shell", "pattern": "^SHELL OIL" } ],
///   "raw_to_canonical": { "BLUE BOTTLE COFFEE #12": "Blue Bottle" },
///   "rules_version": 1
/// }
/// ```
///
/// Older files keep their merchant rules under `merchants`, whose values may be plain category
/// strings, and their version under `version`. Both keys may sit next to `exact` and
/// `rules_version`. They are read for matching, where `exact` wins on a clash, and are written
/// back exactly as they were found, like any other key this program does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    exact: BTreeMap<String, ExactRule>,
    /// Parsed from the `merchants` entry of `other_fields`.
    #[serde(skip)]
    merchants: BTreeMap<String, ExactRule>,
    #[serde(default)]
    patterns: Vec<PatternRule>,
    #[serde(default)]
    raw_to_canonical: BTreeMap<String, String>,
    #[serde(default = "default_version")]
    rules_version: u32,
    #[serde(flatten)]
    other_fields: BTreeMap<String, serde_json::Value>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            exact: BTreeMap::new(),
            merchants: BTreeMap::new(),
            patterns: Vec::new(),
            raw_to_canonical: BTreeMap::new(),
            rules_version: RULES_VERSION,
            other_fields: BTreeMap::new(),
        }
    }
}

fn default_version() -> u32 {
    RULES_VERSION
}

impl RuleSet {
    /// Loads and normalizes a rules file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut rules: RuleSet = utils::deserialize(path)?;
        rules
            .normalize()
            .with_context(|| format!("Invalid rules in {}", path.display()))?;
        Ok(rules)
    }

    /// Parses and normalizes rules from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut rules: RuleSet = serde_json::from_str(json).context("Failed to parse rules")?;
        rules.normalize()?;
        Ok(rules)
    }

    /// Renders the rules as pretty-printed JSON with every object's keys sorted.
    pub fn to_json(&self) -> Result<String> {
        // Going through `Value` sorts the keys of nested objects and flattened extras too.
        let value = serde_json::to_value(self).context("Unable to serialize rules")?;
        let mut json = serde_json::to_string_pretty(&value).context("Unable to serialize rules")?;
        json.push('\n');
        Ok(json)
    }

    /// Writes the rules to `path`, replacing the file only once it has been fully rendered.
    pub fn save(&self, path: &Path) -> Result<()> {
        utils::write_atomic(path, self.to_json()?)
    }

    /// Trims the raw description keys, drops entries that become empty and reads the
    /// `merchants` rules.
    fn normalize(&mut self) -> Result<()> {
        if let Some(merchants) = self.other_fields.get(MERCHANTS) {
            self.merchants = serde_json::from_value(merchants.clone())
                .context("The 'merchants' rules are malformed")?;
        }
        let raw = std::mem::take(&mut self.raw_to_canonical);
        self.raw_to_canonical = raw
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), v))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Ok(())
    }

    /// The rules stored under `exact`, which is where new rules are written.
    pub fn exact(&self) -> &BTreeMap<String, ExactRule> {
        &self.exact
    }

    /// The rules stored under `merchants`.
    pub fn merchants(&self) -> &BTreeMap<String, ExactRule> {
        &self.merchants
    }

    /// The category of every canonical merchant, from `merchants` and `exact`. An `exact` rule
    /// replaces a `merchants` rule for the same merchant.
    pub fn merchant_categories(&self) -> BTreeMap<&str, &str> {
        self.merchants
            .iter()
            .chain(self.exact.iter())
            .map(|(canonical, rule)| (canonical.as_str(), rule.category()))
            .collect()
    }

    pub fn patterns(&self) -> &[PatternRule] {
        &self.patterns
    }

    pub fn raw_to_canonical(&self) -> &BTreeMap<String, String> {
        &self.raw_to_canonical
    }

    pub fn rules_version(&self) -> u32 {
        self.rules_version
    }

    /// Records that the raw description `raw` stands for `canonical`.
    pub fn map_raw(&mut self, raw: &str, canonical: &str) {
        self.raw_to_canonical
            .insert(raw.trim().to_string(), canonical.to_string());
    }

    /// Sets the category of `canonical`.
    pub fn set_exact(&mut self, canonical: &str, category: &str) {
        self.exact
            .insert(canonical.to_string(), ExactRule::new(category));
    }

    /// Appends a pattern rule. Pattern order is significant; earlier rules win.
    pub fn push_pattern(&mut self, rule: PatternRule) {
        self.patterns.push(rule);
    }
}

/// The category assigned to a canonical merchant.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "ExactRuleRepr")]
pub struct ExactRule {
    category: String,
}

impl ExactRule {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExactRuleRepr {
    Category(String),
    Record { category: String },
}

impl From<ExactRuleRepr> for ExactRule {
    fn from(value: ExactRuleRepr) -> Self {
        match value {
            ExactRuleRepr::Category(category) | ExactRuleRepr::Record { category } => {
                ExactRule::new(category)
            }
        }
    }
}

/// A regular expression tested against a merchant or raw description. A match names a canonical
/// merchant, a category, or both.
///
/// Fields are declared in alphabetical order so the serialized object has sorted keys.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    canonical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    /// Empty when the entry names no pattern; such entries never match.
    #[serde(default, alias = "regex")]
    pattern: String,
}

impl PatternRule {
    pub fn new(
        pattern: impl Into<String>,
        canonical: Option<String>,
        category: Option<String>,
    ) -> Self {
        Self {
            canonical,
            category,
            pattern: pattern.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn canonical(&self) -> Option<&str> {
        self.canonical.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gets_defaults() {
        let rules = RuleSet::from_json("{}").unwrap();
        assert!(rules.exact().is_empty());
        assert!(rules.patterns().is_empty());
        assert_eq!(rules.rules_version(), 1);
    }

    #[test]
    fn test_merchants_with_plain_strings() {
        let json = r#"{
            "version": 2,
            "merchants": { "Shell": "Gas", "Safeway": { "category": "Groceries" } },
            "patterns": [ { "regex": "UBER", "category": "Rides" } ]
        }"#;
        let rules = RuleSet::from_json(json).unwrap();
        assert!(rules.exact().is_empty());
        assert_eq!(rules.merchants()["Shell"].category(), "Gas");
        assert_eq!(rules.merchants()["Safeway"].category(), "Groceries");
        assert_eq!(rules.patterns()[0].pattern(), "UBER");
        assert_eq!(rules.patterns()[0].category(), Some("Rides"));
        assert_eq!(rules.patterns()[0].canonical(), None);
    }

    #[test]
    fn test_exact_and_merchants_side_by_side() {
        let json = r#"{
            "exact": { "Shell": { "category": "Fuel" } },
            "merchants": { "Safeway": "Groceries", "Shell": "Gas" },
            "rules_version": 1,
            "version": 3
        }"#;
        let mut rules = RuleSet::from_json(json).unwrap();
        let categories = rules.merchant_categories();
        assert_eq!(categories["Shell"], "Fuel");
        assert_eq!(categories["Safeway"], "Groceries");

        // New rules go under `exact`; `merchants` and `version` are written back untouched.
        rules.set_exact("Costco", "Warehouse");
        let out = rules.to_json().unwrap();
        assert!(out.contains("\"version\": 3"));
        assert!(out.contains("\"rules_version\": 1"));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            value["merchants"],
            serde_json::json!({ "Safeway": "Groceries", "Shell": "Gas" })
        );
        assert_eq!(value["exact"]["Costco"]["category"], "Warehouse");
        assert_eq!(RuleSet::from_json(&out).unwrap(), rules);
    }

    #[test]
    fn test_pattern_without_a_pattern_is_kept() {
        let json = r#"{ "patterns": [ { "canonical": "Nowhere" }, { "pattern": "^X", "category": "Y" } ] }"#;
        let rules = RuleSet::from_json(json).unwrap();
        assert_eq!(rules.patterns().len(), 2);
        assert_eq!(rules.patterns()[0].pattern(), "");
    }

    #[test]
    fn test_raw_keys_are_trimmed() {
        let json = r#"{ "raw_to_canonical": { "  SHELL 123 ": "Shell", "   ": "x" } }"#;
        let rules = RuleSet::from_json(json).unwrap();
        assert_eq!(rules.raw_to_canonical().len(), 1);
        assert_eq!(rules.raw_to_canonical()["SHELL 123"], "Shell");
    }

    #[test]
    fn test_to_json_is_sorted_and_keeps_unknown_keys() {
        let json = r#"{
            "zzz_notes": { "b": 1, "a": 2 },
            "raw_to_canonical": { "B RAW": "B", "A RAW": "A" },
            "exact": { "B": { "category": "Two" }, "A": { "category": "One" } },
            "patterns": [ { "pattern": "^X", "canonical": "X" } ],
            "rules_version": 1
        }"#;
        let rules = RuleSet::from_json(json).unwrap();
        let out = rules.to_json().unwrap();
        let expected = r#"{
  "exact": {
    "A": {
      "category": "One"
    },
    "B": {
      "category": "Two"
    }
  },
  "patterns": [
    {
      "canonical": "X",
      "pattern": "^X"
    }
  ],
  "raw_to_canonical": {
    "A RAW": "A",
    "B RAW": "B"
  },
  "rules_version": 1,
  "zzz_notes": {
    "a": 2,
    "b": 1
  }
}
"#;
        assert_eq!(out, expected);
        assert_eq!(RuleSet::from_json(&out).unwrap(), rules);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        let mut rules = RuleSet::default();
        rules.map_raw(" STARBUCKS #1 ", "Starbucks");
        rules.set_exact("Starbucks", "Coffee");
        rules.push_pattern(PatternRule::new("STARBUCKS", Some("Starbucks".into()), None));
        rules.save(&path).unwrap();
        let loaded = RuleSet::load(&path).unwrap();
        assert_eq!(loaded, rules);
        assert_eq!(loaded.raw_to_canonical()["STARBUCKS #1"], "Starbucks");
    }
}
