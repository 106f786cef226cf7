//! The rule-learning session.
//!
//! A `Session` walks the descriptions of an activity file and works out a canonical merchant and
//! a category for each one. It never reads input or touches files: whenever it needs a decision
//! it returns a `Step` saying so, and the caller answers with one of the `answer_*` methods.
//! Everything learned is recorded as a `ChangeList` that is applied to the rule set and the
//! category registry only when the session completes.

use crate::categorize::engine::RuleSnapshot;
use crate::model::{CategoryRegistry, RuleSet};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// A change to the persisted rules or categories, in the order it was decided.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Change {
    /// Remember that the raw description maps to the canonical merchant.
    MapRaw { raw: String, canonical: String },
    /// Add a category to the category list.
    AddCategory { category: String },
    /// Put a category into a group, creating the group if needed.
    AssignGroup { category: String, group: String },
    /// Give a canonical merchant a category.
    AddExactRule { canonical: String, category: String },
}

/// The changes produced by a session. Changes are only ever appended.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ChangeList {
    changes: Vec<Change>,
}

impl ChangeList {
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Applies every change, in order.
    pub fn apply(&self, rules: &mut RuleSet, registry: &mut CategoryRegistry) {
        for change in &self.changes {
            match change {
                Change::MapRaw { raw, canonical } => rules.map_raw(raw, canonical),
                Change::AddCategory { category } => {
                    registry.add_category(category);
                }
                Change::AssignGroup { category, group } => registry.assign_group(category, group),
                Change::AddExactRule {
                    canonical,
                    category,
                } => rules.set_exact(canonical, category),
            }
        }
    }
}

/// The outcome for one description.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Resolution {
    pub raw: String,
    pub canonical: String,
    pub category: String,
}

/// What the session needs next.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Step {
    /// The description is fully resolved.
    Resolved(Resolution),
    /// A canonical merchant name is needed for `raw`. A blank answer accepts `suggestion`, or the
    /// raw text when there is no suggestion.
    NeedsCanonical {
        raw: String,
        suggestion: Option<String>,
    },
    /// A category is needed for `canonical`. Blank answers are not accepted.
    NeedsCategory { canonical: String },
    /// `category` belongs to no group yet. A blank answer chooses the default group.
    NeedsGroup { category: String },
}

#[derive(Debug, Clone)]
struct Pending {
    raw: String,
    suggestion: Option<String>,
    canonical: Option<String>,
    category: Option<String>,
}

/// The decision core of rule learning. See the module documentation.
#[derive(Debug)]
pub struct Session<'a> {
    rules: &'a RuleSnapshot,
    registry: &'a CategoryRegistry,
    default_group: String,
    /// Raw descriptions mapped during this session.
    mapped: BTreeMap<String, String>,
    /// The category chosen for each canonical merchant during this session.
    resolved: BTreeMap<String, String>,
    added_categories: BTreeSet<String>,
    added_groups: Vec<String>,
    grouped: BTreeMap<String, String>,
    pending: Option<Pending>,
    changes: ChangeList,
}

impl<'a> Session<'a> {
    pub fn new(
        rules: &'a RuleSnapshot,
        registry: &'a CategoryRegistry,
        default_group: impl Into<String>,
    ) -> Self {
        Self {
            rules,
            registry,
            default_group: default_group.into(),
            mapped: BTreeMap::new(),
            resolved: BTreeMap::new(),
            added_categories: BTreeSet::new(),
            added_groups: Vec::new(),
            grouped: BTreeMap::new(),
            pending: None,
            changes: ChangeList::default(),
        }
    }

    /// Starts work on `description`. Returns `None` for a blank description, which needs no
    /// work. Any description still in progress is abandoned.
    pub fn step(&mut self, description: &str) -> Option<Step> {
        let raw = description.trim();
        if raw.is_empty() {
            return None;
        }
        self.pending = Some(Pending {
            raw: raw.to_string(),
            suggestion: None,
            canonical: None,
            category: None,
        });
        self.advance()
    }

    /// Answers `Step::NeedsCanonical`. Like the other `answer_*` methods, returns `None` when no
    /// description is in progress.
    pub fn answer_canonical(&mut self, answer: &str) -> Option<Step> {
        let answer = answer.trim();
        if let Some(pending) = &self.pending {
            if pending.canonical.is_none() {
                let canonical = if answer.is_empty() {
                    pending.suggestion.clone().unwrap_or_else(|| pending.raw.clone())
                } else {
                    answer.to_string()
                };
                self.set_canonical(canonical);
            }
        }
        self.advance()
    }

    /// Answers `Step::NeedsCategory`. A blank answer asks again.
    pub fn answer_category(&mut self, answer: &str) -> Option<Step> {
        let answer = answer.trim();
        let Some(pending) = &mut self.pending else {
            return None;
        };
        if !answer.is_empty() && pending.canonical.is_some() && pending.category.is_none() {
            pending.category = Some(answer.to_string());
            self.ensure_category(answer);
        }
        self.advance()
    }

    /// Answers `Step::NeedsCategory` with a label that is not remembered: the description
    /// resolves to `label`, but no category, group or exact rule is recorded, so the merchant
    /// is asked about again in a later session.
    pub fn answer_category_provisionally(&mut self, label: &str) -> Option<Step> {
        let pending = self.pending.as_ref()?;
        if pending.canonical.is_none() || pending.category.is_some() {
            return self.advance();
        }
        let pending = self.pending.take()?;
        let canonical = pending.canonical.unwrap_or_default();
        trace!("Provisionally labelling '{canonical}' as '{label}'");
        Some(Step::Resolved(Resolution {
            raw: pending.raw,
            canonical,
            category: label.trim().to_string(),
        }))
    }

    /// Answers `Step::NeedsGroup`.
    pub fn answer_group(&mut self, answer: &str) -> Option<Step> {
        let category = self.pending.as_ref().and_then(|p| p.category.clone());
        if let Some(category) = category {
            let answer = answer.trim();
            let group = if answer.is_empty() {
                self.default_group.clone()
            } else {
                answer.to_string()
            };
            self.assign_group(&category, &group);
        }
        self.advance()
    }

    /// The known categories, including those added during this session, with their groups.
    pub fn categories(&self) -> Vec<(String, Option<String>)> {
        self.registry
            .categories()
            .iter()
            .chain(self.added_categories.iter())
            .map(|c| (c.clone(), self.group_of(c).map(str::to_string)))
            .collect()
    }

    /// The known groups, including those added during this session.
    pub fn groups(&self) -> Vec<String> {
        let mut groups = self.registry.groups().to_vec();
        groups.extend(self.added_groups.iter().cloned());
        groups
    }

    pub fn default_group(&self) -> &str {
        &self.default_group
    }

    pub fn changes(&self) -> &ChangeList {
        &self.changes
    }

    /// Ends the session and returns what it learned.
    pub fn finish(self) -> ChangeList {
        self.changes
    }

    fn advance(&mut self) -> Option<Step> {
        let pending = self.pending.clone()?;

        let canonical = match pending.canonical {
            Some(canonical) => canonical,
            None => match self.known_canonical(&pending.raw) {
                Some(canonical) => {
                    self.set_canonical(canonical.clone());
                    canonical
                }
                None => {
                    let suggestion = self.rules.suggest_canonical(&pending.raw);
                    if let Some(p) = &mut self.pending {
                        p.suggestion = suggestion.clone();
                    }
                    return Some(Step::NeedsCanonical {
                        raw: pending.raw,
                        suggestion,
                    });
                }
            },
        };

        if let Some(category) = self.resolved.get(&canonical).cloned() {
            trace!("Reusing '{category}' for '{canonical}'");
            return Some(self.complete(canonical, category, false));
        }

        let step = match pending.category {
            None => match self.rules.exact_category(&canonical).map(str::to_string) {
                Some(category) => {
                    self.ensure_category(&category);
                    if self.group_of(&category).is_none() {
                        let group = self.default_group.clone();
                        self.assign_group(&category, &group);
                    }
                    self.complete(canonical, category, false)
                }
                None => Step::NeedsCategory { canonical },
            },
            Some(category) => {
                if self.group_of(&category).is_none() {
                    return Some(Step::NeedsGroup { category });
                }
                self.complete(canonical, category, true)
            }
        };
        Some(step)
    }

    fn known_canonical(&self, raw: &str) -> Option<String> {
        self.mapped
            .get(raw)
            .map(String::as_str)
            .or_else(|| self.rules.canonical_for_raw(raw))
            .map(str::to_string)
    }

    /// Records the canonical merchant of the pending description. The mapping is recorded even
    /// when it is already stored.
    fn set_canonical(&mut self, canonical: String) {
        let Some(pending) = &mut self.pending else {
            return;
        };
        pending.canonical = Some(canonical.clone());
        let raw = pending.raw.clone();
        self.mapped.insert(raw.clone(), canonical.clone());
        self.changes.push(Change::MapRaw { raw, canonical });
    }

    fn complete(&mut self, canonical: String, category: String, new_rule: bool) -> Step {
        if new_rule {
            self.changes.push(Change::AddExactRule {
                canonical: canonical.clone(),
                category: category.clone(),
            });
        }
        self.resolved.insert(canonical.clone(), category.clone());
        let raw = self.pending.take().map(|p| p.raw).unwrap_or_default();
        Step::Resolved(Resolution {
            raw,
            canonical,
            category,
        })
    }

    fn is_known_category(&self, category: &str) -> bool {
        self.registry.contains(category) || self.added_categories.contains(category)
    }

    fn ensure_category(&mut self, category: &str) {
        if !self.is_known_category(category) {
            self.added_categories.insert(category.to_string());
            self.changes.push(Change::AddCategory {
                category: category.to_string(),
            });
        }
    }

    fn group_of(&self, category: &str) -> Option<&str> {
        self.grouped
            .get(category)
            .map(String::as_str)
            .or_else(|| self.registry.group_of(category))
    }

    fn assign_group(&mut self, category: &str, group: &str) {
        if !self.registry.groups().iter().any(|g| g == group)
            && !self.added_groups.iter().any(|g| g == group)
        {
            self.added_groups.push(group.to_string());
        }
        self.grouped.insert(category.to_string(), group.to_string());
        self.changes.push(Change::AssignGroup {
            category: category.to_string(),
            group: group.to_string(),
        });
    }
}
