//! Types that represent the core data model, such as `ActivityRecord`, `RuleSet` and
//! `CategoryRegistry`.
mod amount;
mod category;
mod rules;
mod transaction;

pub use amount::{Amount, AmountError};
pub use category::{CategoryRegistry, COMMENT_MARKER, GROUP_MARKER, UNGROUPED};
pub use rules::{ExactRule, PatternRule, RuleSet};
pub use transaction::{read_activity_csv, write_activity_csv, ActivityColumn, ActivityRecord};
