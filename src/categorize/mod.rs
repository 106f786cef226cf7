//! Categorizing merchants, and learning new rules from an operator.

mod engine;
mod prompt;
mod session;

pub use engine::{categorize, normalize_merchant, RuleSnapshot, UnmatchedTally, UNMATCHED_HEADERS};
pub use prompt::{resolve, BatchPrompter, CategoryAnswer, ConsolePrompter, Prompter};
pub use session::{Change, ChangeList, Resolution, Session, Step};
