use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Returned when no extractor is registered for the requested statement type.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnsupportedStatementType {
    requested: String,
    available: Vec<String>,
}

impl UnsupportedStatementType {
    pub(crate) fn new(requested: impl Into<String>, available: Vec<String>) -> Self {
        Self {
            requested: requested.into(),
            available,
        }
    }

    pub fn requested(&self) -> &str {
        &self.requested
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }
}

impl Display for UnsupportedStatementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unsupported statement type '{}' (available: {})",
            self.requested,
            self.available.join(", ")
        )
    }
}

impl StdError for UnsupportedStatementType {}
