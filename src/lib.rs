pub mod args;
mod backup;
pub mod categorize;
pub mod commands;
mod config;
mod error;
pub mod extract;
pub mod model;
mod utils;

#[cfg(test)]
mod test;

pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use error::UnsupportedStatementType;
