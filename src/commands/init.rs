use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The files that make up an initialized home directory.
#[derive(Debug, Clone, Serialize)]
pub struct InitSummary {
    pub home: PathBuf,
    pub config: PathBuf,
    pub categories: PathBuf,
    pub groups: PathBuf,
    pub rules: PathBuf,
}

/// Creates the home directory, its backups directory and:
/// - an initial `config.json` with default settings
/// - empty categories, groups and rules files
///
/// # Arguments
/// - `home` - The directory that will be the root of the data directory, e.g. `$HOME/stmtcat`
///
/// # Errors
/// - Returns an error if any file operations fail.
pub fn init(home: &Path) -> Result<Out<InitSummary>> {
    let config =
        Config::create(home).context("Unable to create the home directory and configs")?;
    let summary = InitSummary {
        home: config.root().to_path_buf(),
        config: config.config_path().to_path_buf(),
        categories: config.categories_path(),
        groups: config.groups_path(),
        rules: config.rules_path(),
    };
    Ok(Out::new(
        format!(
            "Successfully created the stmtcat directory at {}",
            config.root().display()
        ),
        summary,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = init(&dir.path().join("home")).unwrap();
        let summary = out.structure().unwrap();
        assert!(summary.config.is_file());
        assert!(summary.rules.is_file());
        assert!(summary.categories.is_file());
        assert!(summary.groups.is_file());
        assert!(out.message().starts_with("Successfully created"));
    }
}
