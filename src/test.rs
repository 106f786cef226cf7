//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::{utils, Config};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test environment that sets up an initialized stmtcat home directory.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// Creates a test environment with a fresh home directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("stmtcat");
        let config = Config::create(&root).unwrap();
        Self { temp_dir, config }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// A scratch directory outside of the home directory.
    pub fn scratch(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` to `name` in the scratch directory and returns its path.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.scratch().join(name);
        utils::write(&path, contents).unwrap();
        path
    }

    /// Replaces the categories and groups files of the home directory.
    pub fn set_categories(&self, categories: &str, groups: &str) {
        utils::write(self.config.categories_path(), categories).unwrap();
        utils::write(self.config.groups_path(), groups).unwrap();
    }

    /// Replaces the rules file of the home directory.
    pub fn set_rules(&self, json: &str) {
        utils::write(self.config.rules_path(), json).unwrap();
    }
}
