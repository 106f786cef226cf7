//! Configuration file handling for stmtcat.
//!
//! The configuration file is stored at `$STMTCAT_HOME/config.json`. It names the rule, category
//! and group files along with the labels and backup settings used by the commands.

use crate::backup::Backup;
use crate::model::{CategoryRegistry, RuleSet};
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "stmtcat";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const BACKUPS: &str = ".backups";
const CONFIG_JSON: &str = "config.json";
const CATEGORIES_TXT: &str = "categories.txt";
const GROUPS_TXT: &str = "groups.txt";
const RULES_JSON: &str = "rules.json";
const ACTIVITY_DIR: &str = "activity";
const DEFAULT_GROUP: &str = "Other";
const FALLBACK_CATEGORY: &str = "Uncategorized";

const CATEGORIES_HEADER: &str = "# One category per line. Lines starting with # are ignored.\n";
const GROUPS_HEADER: &str =
    "# Lines starting with * name a group; the categories of that group follow it.\n";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$STMTCAT_HOME` and from there it loads `$STMTCAT_HOME/config.json`. It provides
/// paths to other items that are either configurable or are expected in a certain location within
/// the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory, its backups directory and:
    /// - an initial `config.json` with default settings
    /// - empty `categories.txt`, `groups.txt` and `rules.json` files
    ///
    /// Files that already exist are left alone, so running this on an existing home is safe.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative).context("Unable to create the stmtcat home directory")?;
        let root = utils::canonicalize(&maybe_relative)?;

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups)?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = if config_path.is_file() {
            ConfigFile::load(&config_path)?
        } else {
            let config_file = ConfigFile::default();
            config_file.save(&config_path)?;
            config_file
        };

        let config = Self {
            root,
            backups,
            config_path,
            config_file,
        };

        let categories = config.categories_path();
        if !categories.is_file() {
            utils::write(&categories, CATEGORIES_HEADER)?;
        }
        let groups = config.groups_path();
        if !groups.is_file() {
            utils::write(&groups, GROUPS_HEADER)?;
        }
        let rules = config.rules_path();
        if !rules.is_file() {
            RuleSet::default().save(&rules)?;
        }
        Ok(config)
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load the config file
    /// - validate that the backups directory exists
    /// - return the loaded configuration object
    pub fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .context("The stmtcat home directory is missing, run 'stmtcat init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path)?;

        let config = Self {
            backups: root.join(BACKUPS),
            root,
            config_path,
            config_file,
        };
        if !config.backups.is_dir() {
            bail!(
                "The backups directory is missing '{}'",
                config.backups.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }

    /// The group given to categories that have none.
    pub fn default_group(&self) -> &str {
        &self.config_file.default_group
    }

    /// The label given to merchants that no rule matches.
    pub fn fallback_category(&self) -> &str {
        &self.config_file.fallback_category
    }

    /// Where activity files are written when no output directory is given.
    pub fn out_dir(&self) -> PathBuf {
        self.resolve(self.config_file.out_dir.clone())
    }

    pub fn categories_path(&self) -> PathBuf {
        self.resolve(self.config_file.categories_path())
    }

    pub fn groups_path(&self) -> PathBuf {
        self.resolve(self.config_file.groups_path())
    }

    pub fn rules_path(&self) -> PathBuf {
        self.resolve(self.config_file.rules_path())
    }

    /// Loads the configured rules file.
    pub fn load_rules(&self) -> Result<RuleSet> {
        let path = self.rules_path();
        utils::require_file(&path, "Rules file")?;
        RuleSet::load(&path)
    }

    /// Loads the configured categories and groups files.
    pub fn load_registry(&self) -> Result<CategoryRegistry> {
        let categories = self.categories_path();
        let groups = self.groups_path();
        utils::require_file(&categories, "Categories file")?;
        utils::require_file(&groups, "Groups file")?;
        CategoryRegistry::load(&categories, &groups)
    }

    /// Returns `p` unchanged if it is absolute, otherwise resolves it against the home directory.
    fn resolve(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "stmtcat",
///   "config_version": 1,
///   "backup_copies": 5,
///   "default_group": "Other",
///   "fallback_category": "Uncategorized",
///   "out_dir": "activity",
///   "rules_path": "/home/me/finances/rules.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "stmtcat"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Number of backup copies to keep per file
    #[serde(default = "default_backup_copies")]
    backup_copies: u32,

    /// The group that categories without one are placed in
    #[serde(default = "default_group")]
    default_group: String,

    /// The label for merchants that no rule matches
    #[serde(default = "default_fallback_category")]
    fallback_category: String,

    /// Default output directory for activity files, relative to the home directory or absolute
    #[serde(default = "default_out_dir")]
    out_dir: PathBuf,

    /// Path to the categories file. Defaults to $STMTCAT_HOME/categories.txt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    categories_path: Option<PathBuf>,

    /// Path to the groups file. Defaults to $STMTCAT_HOME/groups.txt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    groups_path: Option<PathBuf>,

    /// Path to the rules file. Defaults to $STMTCAT_HOME/rules.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rules_path: Option<PathBuf>,
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

fn default_fallback_category() -> String {
    FALLBACK_CATEGORY.to_string()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(ACTIVITY_DIR)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backup_copies: BACKUP_COPIES,
            default_group: default_group(),
            fallback_category: default_fallback_category(),
            out_dir: default_out_dir(),
            categories_path: None,
            groups_path: None,
            rules_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads and validates a ConfigFile.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it belongs to another app.
    fn load(path: &Path) -> Result<Self> {
        let config: ConfigFile = utils::deserialize(path)
            .with_context(|| format!("Failed to load config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            !config.fallback_category.trim().is_empty(),
            "The fallback_category in the config file must not be empty"
        );
        anyhow::ensure!(
            !config.default_group.trim().is_empty(),
            "The default_group in the config file must not be empty"
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write_atomic(path, data).context("Unable to write config file")
    }

    fn categories_path(&self) -> PathBuf {
        self.categories_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(CATEGORIES_TXT))
    }

    fn groups_path(&self) -> PathBuf {
        self.groups_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(GROUPS_TXT))
    }

    fn rules_path(&self) -> PathBuf {
        self.rules_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(RULES_JSON))
    }
}
