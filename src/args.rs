//! These structs provide the CLI interface for the stmtcat CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// stmtcat: A command-line tool for turning bank statements into categorized transactions.
///
/// The `activity` command reads a statement PDF and writes its transactions to an activity CSV.
/// The `learn` command walks an activity CSV, asking you to name each merchant and choose its
/// category, and remembers your answers as rules. The `categorize` command applies those rules to
/// a CSV without asking anything and reports the merchants it could not place.
///
/// Run `stmtcat init` first to create the home directory with its rules, categories and groups
/// files.
#[derive(Debug, Parser, Clone)]
#[command(version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and initialize the configuration, rules, categories and groups
    /// files. Existing files are left alone.
    Init,
    /// Extract the transactions of a statement PDF into an activity CSV.
    Activity(ActivityArgs),
    /// Walk an activity CSV and learn a canonical merchant and a category for each description.
    Learn(LearnArgs),
    /// Fill in the Category column of a CSV using the stored rules.
    Categorize(CategorizeArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where stmtcat rules and configuration are held. Defaults to ~/stmtcat
    #[arg(long, env = "STMTCAT_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `stmtcat activity` command.
#[derive(Debug, Parser, Clone)]
pub struct ActivityArgs {
    /// The kind of statement, e.g. chase
    statement_type: String,

    /// The statement PDF to read.
    pdf: PathBuf,

    /// Where to write `<pdf name>.activity.csv`. Defaults to the `out_dir` of the config file.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

impl ActivityArgs {
    pub fn new(statement_type: impl Into<String>, pdf: impl Into<PathBuf>) -> Self {
        Self {
            statement_type: statement_type.into(),
            pdf: pdf.into(),
            out_dir: None,
        }
    }

    pub fn statement_type(&self) -> &str {
        &self.statement_type
    }

    pub fn pdf(&self) -> &Path {
        &self.pdf
    }

    pub fn out_dir(&self) -> Option<&Path> {
        self.out_dir.as_deref()
    }
}

/// (Not shown): Args for the `stmtcat learn` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct LearnArgs {
    /// The activity CSV to walk. It needs a Description column.
    activity: PathBuf,

    /// The categories file. Defaults to the one in the home directory.
    #[arg(long)]
    categories: Option<PathBuf>,

    /// The groups file. Defaults to the one in the home directory.
    #[arg(long)]
    groups: Option<PathBuf>,

    /// The rules file. Defaults to the one in the home directory.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Where to write the categorized CSV. Defaults to `<name>.categorized.csv` next to the input.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Do not ask anything: accept suggested merchant names and give unknown merchants the
    /// fallback category.
    #[arg(long)]
    batch: bool,
}

impl LearnArgs {
    pub fn new(activity: impl Into<PathBuf>) -> Self {
        Self {
            activity: activity.into(),
            ..Default::default()
        }
    }

    pub fn with_batch(mut self, batch: bool) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn activity(&self) -> &Path {
        &self.activity
    }

    pub fn categories(&self) -> Option<&Path> {
        self.categories.as_deref()
    }

    pub fn groups(&self) -> Option<&Path> {
        self.groups.as_deref()
    }

    pub fn rules(&self) -> Option<&Path> {
        self.rules.as_deref()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn batch(&self) -> bool {
        self.batch
    }
}

/// (Not shown): Args for the `stmtcat categorize` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct CategorizeArgs {
    /// The CSV to categorize. It needs a Category column and a Merchant (or Description) column.
    #[arg(long = "in")]
    input: PathBuf,

    /// The rules file. Defaults to the one in the home directory.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// The categories file. Defaults to the one in the home directory.
    #[arg(long)]
    categories: Option<PathBuf>,

    /// Where to write the categorized CSV. Defaults to `<name>.categorized.csv` next to the input.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Where to write the unmatched merchants report. Defaults to
    /// `<name>.unmatched_merchants.csv` next to the input.
    #[arg(long)]
    unmatched: Option<PathBuf>,
}

impl CategorizeArgs {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_out(mut self, out: impl Into<PathBuf>) -> Self {
        self.out = Some(out.into());
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn rules(&self) -> Option<&Path> {
        self.rules.as_deref()
    }

    pub fn categories(&self) -> Option<&Path> {
        self.categories.as_deref()
    }

    pub fn out(&self) -> Option<&Path> {
        self.out.as_deref()
    }

    pub fn unmatched(&self) -> Option<&Path> {
        self.unmatched.as_deref()
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("stmtcat"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or STMTCAT_HOME instead of relying on the default \
                stmtcat home directory. If you continue using the program right now, you may \
                have problems!",
            );
            PathBuf::from("stmtcat")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
