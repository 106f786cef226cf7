use crate::args::LearnArgs;
use crate::categorize::{resolve, BatchPrompter, ConsolePrompter, Prompter, RuleSnapshot, Session};
use crate::commands::{read_csv, require_column, sibling_path, write_csv, Out, CATEGORIZED_SUFFIX};
use crate::model::{CategoryRegistry, RuleSet};
use crate::{utils, Config, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DESCRIPTION_COLUMNS: [&str; 2] = ["Description", "description"];
const MERCHANT: &str = "Merchant";
const CATEGORY: &str = "Category";

/// What the `learn` command produced.
#[derive(Debug, Clone, Serialize)]
pub struct LearnSummary {
    pub out: PathBuf,
    pub rows: usize,
    pub resolved: usize,
    pub changes: usize,
    pub rules: PathBuf,
    pub categories: PathBuf,
    pub groups: PathBuf,
}

/// Walks the descriptions of an activity CSV, settling a canonical merchant and a category for
/// each one, asking on the console unless `--batch` is given.
///
/// With `--batch`, merchants without a category are labelled with the fallback category in the
/// output only. Their names are learned, but no category is stored for them.
///
/// Nothing is saved until every row has been resolved. Then the rules, categories and groups
/// files are backed up and rewritten, and the rows are written with `Merchant` and `Category`
/// columns so the output can be fed to `categorize`.
///
/// # Errors
/// - The activity, rules, categories or groups file does not exist.
/// - The activity file has no `Description` column.
/// - The console input ends before the session is complete.
pub fn learn(config: &Config, args: &LearnArgs) -> Result<Out<LearnSummary>> {
    if args.batch() {
        learn_with(config, args, &mut BatchPrompter::new(config.fallback_category()))
    } else {
        learn_with(config, args, &mut ConsolePrompter::stdio())
    }
}

pub(crate) fn learn_with(
    config: &Config,
    args: &LearnArgs,
    prompter: &mut dyn Prompter,
) -> Result<Out<LearnSummary>> {
    let activity = args.activity();
    let rules_path = path_or(args.rules(), || config.rules_path());
    let categories_path = path_or(args.categories(), || config.categories_path());
    let groups_path = path_or(args.groups(), || config.groups_path());
    utils::require_file(activity, "Activity file")?;
    utils::require_file(&rules_path, "Rules file")?;
    utils::require_file(&categories_path, "Categories file")?;
    utils::require_file(&groups_path, "Groups file")?;
    let out = match args.output() {
        Some(p) => p.to_path_buf(),
        None => sibling_path(activity, CATEGORIZED_SUFFIX)?,
    };

    let mut rules = RuleSet::load(&rules_path)?;
    let mut registry = CategoryRegistry::load(&categories_path, &groups_path)?;
    info!(
        "Loaded {} categories, {} groups, {} raw to canonical mappings and {} canonical rules",
        registry.categories().len(),
        registry.groups().len(),
        rules.raw_to_canonical().len(),
        rules.merchant_categories().len()
    );

    let (headers, rows) = read_csv(activity)?;
    let description_ix = require_column(activity, &headers, &DESCRIPTION_COLUMNS)?;

    let snapshot = RuleSnapshot::new(&rules);
    let mut session = Session::new(&snapshot, &registry, config.default_group());
    let mut resolutions = Vec::with_capacity(rows.len());
    for row in &rows {
        let description = row.get(description_ix).unwrap_or_default();
        resolutions.push(resolve(&mut session, description, prompter)?);
    }
    let changes = session.finish();
    debug!("The session produced {} changes", changes.len());

    changes.apply(&mut rules, &mut registry);
    let backup = config.backup();
    for path in [&rules_path, &categories_path, &groups_path] {
        backup.copy_file(path)?;
    }
    rules.save(&rules_path)?;
    registry.save(&categories_path, &groups_path)?;

    let mut out_headers = headers.clone();
    let merchant_ix = column_or_push(&mut out_headers, MERCHANT);
    let category_ix = column_or_push(&mut out_headers, CATEGORY);
    let width = out_headers.len();
    let output = rows.iter().zip(&resolutions).map(|(row, resolution)| {
        let mut fields: Vec<String> = row.iter().map(str::to_string).collect();
        fields.resize(width, String::new());
        if let Some(r) = resolution {
            fields[merchant_ix] = r.canonical.clone();
            fields[category_ix] = r.category.clone();
        }
        fields
    });
    write_csv(&out, &out_headers, output)?;

    let summary = LearnSummary {
        out,
        rows: rows.len(),
        resolved: resolutions.iter().flatten().count(),
        changes: changes.len(),
        rules: rules_path,
        categories: categories_path,
        groups: groups_path,
    };
    Ok(Out::new(
        format!(
            "Learned from {} rows and wrote {}",
            summary.rows,
            summary.out.display()
        ),
        summary,
    ))
}

fn path_or(path: Option<&Path>, default: impl FnOnce() -> PathBuf) -> PathBuf {
    path.map(PathBuf::from).unwrap_or_else(default)
}

/// The index of the `name` column, which is appended if it is not there yet.
fn column_or_push(headers: &mut csv::StringRecord, name: &str) -> usize {
    match headers.iter().position(|h| h == name) {
        Some(ix) => ix,
        None => {
            headers.push_field(name);
            headers.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    const ACTIVITY: &str = "\
transaction_date,post_date,description,amount,balance,raw
03/01/24,,BLUE BOTTLE #12,4.50,,x
03/02/24,,SAFEWAY 0042,30.00,,x
03/03/24,,,1.00,,x
03/04/24,,NEW PLACE,9.99,,x
03/05/24,,SAFEWAY 0042,12.00,,x
";

    fn env() -> TestEnv {
        let env = TestEnv::new();
        env.set_rules(
            r#"{
                "exact": { "Blue Bottle": { "category": "Coffee" } },
                "patterns": [ { "pattern": "^safeway", "canonical": "Safeway" } ],
                "raw_to_canonical": { "BLUE BOTTLE #12": "Blue Bottle" },
                "zz_note": "kept"
            }"#,
        );
        env.set_categories("Coffee\nGroceries\n", "*Food\nCoffee\nGroceries\n");
        env
    }

    #[test]
    fn test_learn_batch() {
        let env = env();
        let config = env.config();
        let activity = env.write_file("march.activity.csv", ACTIVITY);

        let out = learn(&config, &LearnArgs::new(&activity).with_batch(true)).unwrap();
        let summary = out.structure().unwrap();
        assert_eq!(summary.rows, 5);
        assert_eq!(summary.resolved, 4);
        assert_eq!(summary.out, env.scratch().join("march.categorized.csv"));

        let text = utils::read(&summary.out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "transaction_date,post_date,description,amount,balance,raw,Merchant,Category"
        );
        assert_eq!(lines[1], "03/01/24,,BLUE BOTTLE #12,4.50,,x,Blue Bottle,Coffee");
        assert_eq!(lines[2], "03/02/24,,SAFEWAY 0042,30.00,,x,Safeway,Uncategorized");
        assert_eq!(lines[3], "03/03/24,,,1.00,,x,,");
        assert_eq!(lines[4], "03/04/24,,NEW PLACE,9.99,,x,NEW PLACE,Uncategorized");

        let rules = config.load_rules().unwrap();
        assert_eq!(rules.raw_to_canonical()["SAFEWAY 0042"], "Safeway");
        assert_eq!(rules.raw_to_canonical()["NEW PLACE"], "NEW PLACE");
        // The fallback label is not stored as a rule or a category.
        assert!(!rules.exact().contains_key("Safeway"));
        assert!(!rules.exact().contains_key("NEW PLACE"));
        assert!(rules.to_json().unwrap().contains("\"zz_note\": \"kept\""));

        let registry = config.load_registry().unwrap();
        assert!(!registry.contains("Uncategorized"));

        // Each rewritten file was backed up first.
        let backups = utils::read_dir(config.backups()).unwrap();
        assert_eq!(backups.len(), 3);
    }

    #[test]
    fn test_learn_console() {
        let env = env();
        let config = env.config();
        let activity = env.write_file("april.activity.csv", ACTIVITY);
        let output = env.scratch().join("april.out.csv");

        // SAFEWAY: accept suggestion, choose Groceries. NEW PLACE: name it, new category and group.
        let input = "\nGroceries\nNew Place\nHobbies\nFun\n";
        let mut prompter = ConsolePrompter::new(input.as_bytes(), Vec::new());
        learn_with(
            &config,
            &LearnArgs::new(&activity).with_output(&output),
            &mut prompter,
        )
        .unwrap();

        let text = utils::read(&output).unwrap();
        assert!(text.contains("SAFEWAY 0042,12.00,,x,Safeway,Groceries"));
        assert!(text.contains("NEW PLACE,9.99,,x,New Place,Hobbies"));

        let rules = config.load_rules().unwrap();
        assert_eq!(rules.exact()["Safeway"].category(), "Groceries");
        assert_eq!(rules.exact()["New Place"].category(), "Hobbies");
        let registry = config.load_registry().unwrap();
        assert_eq!(registry.group_of("Hobbies"), Some("Fun"));
    }

    #[test]
    fn test_console_asks_about_merchants_left_by_batch() {
        let env = env();
        let config = env.config();
        let activity = env.write_file(
            "june.activity.csv",
            "transaction_date,post_date,description,amount,balance,raw\n\
             06/01/24,,NEW PLACE,9.99,,x\n",
        );
        learn(&config, &LearnArgs::new(&activity).with_batch(true)).unwrap();

        let mut output = Vec::new();
        let mut prompter = ConsolePrompter::new("Groceries\n".as_bytes(), &mut output);
        let out = learn_with(&config, &LearnArgs::new(&activity), &mut prompter).unwrap();
        let summary = out.structure().unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Assign category for merchant: NEW PLACE"));
        assert!(utils::read(&summary.out)
            .unwrap()
            .contains("NEW PLACE,9.99,,x,NEW PLACE,Groceries"));
        let rules = config.load_rules().unwrap();
        assert_eq!(rules.exact()["NEW PLACE"].category(), "Groceries");
    }

    #[test]
    fn test_interrupted_session_saves_nothing() {
        let env = env();
        let config = env.config();
        let activity = env.write_file("may.activity.csv", ACTIVITY);
        let before = utils::read(&config.rules_path()).unwrap();

        let mut prompter = ConsolePrompter::new("\n".as_bytes(), Vec::new());
        let result = learn_with(&config, &LearnArgs::new(&activity), &mut prompter);
        assert!(result.is_err());
        assert_eq!(utils::read(&config.rules_path()).unwrap(), before);
        assert!(!env.scratch().join("may.categorized.csv").exists());
    }

    #[test]
    fn test_missing_description_column() {
        let env = env();
        let activity = env.write_file("bad.csv", "Date,Amount\n03/01/24,1.00\n");
        let err = learn(&env.config(), &LearnArgs::new(&activity).with_batch(true)).unwrap_err();
        assert!(err.to_string().contains("'Description' or 'description'"));
    }
}
