//! Turns statement PDFs into activity files.
//!
//! Each page's tables are tried first. Only when no table anywhere in the document produced a
//! transaction are the pages read again as plain text, line by line. Rows and pages that cannot
//! be read are skipped and counted in the `ExtractionReport` rather than failing the document.

mod lexical;
mod lines;
mod pdf;
mod table;

pub use lexical::{looks_like_date, looks_like_money, parse_money};
pub use lines::{extract_lines, LinesOutcome};
pub use pdf::{Decoder, Document, LopdfDecoder};
pub use table::{extract_table, Table, TableOutcome};

use crate::error::UnsupportedStatementType;
use crate::model::{write_activity_csv, ActivityRecord};
use crate::{utils, Result};
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The suffix appended to a statement's file stem to name its activity file.
pub const ACTIVITY_SUFFIX: &str = ".activity.csv";

/// What happened while extracting one document.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ExtractionReport {
    pub records: Vec<ActivityRecord>,
    pub pages: usize,
    /// Pages whose tables or text could not be read.
    pub page_failures: usize,
    pub table_rows_attempted: usize,
    pub line_rows_attempted: usize,
    pub used_line_fallback: bool,
}

impl ExtractionReport {
    pub fn rows_attempted(&self) -> usize {
        self.table_rows_attempted + self.line_rows_attempted
    }

    pub fn rows_accepted(&self) -> usize {
        self.records.len()
    }
}

/// The activity file written for a statement, along with how it was produced. `report` is
/// `None` when the document could not be opened and a header-only file was written instead.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub path: PathBuf,
    pub report: Option<ExtractionReport>,
}

/// Extracts the transactions of one kind of statement.
pub trait Extractor {
    /// Reads `pdf` and writes its activity file into `out_dir`.
    fn extract(&self, pdf: &Path, out_dir: &Path) -> Result<Extraction>;
}

/// The extractor for statements laid out as dated rows ending in an amount and an optional
/// running balance.
pub struct StatementExtractor<D> {
    decoder: D,
}

impl<D: Decoder> StatementExtractor<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }
}

impl<D: Decoder> Extractor for StatementExtractor<D> {
    fn extract(&self, pdf: &Path, out_dir: &Path) -> Result<Extraction> {
        extract_activity(&self.decoder, pdf, out_dir)
    }
}

/// Maps statement type names to their extractors. Names are matched case-insensitively.
pub struct ExtractorRegistry {
    extractors: BTreeMap<String, Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// A registry with no extractors.
    pub fn empty() -> Self {
        Self {
            extractors: BTreeMap::new(),
        }
    }

    /// A registry holding every statement type this program supports.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("chase", StatementExtractor::new(LopdfDecoder));
        registry
    }

    pub fn register(&mut self, statement_type: &str, extractor: impl Extractor + 'static) {
        self.extractors
            .insert(statement_type.to_lowercase(), Box::new(extractor));
    }

    /// The registered statement types, sorted.
    pub fn statement_types(&self) -> Vec<String> {
        self.extractors.keys().cloned().collect()
    }

    /// Finds the extractor for `statement_type`. The error is an `UnsupportedStatementType`.
    pub fn get(&self, statement_type: &str) -> Result<&dyn Extractor> {
        match self.extractors.get(&statement_type.trim().to_lowercase()) {
            Some(extractor) => Ok(extractor.as_ref()),
            None => Err(UnsupportedStatementType::new(statement_type, self.statement_types()).into()),
        }
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Reads `pdf` with `decoder` and writes `<out_dir>/<pdf stem>.activity.csv`.
///
/// A document that cannot be opened produces a header-only file. The only errors returned are
/// those that prevent the output directory or file from being written.
pub fn extract_activity(decoder: &dyn Decoder, pdf: &Path, out_dir: &Path) -> Result<Extraction> {
    utils::make_dir(out_dir)?;
    let path = out_dir.join(activity_file_name(pdf)?);

    let report = match decoder.open(pdf) {
        Ok(document) => Some(extract_document(document.as_ref())),
        Err(e) => {
            warn!("Unable to read {}, writing an empty activity file: {e:#}", pdf.display());
            None
        }
    };

    let records = report.as_ref().map(|r| r.records.as_slice()).unwrap_or_default();
    write_activity_csv(&path, records)?;
    if let Some(r) = &report {
        info!(
            "Extracted {} of {} candidate rows from {} pages of {}",
            r.rows_accepted(),
            r.rows_attempted(),
            r.pages,
            pdf.display()
        );
    }
    Ok(Extraction { path, report })
}

/// Extracts every transaction from an opened document.
pub fn extract_document(document: &dyn Document) -> ExtractionReport {
    let mut report = ExtractionReport {
        pages: document.page_count(),
        ..Default::default()
    };

    for page in 0..report.pages {
        let tables = match document.tables(page) {
            Ok(tables) => tables,
            Err(e) => {
                warn!("Skipping the tables of page {}: {e:#}", page + 1);
                report.page_failures += 1;
                continue;
            }
        };
        for table in &tables {
            let outcome = extract_table(table);
            report.table_rows_attempted += outcome.attempted;
            report.records.extend(outcome.records);
        }
    }

    if !report.records.is_empty() {
        return report;
    }

    debug!("No transactions found in tables, reading page text line by line");
    report.used_line_fallback = true;
    for page in 0..report.pages {
        let text = match document.text(page) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping the text of page {}: {e:#}", page + 1);
                report.page_failures += 1;
                continue;
            }
        };
        let lines: Vec<&str> = text.lines().collect();
        let outcome = extract_lines(&lines);
        report.line_rows_attempted += outcome.attempted;
        report.records.extend(outcome.records);
    }
    report
}

fn activity_file_name(pdf: &Path) -> Result<String> {
    let stem = pdf
        .file_stem()
        .with_context(|| format!("The path '{}' has no file name", pdf.display()))?;
    Ok(format!("{}{ACTIVITY_SUFFIX}", stem.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::cell::Cell;

    #[derive(Default)]
    struct FakePage {
        tables: Option<Vec<Table>>,
        text: Option<String>,
    }

    /// A document held in memory. `None` makes the corresponding read fail.
    #[derive(Default)]
    struct FakeDocument {
        pages: Vec<FakePage>,
        text_calls: Cell<usize>,
    }

    impl Document for FakeDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn tables(&self, page: usize) -> Result<Vec<Table>> {
            match &self.pages[page].tables {
                Some(tables) => Ok(tables.clone()),
                None => bail!("broken tables"),
            }
        }

        fn text(&self, page: usize) -> Result<String> {
            self.text_calls.set(self.text_calls.get() + 1);
            match &self.pages[page].text {
                Some(text) => Ok(text.clone()),
                None => bail!("broken text"),
            }
        }
    }

    struct FakeDecoder {
        pages: Vec<(Option<Vec<Table>>, Option<String>)>,
    }

    impl Decoder for FakeDecoder {
        fn open(&self, _path: &Path) -> Result<Box<dyn Document>> {
            let pages = self
                .pages
                .iter()
                .map(|(tables, text)| FakePage {
                    tables: tables.clone(),
                    text: text.clone(),
                })
                .collect();
            Ok(Box::new(FakeDocument {
                pages,
                text_calls: Cell::new(0),
            }))
        }
    }

    struct BrokenDecoder;

    impl Decoder for BrokenDecoder {
        fn open(&self, path: &Path) -> Result<Box<dyn Document>> {
            bail!("cannot decode {}", path.display())
        }
    }

    fn row(cells: &[&str]) -> Vec<Option<String>> {
        cells.iter().map(|c| Some(c.to_string())).collect()
    }

    fn page(tables: Vec<Table>, text: &str) -> FakePage {
        FakePage {
            tables: Some(tables),
            text: Some(text.to_string()),
        }
    }

    #[test]
    fn test_line_fallback_runs_once_per_page_when_tables_are_empty() {
        let doc = FakeDocument {
            pages: vec![
                page(vec![vec![row(&["Date", "Description", "Amount"])]], "03/01/24 COFFEE SHOP 4.50"),
                page(vec![], "Page 2\n03/02/24 BAKERY 7.25 100.00\n"),
                page(vec![], ""),
            ],
            ..Default::default()
        };
        let report = extract_document(&doc);
        assert_eq!(doc.text_calls.get(), 3);
        assert!(report.used_line_fallback);
        assert_eq!(report.pages, 3);
        assert_eq!(report.rows_accepted(), 2);
        assert_eq!(report.line_rows_attempted, 2);
        assert_eq!(report.records[1].description(), "BAKERY");
    }

    #[test]
    fn test_line_fallback_is_skipped_when_any_table_has_a_record() {
        let doc = FakeDocument {
            pages: vec![
                page(vec![], "03/01/24 SHOULD NOT APPEAR 1.00"),
                page(
                    vec![vec![row(&["03/01/24", "DESCRIPTION TEXT", "45.00", "1,200.00"])]],
                    "03/01/24 SHOULD NOT APPEAR 1.00",
                ),
            ],
            ..Default::default()
        };
        let report = extract_document(&doc);
        assert_eq!(doc.text_calls.get(), 0);
        assert!(!report.used_line_fallback);
        assert_eq!(report.rows_accepted(), 1);
        assert_eq!(report.table_rows_attempted, 1);
        assert_eq!(report.records[0].description(), "DESCRIPTION TEXT");
    }

    #[test]
    fn test_page_failures_are_isolated() {
        let doc = FakeDocument {
            pages: vec![
                FakePage::default(),
                page(vec![], "03/05/24 GROCERY 12.00"),
            ],
            ..Default::default()
        };
        let report = extract_document(&doc);
        // The first page fails once for tables and once for text.
        assert_eq!(report.page_failures, 2);
        assert_eq!(report.rows_accepted(), 1);
    }

    #[test]
    fn test_extract_activity_writes_csv() {
        let dir = tempfile::TempDir::new().unwrap();
        let decoder = FakeDecoder {
            pages: vec![(Some(vec![]), Some("03/01/24 COFFEE SHOP 4.50".to_string()))],
        };
        let out_dir = dir.path().join("out");
        let extraction =
            extract_activity(&decoder, Path::new("/statements/march.pdf"), &out_dir).unwrap();
        assert_eq!(extraction.path, out_dir.join("march.activity.csv"));
        let text = utils::read(&extraction.path).unwrap();
        assert_eq!(
            text,
            "transaction_date,post_date,description,amount,balance,raw\n\
             03/01/24,,COFFEE SHOP,4.50,,03/01/24 COFFEE SHOP 4.50\n"
        );
    }

    #[test]
    fn test_unreadable_document_gives_header_only_csv() {
        let dir = tempfile::TempDir::new().unwrap();
        let extraction =
            extract_activity(&BrokenDecoder, Path::new("april.pdf"), dir.path()).unwrap();
        assert!(extraction.report.is_none());
        let text = utils::read(&extraction.path).unwrap();
        assert_eq!(text, "transaction_date,post_date,description,amount,balance,raw\n");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ExtractorRegistry::with_defaults();
        assert!(registry.get("Chase").is_ok());
        let err = registry.get("acme-bank").err().unwrap();
        let unsupported = err.downcast_ref::<UnsupportedStatementType>().unwrap();
        assert_eq!(unsupported.requested(), "acme-bank");
        assert_eq!(unsupported.available(), ["chase"]);
    }
}
