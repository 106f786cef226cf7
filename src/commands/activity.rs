use crate::commands::Out;
use crate::extract::ExtractorRegistry;
use crate::{utils, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What the `activity` command produced.
#[derive(Debug, Clone, Serialize)]
pub struct ActivitySummary {
    pub path: PathBuf,
    /// False when the statement could not be decoded and only a header was written.
    pub decoded: bool,
    pub pages: usize,
    pub page_failures: usize,
    pub rows_attempted: usize,
    pub rows_accepted: usize,
    pub used_line_fallback: bool,
}

/// Extracts the transactions of `pdf` with the extractor registered for `statement_type` and
/// writes them to `<out_dir>/<pdf name>.activity.csv`.
///
/// # Errors
/// - The statement type is not registered.
/// - `pdf` does not exist.
/// - The output directory or file cannot be written.
pub fn activity(
    registry: &ExtractorRegistry,
    statement_type: &str,
    pdf: &Path,
    out_dir: &Path,
) -> Result<Out<ActivitySummary>> {
    let extractor = registry.get(statement_type)?;
    utils::require_file(pdf, "Statement")?;

    let extraction = extractor.extract(pdf, out_dir)?;
    let summary = match &extraction.report {
        Some(report) => ActivitySummary {
            path: extraction.path.clone(),
            decoded: true,
            pages: report.pages,
            page_failures: report.page_failures,
            rows_attempted: report.rows_attempted(),
            rows_accepted: report.rows_accepted(),
            used_line_fallback: report.used_line_fallback,
        },
        None => ActivitySummary {
            path: extraction.path.clone(),
            decoded: false,
            pages: 0,
            page_failures: 0,
            rows_attempted: 0,
            rows_accepted: 0,
            used_line_fallback: false,
        },
    };
    Ok(Out::new(
        format!(
            "Wrote {} transactions to {}",
            summary.rows_accepted,
            summary.path.display()
        ),
        summary,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnsupportedStatementType;
    use crate::extract::{Decoder, Document, Table};
    use crate::extract::StatementExtractor;

    struct TextDecoder(&'static str);

    struct TextDocument(&'static str);

    impl Decoder for TextDecoder {
        fn open(&self, _path: &Path) -> Result<Box<dyn Document>> {
            Ok(Box::new(TextDocument(self.0)))
        }
    }

    impl Document for TextDocument {
        fn page_count(&self) -> usize {
            1
        }

        fn tables(&self, _page: usize) -> Result<Vec<Table>> {
            Ok(Vec::new())
        }

        fn text(&self, _page: usize) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_activity() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = dir.path().join("statement.pdf");
        utils::write(&pdf, "%PDF-").unwrap();
        let mut registry = ExtractorRegistry::empty();
        registry.register(
            "Test",
            StatementExtractor::new(TextDecoder("03/01/24 COFFEE SHOP 4.50\n03/02/24 NOTHING")),
        );

        let out = activity(&registry, "test", &pdf, &dir.path().join("out")).unwrap();
        let summary = out.structure().unwrap();
        assert!(summary.decoded);
        assert_eq!(summary.rows_attempted, 2);
        assert_eq!(summary.rows_accepted, 1);
        assert!(summary.used_line_fallback);
        assert_eq!(summary.path, dir.path().join("out").join("statement.activity.csv"));
    }

    #[test]
    fn test_activity_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = ExtractorRegistry::with_defaults();

        let err = activity(&registry, "wells", Path::new("x.pdf"), dir.path()).unwrap_err();
        assert!(err.downcast_ref::<UnsupportedStatementType>().is_some());

        let err = activity(&registry, "chase", &dir.path().join("x.pdf"), dir.path()).unwrap_err();
        assert!(err.to_string().starts_with("Statement not found"));
    }

    #[test]
    fn test_undecodable_statement_gives_header_only_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = dir.path().join("garbage.pdf");
        utils::write(&pdf, "this is not a pdf").unwrap();
        let registry = ExtractorRegistry::with_defaults();

        let out = activity(&registry, "chase", &pdf, dir.path()).unwrap();
        let summary = out.structure().unwrap();
        assert!(!summary.decoded);
        assert_eq!(
            utils::read(&summary.path).unwrap(),
            "transaction_date,post_date,description,amount,balance,raw\n"
        );
    }
}
