//! Access to the pages of a statement PDF.
//!
//! The extractors only need two views of a page: the tables on it and its plain text. The
//! `Decoder` and `Document` traits describe exactly that.

use crate::extract::table::Table;
use crate::Result;
use anyhow::Context;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// A table needs at least this many cells per line to be inferred from page text.
const MIN_TABLE_COLUMNS: usize = 3;

static CELL_GAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+|\s{2,}").expect("valid cell gap regex"));

/// Opens statement documents.
pub trait Decoder {
    /// Opens the document at `path`. An error means nothing can be read from the document.
    fn open(&self, path: &Path) -> Result<Box<dyn Document>>;
}

/// An opened document. Pages are zero-indexed. Reading one page may fail without affecting the
/// others.
pub trait Document {
    fn page_count(&self) -> usize;

    /// The tables found on `page`.
    fn tables(&self, page: usize) -> Result<Vec<Table>>;

    /// The plain text of `page`.
    fn text(&self, page: usize) -> Result<String>;
}

/// Decodes PDFs with `lopdf`.
///
/// `lopdf` renders the text of a page but has no notion of tables, so tables are inferred from
/// that text: a line is split into cells at tabs and at runs of two or more spaces, and
/// consecutive lines with at least three cells form one table. `extract_text` rarely keeps wide
/// column gaps, so most statements end up being read by the line fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfDecoder;

impl Decoder for LopdfDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn Document>> {
        let doc = lopdf::Document::load(path)
            .with_context(|| format!("Unable to open PDF {}", path.display()))?;
        let pages = doc.get_pages().keys().copied().collect();
        Ok(Box::new(LopdfDocument { doc, pages }))
    }
}

struct LopdfDocument {
    doc: lopdf::Document,
    /// 1-based page numbers, in order.
    pages: Vec<u32>,
}

impl Document for LopdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn tables(&self, page: usize) -> Result<Vec<Table>> {
        Ok(infer_tables(&self.text(page)?))
    }

    fn text(&self, page: usize) -> Result<String> {
        let number = *self
            .pages
            .get(page)
            .with_context(|| format!("There is no page at index {page}"))?;
        self.doc
            .extract_text(&[number])
            .with_context(|| format!("Unable to extract text from page {number}"))
    }
}

/// Groups runs of column-aligned lines in `text` into tables.
pub(crate) fn infer_tables(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Table = Vec::new();
    for line in text.lines() {
        let cells: Vec<Option<String>> = CELL_GAP_RE
            .split(line.trim())
            .map(|cell| Some(cell.to_string()))
            .collect();
        if cells.len() >= MIN_TABLE_COLUMNS {
            current.push(cells);
        } else if !current.is_empty() {
            tables.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tables.push(current);
    }
    tables
}
