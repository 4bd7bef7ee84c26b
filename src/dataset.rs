//! Tabular article data and its CSV boundary.
//!
//! Exports are UTF-8 with a byte-order mark, a header row and no index
//! column. Imports accept any column set; an empty cell, or one of the
//! usual spreadsheet NA markers, is a missing value.

use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;
use thiserror::Error;

use crate::scraping::types::ArticleRecord;

/// UTF-8 byte-order mark written in front of every export.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
/// MIME type offered with downloads.
pub const CSV_MIME: &str = "text/csv";
/// File name offered with downloads of harvested news.
pub const EXPORT_FILE_NAME: &str = "moneydj_news.csv";

/// Cell values read as missing (the pandas `read_csv` default set).
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Title column name.
pub const TITLE_COLUMN: &str = "title";
/// Article body column name.
pub const ARTICLE_COLUMN: &str = "article";

/// Errors crossing the CSV boundary.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Malformed CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Writer flush failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required column is absent.
    #[error("CSV has no '{0}' column")]
    MissingColumn(String),
}

/// In-memory table with named columns.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ArticleTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ArticleTable {
    /// Build a `title, article` table in crawl order.
    #[must_use]
    pub fn from_records(records: &[ArticleRecord]) -> Self {
        Self {
            headers: vec![TITLE_COLUMN.to_string(), ARTICLE_COLUMN.to_string()],
            rows: records
                .iter()
                .map(|r| vec![r.title.clone(), r.article.clone()])
                .collect(),
        }
    }

    /// Parse an uploaded CSV file.
    ///
    /// # Errors
    /// Returns an error if the bytes are not valid CSV.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, DatasetError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes);

        let headers = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Serialize as UTF-8 CSV with a byte-order mark.
    ///
    /// # Errors
    /// Returns an error if a row cannot be written.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, DatasetError> {
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .from_writer(UTF8_BOM.to_vec());

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }

        writer
            .into_inner()
            .map_err(|e| DatasetError::Io(e.into_error()))
    }

    /// Column names, in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Raw rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether a column with this name exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one column; `None` entries are missing cells.
    ///
    /// A cell is missing when the row is short or its value is one of
    /// [`MISSING_MARKERS`]. Returns `None` if the column does not exist.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).filter(|v| !is_missing(v)))
                .collect(),
        )
    }

    /// Map the table back to article records.
    ///
    /// # Errors
    /// Returns an error if the `title` or `article` column is missing.
    pub fn to_records(&self) -> Result<Vec<ArticleRecord>, DatasetError> {
        let titles = self
            .column(TITLE_COLUMN)
            .ok_or_else(|| DatasetError::MissingColumn(TITLE_COLUMN.to_string()))?;
        let articles = self
            .column(ARTICLE_COLUMN)
            .ok_or_else(|| DatasetError::MissingColumn(ARTICLE_COLUMN.to_string()))?;

        Ok(titles
            .into_iter()
            .zip(articles)
            .map(|(title, article)| ArticleRecord {
                title: title.unwrap_or_default().to_string(),
                article: article.unwrap_or_default().to_string(),
            })
            .collect())
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, article: &str) -> ArticleRecord {
        ArticleRecord {
            title: title.to_string(),
            article: article.to_string(),
        }
    }

    #[test]
    fn test_export_has_bom_and_no_index() {
        let table = ArticleTable::from_records(&[record("Fed holds", "Rates unchanged.")]);
        let bytes = table.to_csv_bytes().unwrap_or_default();

        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8_lossy(&bytes[UTF8_BOM.len()..]).replace("\r\n", "\n");
        assert_eq!(text, "title,article\nFed holds,Rates unchanged.\n");
    }

    #[test]
    fn test_round_trip_preserves_values() {
        let records = vec![
            record("台積電法說", "第一段\n第二段, 含逗號"),
            record("No title", "No content"),
            record("Quote \"here\"", "  spaced  "),
        ];
        let bytes = ArticleTable::from_records(&records)
            .to_csv_bytes()
            .unwrap_or_default();

        let parsed = ArticleTable::from_csv_bytes(&bytes).map(|t| t.to_records());
        assert!(matches!(parsed, Ok(Ok(ref back)) if *back == records));
    }

    #[test]
    fn test_empty_cells_are_missing() {
        let table = ArticleTable::from_csv_bytes(b"title,article\na,A\nb,\nc,B\nd,C\n");
        assert!(table.is_ok());
        if let Ok(table) = table {
            assert_eq!(
                table.column(ARTICLE_COLUMN),
                Some(vec![Some("A"), None, Some("B"), Some("C")])
            );
        }
    }

    #[test]
    fn test_na_markers_are_missing() {
        let table =
            ArticleTable::from_csv_bytes(b"title,article\na,NA\nb,nan\nc,\nd,N/A\ne,null\nf,Nan\n")
                .unwrap_or_default();
        assert_eq!(
            table.column(ARTICLE_COLUMN),
            Some(vec![None, None, None, None, None, Some("Nan")])
        );
    }

    #[test]
    fn test_headers_are_not_trimmed() {
        let table = ArticleTable::from_csv_bytes(b"title, article\nx,y\n").unwrap_or_default();
        assert_eq!(table.headers(), ["title".to_string(), " article".to_string()]);
        assert!(!table.has_column(ARTICLE_COLUMN));
        assert!(matches!(table.to_records(), Err(DatasetError::MissingColumn(c)) if c == "article"));
    }

    #[test]
    fn test_missing_column() {
        let table = ArticleTable::from_csv_bytes(b"headline,body\nx,y\n").unwrap_or_default();
        assert!(!table.has_column(ARTICLE_COLUMN));
        assert_eq!(table.column(ARTICLE_COLUMN), None);
        assert!(matches!(table.to_records(), Err(DatasetError::MissingColumn(c)) if c == "title"));
    }

    #[test]
    fn test_ragged_rows_are_tolerated() {
        let table = ArticleTable::from_csv_bytes(b"title,article\nonly-title\n").unwrap_or_default();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column(ARTICLE_COLUMN), Some(vec![None]));
    }
}
