//! Tabular results and CSV export
//!
//! Every operation hands its rows to the front end as a [`ResultTable`]: a
//! title, column headers and string cells. The same table is printed,
//! serialized to JSON, or exported as CSV (header row, no index column).

use chrono::NaiveDateTime;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Row types that render into a [`ResultTable`]
pub trait Tabular {
    /// Column headers, in display order
    fn headers() -> Vec<&'static str>;

    /// Cells for this row, one per header
    fn cells(&self) -> Vec<String>;
}

/// Errors raised while exporting a table
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// A rendered result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    /// Human-readable title
    pub title: String,

    /// Column headers
    pub columns: Vec<String>,

    /// Rows of cells
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// Create an empty table with the given headers
    pub fn new(title: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            title: title.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Render typed rows
    pub fn from_rows<T: Tabular>(title: impl Into<String>, rows: &[T]) -> Self {
        Self {
            title: title.into(),
            columns: T::headers().into_iter().map(str::to_string).collect(),
            rows: rows.iter().map(Tabular::cells).collect(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Cells of one column, by header name
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Serialize as CSV with a header row
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(Vec::new());

        writer
            .write_record(&self.columns)
            .map_err(|err| ExportError::Csv(err.to_string()))?;

        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|err| ExportError::Csv(err.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|err| ExportError::Csv(err.to_string()))?;

        String::from_utf8(bytes).map_err(|err| ExportError::Csv(err.to_string()))
    }

    /// Write the CSV into `dir` under a timestamped file name
    pub fn write_csv(
        &self,
        dir: &Path,
        prefix: &str,
        at: &NaiveDateTime,
    ) -> Result<PathBuf, ExportError> {
        let csv = self.to_csv()?;

        std::fs::create_dir_all(dir).map_err(|e| ExportError::Io(e.to_string()))?;
        let path = dir.join(export_file_name(prefix, at));
        std::fs::write(&path, csv).map_err(|e| ExportError::Io(e.to_string()))?;

        Ok(path)
    }

    /// Serialize to a pretty JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.csv`
pub fn export_file_name(prefix: &str, at: &NaiveDateTime) -> String {
    format!("{}_{}.csv", prefix, at.format("%Y%m%d_%H%M%S"))
}
