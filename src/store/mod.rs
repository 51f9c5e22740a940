//! Row store collaborator and the adapter that maps table operations onto it.
//!
//! A store holds documents (addressed by `StoreLocator`), each holding named
//! tables. The first row of a table is its header; data rows are addressed by
//! their 1-based row number in the table, so deleting a row renumbers every
//! row after it.

pub mod adapter;
pub mod google;
pub mod google_auth;
pub mod memory;

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

use crate::types::{Row, StoreLocator};

pub use adapter::TableAdapter;
pub use google::GoogleSheetsStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Header row missing or duplicated; reads treat the table as empty
    #[error("Table unreadable: {0}")]
    Unreadable(String),

    #[error("Table '{table}' not found in document '{locator}'")]
    TableMissing { locator: String, table: String },

    #[error("Store authentication failed: {0}")]
    Auth(String),

    #[error("Store API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid store configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Column names of a table, taken from its first row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    /// Validate a raw header row. Blank cells name no attribute; a header with
    /// no names at all, or the same name twice, cannot be read.
    pub fn parse(cells: Vec<String>) -> Result<Self, StoreError> {
        let columns: Vec<String> = cells.into_iter().map(|c| c.trim().to_string()).collect();

        let mut seen = HashSet::new();
        for name in columns.iter().filter(|c| !c.is_empty()) {
            if !seen.insert(name.as_str()) {
                return Err(StoreError::Unreadable(format!("duplicate header '{}'", name)));
            }
        }
        if seen.is_empty() {
            return Err(StoreError::Unreadable("header row missing".to_string()));
        }

        Ok(Self { columns })
    }

    /// Named attributes in column order
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str).filter(|c| !c.is_empty())
    }

    pub fn contains(&self, attribute: &str) -> bool {
        !attribute.is_empty() && self.columns.iter().any(|c| c == attribute)
    }

    pub fn position(&self, attribute: &str) -> Option<usize> {
        if attribute.is_empty() {
            return None;
        }
        self.columns.iter().position(|c| c == attribute)
    }

    /// Width in columns, including unnamed ones
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Project raw cells onto named attributes. Empty cells read as `""`;
    /// columns past the end of a short row are left out.
    pub fn project(&self, cells: &[String]) -> Row {
        self.columns
            .iter()
            .zip(cells.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Restrict a row to known attributes and lay it out as cells
    pub fn to_cells(&self, row: &Row) -> Vec<String> {
        self.columns
            .iter()
            .map(|name| {
                if name.is_empty() {
                    String::new()
                } else {
                    row.get(name).cloned().unwrap_or_default()
                }
            })
            .collect()
    }
}

/// A data row as stored, with its row number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    /// 1-based position among data rows (the header is not counted)
    pub number: usize,
    pub cells: Vec<String>,
}

/// Header plus data rows of one table
#[derive(Debug, Clone)]
pub struct Sheet {
    pub header: Header,
    pub rows: Vec<StoredRow>,
}

impl Sheet {
    /// Build from raw values where the first row is the header
    pub fn from_values(mut values: Vec<Vec<String>>) -> Result<Self, StoreError> {
        if values.is_empty() {
            return Err(StoreError::Unreadable("header row missing".to_string()));
        }
        let header = Header::parse(values.remove(0))?;
        let rows = values
            .into_iter()
            .enumerate()
            .map(|(i, cells)| StoredRow { number: i + 1, cells })
            .collect();
        Ok(Self { header, rows })
    }
}

#[async_trait]
pub trait RowStore: Send + Sync {
    async fn table_exists(&self, locator: &StoreLocator, table: &str) -> Result<bool, StoreError>;

    async fn read_header(&self, locator: &StoreLocator, table: &str) -> Result<Header, StoreError>;

    async fn read_rows(&self, locator: &StoreLocator, table: &str) -> Result<Sheet, StoreError>;

    /// Append one row after the last data row
    async fn append_row(&self, locator: &StoreLocator, table: &str, cells: Vec<String>) -> Result<(), StoreError>;

    /// Overwrite the cells of one existing data row
    async fn patch_row(&self, locator: &StoreLocator, table: &str, row: &StoredRow) -> Result<(), StoreError>;

    /// Remove one data row; later rows move up by one
    async fn delete_row(&self, locator: &StoreLocator, table: &str, number: usize) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn header_rejects_missing_and_duplicate_names() {
        assert!(matches!(Header::parse(vec![]), Err(StoreError::Unreadable(_))));
        assert!(matches!(Header::parse(cells(&["", " "])), Err(StoreError::Unreadable(_))));
        assert!(matches!(Header::parse(cells(&["a", "b", "a"])), Err(StoreError::Unreadable(_))));
    }

    #[test]
    fn header_skips_blank_columns() {
        let header = Header::parse(cells(&["title", "", "done"])).unwrap();
        assert_eq!(header.attributes().collect::<Vec<_>>(), vec!["title", "done"]);
        assert_eq!(header.width(), 3);
        assert!(!header.contains(""));

        let row = header.project(&cells(&["write", "scratch", "true"]));
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("done").map(String::as_str), Some("true"));
    }

    #[test]
    fn projection_keeps_empty_cells_and_drops_missing_ones() {
        let header = Header::parse(cells(&["title", "done", "owner"])).unwrap();
        let row = header.project(&cells(&["write", ""]));
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("title").map(String::as_str), Some("write"));
        assert_eq!(row.get("done").map(String::as_str), Some(""));
        assert!(!row.contains_key("owner"));

        let row = header.project(&cells(&["plan", "", "bob"]));
        assert_eq!(row.get("done").map(String::as_str), Some(""));
        assert_eq!(row.get("owner").map(String::as_str), Some("bob"));
    }

    #[test]
    fn to_cells_restricts_to_header() {
        let header = Header::parse(cells(&["title", "", "done"])).unwrap();
        let mut row = Row::new();
        row.insert("done".to_string(), "false".to_string());
        row.insert("priority".to_string(), "high".to_string());
        assert_eq!(header.to_cells(&row), cells(&["", "", "false"]));
    }

    #[test]
    fn sheet_numbers_rows_after_header() {
        let sheet = Sheet::from_values(vec![cells(&["title"]), cells(&["a"]), cells(&["b"])]).unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].number, 1);
        assert_eq!(sheet.rows[1].number, 2);
    }
}
