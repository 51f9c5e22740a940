use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::types::StoreLocator;

use super::{Header, RowStore, Sheet, StoreError, StoredRow};

type Values = Vec<Vec<String>>;

/// In-process row store for fixture mode and tests.
///
/// Tables are kept as raw value grids, header first, the same shape the
/// spreadsheet API returns.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, HashMap<String, Values>>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a table
    pub fn put_table<R, C>(&self, locator: &str, table: &str, values: R)
    where
        R: IntoIterator<Item = Vec<C>>,
        C: Into<String>,
    {
        let values: Values = values
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();

        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        documents
            .entry(locator.to_string())
            .or_default()
            .insert(table.to_string(), values);
    }

    /// Raw values of a table, header first
    pub fn snapshot(&self, locator: &str, table: &str) -> Option<Values> {
        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        documents.get(locator).and_then(|d| d.get(table)).cloned()
    }

    /// Simulate the store being unreachable; every call then fails
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn with_table<T>(
        &self,
        locator: &StoreLocator,
        table: &str,
        f: impl FnOnce(&mut Values) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.ensure_available()?;
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        let values = documents
            .get_mut(locator.as_str())
            .and_then(|d| d.get_mut(table))
            .ok_or_else(|| StoreError::TableMissing {
                locator: locator.to_string(),
                table: table.to_string(),
            })?;
        f(values)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                message: "memory store offline".to_string(),
            });
        }
        Ok(())
    }
}

fn data_index(values: &Values, number: usize) -> Result<usize, StoreError> {
    // values[0] is the header, so data row n lives at index n
    if number == 0 || number >= values.len() {
        return Err(StoreError::Api {
            status: 400,
            message: format!("row {} out of range", number),
        });
    }
    Ok(number)
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn table_exists(&self, locator: &StoreLocator, table: &str) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        Ok(documents
            .get(locator.as_str())
            .map(|d| d.contains_key(table))
            .unwrap_or(false))
    }

    async fn read_header(&self, locator: &StoreLocator, table: &str) -> Result<Header, StoreError> {
        let first = self.with_table(locator, table, |values| Ok(values.first().cloned()))?;
        match first {
            Some(cells) => Header::parse(cells),
            None => Err(StoreError::Unreadable("header row missing".to_string())),
        }
    }

    async fn read_rows(&self, locator: &StoreLocator, table: &str) -> Result<Sheet, StoreError> {
        let values = self.with_table(locator, table, |values| Ok(values.clone()))?;
        Sheet::from_values(values)
    }

    async fn append_row(&self, locator: &StoreLocator, table: &str, cells: Vec<String>) -> Result<(), StoreError> {
        self.with_table(locator, table, |values| {
            values.push(cells);
            Ok(())
        })
    }

    async fn patch_row(&self, locator: &StoreLocator, table: &str, row: &StoredRow) -> Result<(), StoreError> {
        self.with_table(locator, table, |values| {
            let index = data_index(values, row.number)?;
            values[index] = row.cells.clone();
            Ok(())
        })
    }

    async fn delete_row(&self, locator: &StoreLocator, table: &str, number: usize) -> Result<(), StoreError> {
        self.with_table(locator, table, |values| {
            let index = data_index(values, number)?;
            values.remove(index);
            Ok(())
        })
    }
}
