use std::sync::Arc;
use tracing::{debug, warn};

use crate::filter::FilterMap;
use crate::types::{Row, StoreLocator};

use super::{RowStore, Sheet, StoreError, StoredRow};

/// List/insert/update/delete over one table of one document.
///
/// Reads that hit an unreadable table (no header row, or a duplicated header)
/// behave as if the table were empty: `list` returns nothing and `update` and
/// `delete` report zero rows. Callers cannot tell that apart from a filter
/// that matched nothing. Transport failures are returned as errors.
///
/// Writes go out one row at a time, in order, each awaited before the next.
/// A failure part way through leaves the earlier rows written.
pub struct TableAdapter {
    store: Arc<dyn RowStore>,
    locator: StoreLocator,
    table: String,
}

impl TableAdapter {
    pub fn new(store: Arc<dyn RowStore>, locator: StoreLocator, table: impl Into<String>) -> Self {
        Self {
            store,
            locator,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Rows matching the filter, projected to the header's attributes, in table order
    pub async fn list(&self, filter: &FilterMap) -> Result<Vec<Row>, StoreError> {
        let Some(sheet) = self.load().await? else {
            return Ok(Vec::new());
        };

        let rows = sheet
            .rows
            .iter()
            .map(|stored| sheet.header.project(&stored.cells))
            .filter(|row| filter.matches(row))
            .collect();
        Ok(rows)
    }

    /// Append rows in order, keeping only header attributes.
    /// Returns false when the header cannot be loaded.
    pub async fn insert(&self, rows: &[Row]) -> Result<bool, StoreError> {
        let header = match self.store.read_header(&self.locator, &self.table).await {
            Ok(header) => header,
            Err(StoreError::Unreadable(reason)) => {
                warn!("Cannot insert into '{}': {}", self.table, reason);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        for row in rows {
            let cells = header.to_cells(row);
            self.store.append_row(&self.locator, &self.table, cells).await?;
        }

        debug!("Inserted {} rows into '{}'", rows.len(), self.table);
        Ok(true)
    }

    /// Overwrite patch attributes on every matching row.
    ///
    /// Only attributes that already hold a value in the row, and have a
    /// non-empty value in the patch, are written. Returns the number of
    /// matching rows, whether or not any value changed.
    pub async fn update(&self, filter: &FilterMap, patch: &Row) -> Result<usize, StoreError> {
        let Some(sheet) = self.load().await? else {
            return Ok(0);
        };

        let selected = Self::select(&sheet, filter);
        let count = selected.len();

        for stored in selected {
            let mut changed = stored.clone();
            let mut touched = false;

            for attribute in sheet.header.attributes() {
                let Some(value) = patch.get(attribute).filter(|v| !v.is_empty()) else {
                    continue;
                };
                let Some(position) = sheet.header.position(attribute) else {
                    continue;
                };
                match changed.cells.get_mut(position) {
                    Some(cell) if !cell.is_empty() => {
                        *cell = value.clone();
                        touched = true;
                    }
                    _ => {}
                }
            }

            if touched {
                self.store.patch_row(&self.locator, &self.table, &changed).await?;
            }
        }

        debug!("Updated {} rows in '{}'", count, self.table);
        Ok(count)
    }

    /// Delete every matching row and return how many were removed
    pub async fn delete(&self, filter: &FilterMap) -> Result<usize, StoreError> {
        let Some(sheet) = self.load().await? else {
            return Ok(0);
        };

        let selected = Self::select(&sheet, filter);
        let count = selected.len();

        // Highest row first so the remaining numbers stay valid
        for stored in selected.iter().rev() {
            self.store.delete_row(&self.locator, &self.table, stored.number).await?;
        }

        debug!("Deleted {} rows from '{}'", count, self.table);
        Ok(count)
    }

    async fn load(&self) -> Result<Option<Sheet>, StoreError> {
        match self.store.read_rows(&self.locator, &self.table).await {
            Ok(sheet) => Ok(Some(sheet)),
            Err(StoreError::Unreadable(reason)) => {
                warn!("Treating '{}' as empty: {}", self.table, reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn select<'a>(sheet: &'a Sheet, filter: &FilterMap) -> Vec<&'a StoredRow> {
        sheet
            .rows
            .iter()
            .filter(|stored| filter.matches(&sheet.header.project(&stored.cells)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn filter(pairs: &[(&str, &str)]) -> FilterMap {
        pairs.iter().copied().collect()
    }

    fn tasks() -> (Arc<MemoryStore>, TableAdapter) {
        let store = Arc::new(MemoryStore::new());
        store.put_table(
            "doc-1",
            "tasks",
            vec![
                vec!["title", "done", "owner"],
                vec!["write", "true", "alice"],
                vec!["review", "false", "bob"],
                vec!["ship", "true", "bob"],
                vec!["plan", "false", ""],
            ],
        );
        let adapter = TableAdapter::new(store.clone(), StoreLocator::new("doc-1"), "tasks");
        (store, adapter)
    }

    fn titles(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.get("title").map(String::as_str).unwrap_or("")).collect()
    }

    #[tokio::test]
    async fn list_without_filter_returns_all_rows_in_order() {
        let (_, adapter) = tasks();
        let rows = adapter.list(&FilterMap::new()).await.unwrap();
        assert_eq!(titles(&rows), vec!["write", "review", "ship", "plan"]);
        assert_eq!(rows[0], row(&[("title", "write"), ("done", "true"), ("owner", "alice")]));
    }

    #[tokio::test]
    async fn list_returns_empty_middle_cells() {
        let store = Arc::new(MemoryStore::new());
        store.put_table("doc-1", "tasks", vec![vec!["title", "done", "owner"], vec!["plan", "", "bob"]]);
        let adapter = TableAdapter::new(store, StoreLocator::new("doc-1"), "tasks");

        let rows = adapter.list(&FilterMap::new()).await.unwrap();
        assert_eq!(rows, vec![row(&[("title", "plan"), ("done", ""), ("owner", "bob")])]);

        // an empty cell is not constrained by a filter on it
        let rows = adapter.list(&filter(&[("done", "true")])).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn list_filters_on_exact_values() {
        let (_, adapter) = tasks();
        let rows = adapter.list(&filter(&[("done", "true")])).await.unwrap();
        assert_eq!(titles(&rows), vec!["write", "ship"]);

        let rows = adapter.list(&filter(&[("done", "true"), ("owner", "bob")])).await.unwrap();
        assert_eq!(titles(&rows), vec!["ship"]);
    }

    #[tokio::test]
    async fn list_keeps_rows_with_empty_filtered_cell() {
        let (_, adapter) = tasks();
        let rows = adapter.list(&filter(&[("owner", "bob")])).await.unwrap();
        assert_eq!(titles(&rows), vec!["review", "ship", "plan"]);
    }

    #[tokio::test]
    async fn list_ignores_unknown_filter_attributes() {
        let (_, adapter) = tasks();
        let rows = adapter.list(&filter(&[("priority", "high")])).await.unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[tokio::test]
    async fn unreadable_table_reads_as_empty() {
        let store = Arc::new(MemoryStore::new());
        store.put_table("doc-1", "blank", Vec::<Vec<&str>>::new());
        store.put_table("doc-1", "dupes", vec![vec!["a", "a"], vec!["1", "2"]]);

        for table in ["blank", "dupes"] {
            let adapter = TableAdapter::new(store.clone(), StoreLocator::new("doc-1"), table);
            assert!(adapter.list(&FilterMap::new()).await.unwrap().is_empty());
            assert_eq!(adapter.update(&FilterMap::new(), &row(&[("a", "x")])).await.unwrap(), 0);
            assert_eq!(adapter.delete(&FilterMap::new()).await.unwrap(), 0);
            assert!(!adapter.insert(&[row(&[("a", "x")])]).await.unwrap());
        }
    }

    #[tokio::test]
    async fn insert_drops_unknown_keys_and_keeps_order() {
        let (store, adapter) = tasks();
        let ok = adapter
            .insert(&[
                row(&[("title", "test"), ("priority", "high")]),
                row(&[("title", "deploy"), ("done", "false")]),
            ])
            .await
            .unwrap();
        assert!(ok);

        let values = store.snapshot("doc-1", "tasks").unwrap();
        assert_eq!(values.len(), 7);
        assert_eq!(values[5], vec!["test", "", ""]);
        assert_eq!(values[6], vec!["deploy", "false", ""]);
    }

    #[tokio::test]
    async fn update_counts_matches_even_without_changes() {
        let (store, adapter) = tasks();
        let count = adapter
            .update(&filter(&[("owner", "bob")]), &row(&[("done", "true")]))
            .await
            .unwrap();
        // review, ship, plan (empty owner is unconstrained)
        assert_eq!(count, 3);

        let count = adapter
            .update(&filter(&[("title", "ship")]), &row(&[("done", "true")]))
            .await
            .unwrap();
        assert_eq!(count, 1);

        let values = store.snapshot("doc-1", "tasks").unwrap();
        assert_eq!(values[2], vec!["review", "true", "bob"]);
        assert_eq!(values[4], vec!["plan", "true", ""]);
    }

    #[tokio::test]
    async fn update_only_overwrites_present_attributes() {
        let (store, adapter) = tasks();
        let count = adapter
            .update(
                &filter(&[("title", "plan")]),
                &row(&[("owner", "carol"), ("done", "true"), ("priority", "high")]),
            )
            .await
            .unwrap();
        assert_eq!(count, 1);

        // owner was empty so it stays empty; priority is not a column
        let values = store.snapshot("doc-1", "tasks").unwrap();
        assert_eq!(values[4], vec!["plan", "true", ""]);
    }

    #[tokio::test]
    async fn update_without_matches_returns_zero() {
        let (_, adapter) = tasks();
        let count = adapter
            .update(&filter(&[("title", "nothing")]), &row(&[("done", "true")]))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn delete_removes_matches_and_preserves_order() {
        let (store, adapter) = tasks();
        let count = adapter.delete(&filter(&[("done", "true")])).await.unwrap();
        assert_eq!(count, 2);

        let rows = adapter.list(&FilterMap::new()).await.unwrap();
        assert_eq!(titles(&rows), vec!["review", "plan"]);
        assert_eq!(store.snapshot("doc-1", "tasks").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn delete_with_empty_filter_clears_table() {
        let (_, adapter) = tasks();
        assert_eq!(adapter.delete(&FilterMap::new()).await.unwrap(), 4);
        assert!(adapter.list(&FilterMap::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_table_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let adapter = TableAdapter::new(store, StoreLocator::new("doc-9"), "tasks");
        assert!(matches!(
            adapter.list(&FilterMap::new()).await,
            Err(StoreError::TableMissing { .. })
        ));
    }
}
