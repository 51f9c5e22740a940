use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::StoreConfig;
use crate::types::StoreLocator;

use super::google_auth::AccessTokenSource;
use super::{Header, RowStore, Sheet, StoreError, StoredRow};

/// Row store backed by the Google Sheets v4 REST API.
///
/// A project's store locator is the spreadsheet id and each table is a sheet
/// (tab) of that spreadsheet, addressed by title.
pub struct GoogleSheetsStore {
    http: reqwest::Client,
    api_base: Url,
    tokens: AccessTokenSource,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId")]
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl GoogleSheetsStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let tokens = AccessTokenSource::from_config(config)?;
        Self::with_tokens(config, tokens)
    }

    pub fn with_tokens(config: &StoreConfig, tokens: AccessTokenSource) -> Result<Self, StoreError> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| StoreError::Config(format!("invalid SHEETS_API_BASE '{}': {}", config.api_base, e)))?;
        if api_base.cannot_be_a_base() {
            return Err(StoreError::Config(format!("SHEETS_API_BASE '{}' cannot be a base URL", config.api_base)));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { http, api_base, tokens })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T, StoreError> {
        let token = self.tokens.token(&self.http).await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn send_json(&self, method: reqwest::Method, url: Url, body: serde_json::Value) -> Result<(), StoreError> {
        let token = self.tokens.token(&self.http).await?;
        let response = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn sheets(&self, locator: &StoreLocator) -> Result<Vec<SheetProperties>, StoreError> {
        let mut url = self.endpoint(&[locator.as_str()]);
        url.query_pairs_mut().append_pair("fields", "sheets.properties(sheetId,title)");

        let meta: SpreadsheetMeta = self.get_json(url).await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    async fn sheet_id(&self, locator: &StoreLocator, table: &str) -> Result<i64, StoreError> {
        self.sheets(locator)
            .await?
            .into_iter()
            .find(|s| s.title == table)
            .map(|s| s.sheet_id)
            .ok_or_else(|| StoreError::TableMissing {
                locator: locator.to_string(),
                table: table.to_string(),
            })
    }

    async fn values(&self, locator: &StoreLocator, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.endpoint(&[locator.as_str(), "values", range]);
        let values: ValueRange = self.get_json(url).await?;
        Ok(values.values)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Sheet title quoted for A1 notation
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Column letters for a 1-based column index: 1 -> A, 26 -> Z, 27 -> AA
pub fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        name.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// A1 range covering one data row; row 1 of the sheet is the header
pub fn row_range(title: &str, number: usize, width: usize) -> String {
    let sheet_row = number + 1;
    format!(
        "{}!A{}:{}{}",
        quote_title(title),
        sheet_row,
        column_name(width.max(1)),
        sheet_row
    )
}

#[async_trait]
impl RowStore for GoogleSheetsStore {
    async fn table_exists(&self, locator: &StoreLocator, table: &str) -> Result<bool, StoreError> {
        Ok(self.sheets(locator).await?.iter().any(|s| s.title == table))
    }

    async fn read_header(&self, locator: &StoreLocator, table: &str) -> Result<Header, StoreError> {
        let range = format!("{}!1:1", quote_title(table));
        let mut values = self.values(locator, &range).await?;
        if values.is_empty() {
            return Err(StoreError::Unreadable("header row missing".to_string()));
        }
        Header::parse(values.remove(0))
    }

    async fn read_rows(&self, locator: &StoreLocator, table: &str) -> Result<Sheet, StoreError> {
        let values = self.values(locator, &quote_title(table)).await?;
        debug!("Read {} value rows from {}/{}", values.len(), locator, table);
        Sheet::from_values(values)
    }

    async fn append_row(&self, locator: &StoreLocator, table: &str, cells: Vec<String>) -> Result<(), StoreError> {
        let range = format!("{}!A1:append", quote_title(table));
        let mut url = self.endpoint(&[locator.as_str(), "values", &range]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        self.send_json(reqwest::Method::POST, url, json!({ "values": [cells] }))
            .await
    }

    async fn patch_row(&self, locator: &StoreLocator, table: &str, row: &StoredRow) -> Result<(), StoreError> {
        let range = row_range(table, row.number, row.cells.len());
        let mut url = self.endpoint(&[locator.as_str(), "values", &range]);
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        self.send_json(
            reqwest::Method::PUT,
            url,
            json!({ "range": range, "majorDimension": "ROWS", "values": [row.cells] }),
        )
        .await
    }

    async fn delete_row(&self, locator: &StoreLocator, table: &str, number: usize) -> Result<(), StoreError> {
        let sheet_id = self.sheet_id(locator, table).await?;
        let batch = format!("{}:batchUpdate", locator.as_str());
        let url = self.endpoint(&[&batch]);

        // Dimension indexes are 0-based over the whole sheet, header included
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": number,
                        "endIndex": number + 1,
                    }
                }
            }]
        });
        self.send_json(reqwest::Method::POST, url, body).await
    }
}
