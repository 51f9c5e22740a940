use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, RawQuery, State},
    http::{Method, Uri},
};
use serde_json::{Map, Value};
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::filter::{parse_filters, FilterMap};
use crate::middleware::authorize::authorize;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::store::TableAdapter;
use crate::types::Row;

/// Where a request is in its single pass through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ParsingPath,
    Authorizing,
    ParsingFilter,
    Dispatching,
    Responding,
}

/// Query parameters of a table request
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TableQuery {
    /// Every `key` value concatenated, in order
    pub key: Option<String>,
    /// Raw `filter` values, in order
    pub filters: Vec<String>,
}

impl TableQuery {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut query = TableQuery::default();
        let Some(raw) = raw else {
            return query;
        };

        for (name, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match &*name {
                "key" => query.key.get_or_insert_with(String::new).push_str(&value),
                "filter" => query.filters.push(value.into_owned()),
                _ => {}
            }
        }
        query
    }
}

/// ANY /:username/:project/:table
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    path: Result<Path<String>, PathRejection>,
    RawQuery(raw_query): RawQuery,
    body: Bytes,
) -> ApiResult {
    let span = info_span!("table_request", id = %Uuid::new_v4(), %method, path = %uri.path());
    // A path that does not decode names no table; it fails as malformed after the key check
    let path = match path {
        Ok(Path(path)) => path,
        Err(rejection) => {
            debug!("Undecodable path {}: {}", uri.path(), rejection);
            String::new()
        }
    };
    run(state, method, path, raw_query, body).instrument(span).await
}

async fn run(state: AppState, method: Method, path: String, raw_query: Option<String>, body: Bytes) -> ApiResult {
    debug!(stage = ?Stage::ParsingPath);
    let query = TableQuery::parse(raw_query.as_deref());

    debug!(stage = ?Stage::Authorizing);
    let table = authorize(&state, query.key.as_deref(), &path).await?;

    debug!(stage = ?Stage::ParsingFilter, count = query.filters.len());
    let filter = parse_filters(&query.filters);

    debug!(stage = ?Stage::Dispatching);
    let adapter = TableAdapter::new(state.store.clone(), table.store_locator, table.locator.table);
    let result = match method {
        Method::GET => list(&adapter, &filter).await,
        Method::POST => insert(&adapter, &body).await,
        Method::PATCH => update(&adapter, &filter, &body).await,
        Method::DELETE => delete(&adapter, &filter).await,
        _ => Err(ApiError::MethodNotAllowed),
    };

    debug!(stage = ?Stage::Responding, ok = result.is_ok());
    result
}

async fn list(adapter: &TableAdapter, filter: &FilterMap) -> ApiResult {
    let rows = adapter.list(filter).await?;
    Ok(ApiResponse::rows(rows))
}

async fn insert(adapter: &TableAdapter, body: &[u8]) -> ApiResult {
    let rows = match parse_body(body)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(row_from_json(map)),
                _ => Err(ApiError::malformed_body("Array of row objects expected")),
            })
            .collect::<Result<Vec<Row>, ApiError>>()?,
        _ => return Err(ApiError::malformed_body("Array body expected")),
    };

    if adapter.insert(&rows).await? {
        Ok(ApiResponse::added())
    } else {
        Err(ApiError::InsertFailed)
    }
}

async fn update(adapter: &TableAdapter, filter: &FilterMap, body: &[u8]) -> ApiResult {
    if filter.is_empty() {
        return Err(ApiError::FilterRequired);
    }

    let patch = match parse_body(body)? {
        Value::Object(map) => row_from_json(map),
        Value::Array(_) => return Err(ApiError::malformed_body("Singular update object expected")),
        _ => return Err(ApiError::body_missing()),
    };

    let count = adapter.update(filter, &patch).await?;
    Ok(ApiResponse::updated(count))
}

async fn delete(adapter: &TableAdapter, filter: &FilterMap) -> ApiResult {
    let count = adapter.delete(filter).await?;
    Ok(ApiResponse::deleted(count))
}

/// Decode a JSON body. Absent, unparseable, null and empty bodies are all
/// reported as missing.
fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::body_missing())?;
    let empty = match &value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    };
    if empty {
        return Err(ApiError::body_missing());
    }
    Ok(value)
}

/// Cells are text: scalars keep their JSON spelling, nulls are dropped,
/// nested values are stored as JSON text
fn row_from_json(map: Map<String, Value>) -> Row {
    map.into_iter()
        .filter_map(|(attribute, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                nested => nested.to_string(),
            };
            Some((attribute, text))
        })
        .collect()
}
