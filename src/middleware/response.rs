use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::types::Row;

/// Successful table API responses
#[derive(Debug)]
pub enum ApiResponse {
    /// `{ data: [...], error: "" }`
    Data(Value),
    /// `{ message: "..." }`
    Message(String),
}

impl ApiResponse {
    pub fn rows(rows: Vec<Row>) -> Self {
        ApiResponse::Data(json!(rows))
    }

    pub fn added() -> Self {
        ApiResponse::Data(json!(["Data added successfully"]))
    }

    pub fn updated(count: usize) -> Self {
        ApiResponse::Message(format!("Updated {} rows", count))
    }

    pub fn deleted(count: usize) -> Self {
        ApiResponse::Message(format!("Deleted {} rows", count))
    }

    pub fn to_json(&self) -> Value {
        match self {
            ApiResponse::Data(data) => json!({ "data": data, "error": "" }),
            ApiResponse::Message(message) => json!({ "message": message }),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self.to_json())).into_response()
    }
}

pub type ApiResult = Result<ApiResponse, crate::error::ApiError>;
