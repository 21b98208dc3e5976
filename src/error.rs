// Copyright (c) 2026 sitewatch
// Licensed under the MIT License. See LICENSE file in the project root.

//! API error taxonomy

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to HTTP callers.
///
/// Transient detector failures never appear here: the session layer degrades
/// to fallback responses instead. Only persistence and validation errors
/// propagate as explicit failures.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Record lookup for an unknown identifier
    #[error("{0} not found")]
    NotFound(String),

    /// Missing or invalid fields on a write operation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Persistence layer failure
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let resp = ApiError::NotFound("worker".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::Validation("name is required".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
