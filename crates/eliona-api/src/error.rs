// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for eliona-api.

use thiserror::Error;

/// Result type using ApiError.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can occur when calling the Eliona API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The API could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// Request timed out.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// API returned an error response.
    #[error("api error [{status}]: {message}")]
    Server { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Whether this error means the resource is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}
