// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for eliona-db.

use std::path::PathBuf;

use sqlx::error::BoxDynError;
use thiserror::Error;

/// Result type using DbError.
pub type Result<T> = std::result::Result<T, DbError>;

/// Errors raised by the database helpers.
#[derive(Debug, Error)]
pub enum DbError {
    /// Driver or server error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A bind argument could not be encoded.
    #[error("failed to encode argument: {0}")]
    Encode(BoxDynError),

    /// SQL file could not be read.
    #[error("failed to read sql file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration (connection string, pool size).
    #[error("configuration error: {0}")]
    Config(String),

    /// A value could not be converted to JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
