// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for eliona-sdk.

use std::path::PathBuf;

use eliona_api::ApiError;
use eliona_db::DbError;
use thiserror::Error;

/// Result type using SdkError.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Error returned by user callbacks (asset nodes, init steps).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// General SDK errors.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Eliona API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Database access failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file did not contain the expected JSON.
    #[error("failed to parse {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while creating assets and writing their data.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Eliona API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Database access failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Reading a definition file failed.
    #[error(transparent)]
    Sdk(#[from] SdkError),

    /// Attribute values could not be converted to JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Two assets of one batch share a GAI.
    #[error("duplicate GAI in batch: {0}")]
    DuplicateGai(String),

    /// Parent references form a cycle.
    #[error("cycle detected at asset {0}")]
    Cycle(String),

    /// The bulk response did not contain an asset that was sent.
    #[error("did not find GAI {0} in upserted assets")]
    MissingGai(String),

    /// The API returned an asset without a usable id.
    #[error("upserted asset {0} has no id")]
    MissingId(String),

    /// A callback of an asset node failed.
    #[error("asset {gai}: {source}")]
    Node {
        gai: String,
        #[source]
        source: BoxError,
    },
}

/// Errors raised during app initialization and patching.
#[derive(Debug, Error)]
pub enum AppError {
    /// Eliona API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Database helper failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Driver error (transaction handling).
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Reading the app metadata failed.
    #[error(transparent)]
    Sdk(#[from] SdkError),

    /// An init or patch step failed; the transaction was rolled back.
    #[error("step {index} failed: {source}")]
    Step {
        index: usize,
        #[source]
        source: BoxError,
    },
}

/// Errors reading the environment of a frontend request.
#[derive(Debug, Error)]
pub enum FrontendError {
    /// Neither a bearer token nor the authorization cookie was sent.
    #[error("no bearer token or authorization cookie in request")]
    MissingToken,

    /// The token could not be decoded into environment claims.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Errors of plain HTTP requests.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The HTTP client could not be built.
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Sending the request or reading the body failed.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a status other than 200.
    #[error("error request code {status} for request to {url}")]
    Status { status: u16, url: String },

    /// The request body could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors of the Kafka helpers.
#[cfg(feature = "kafka")]
#[derive(Debug, Error)]
pub enum KafkaError {
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// The message value could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
