// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the API client.

use std::time::Duration;

use crate::error::{ApiError, Result};

/// Endpoint used when `API_ENDPOINT` is not set.
pub const DEFAULT_ENDPOINT: &str = "http://api-v2:3000/v2";

/// Configuration for [`ElionaClient`](crate::ElionaClient).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL including the version segment, without trailing slash.
    pub endpoint: String,
    /// Value of the `X-API-Key` header. Omitted when `None`.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `API_ENDPOINT`: Base URL (default: "http://api-v2:3000/v2")
    /// - `API_TOKEN`: API key sent as `X-API-Key`
    /// - `API_TIMEOUT_MS`: Request timeout in milliseconds (default: 30000)
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("API_ENDPOINT")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let api_key = std::env::var("API_TOKEN").ok().filter(|v| !v.is_empty());

        let request_timeout_ms: u64 = std::env::var("API_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .map_err(|e| ApiError::Config(format!("invalid API_TIMEOUT_MS: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            request_timeout: Duration::from_millis(request_timeout_ms),
        })
    }

    /// Set the base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
