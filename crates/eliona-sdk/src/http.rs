// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Plain HTTP requests to third-party services.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::HttpError;

/// A prepared request, sent with [`read`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    method: Method,
    url: String,
    body: Option<Vec<u8>>,
    bearer: Option<String>,
}

impl HttpRequest {
    /// GET request without authentication.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
            bearer: None,
        }
    }

    /// POST request with `body` as JSON payload.
    pub fn post<B: Serialize + ?Sized>(url: impl Into<String>, body: &B) -> Result<Self, HttpError> {
        let url = url.into();
        let payload = serde_json::to_vec(body).map_err(|e| {
            error!(error = %e, url = %url, "Failed to marshal body");
            e
        })?;
        Ok(Self {
            method: Method::POST,
            url,
            body: Some(payload),
            bearer: None,
        })
    }

    /// Authenticate with a bearer token.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// Send `request` and return the response body.
///
/// Any status other than 200 is an error. With `check_certificate` false,
/// invalid TLS certificates are accepted.
pub async fn read(
    request: &HttpRequest,
    timeout: Duration,
    check_certificate: bool,
) -> Result<Vec<u8>, HttpError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(!check_certificate)
        .build()
        .map_err(HttpError::Client)?;

    let mut builder = client.request(request.method.clone(), &request.url);
    if let Some(token) = &request.bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(body) = &request.body {
        builder = builder
            .header(CONTENT_TYPE, "application/json")
            .body(body.clone());
    }

    let request_error = |source: reqwest::Error| {
        error!(error = %source, url = %request.url, "Error requesting url");
        HttpError::Request {
            url: request.url.clone(),
            source,
        }
    };

    let response = builder.send().await.map_err(request_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(request_error)?;

    if status != reqwest::StatusCode::OK {
        error!(status = status.as_u16(), url = %request.url, "Error request code");
        return Err(HttpError::Status {
            status: status.as_u16(),
            url: request.url.clone(),
        });
    }

    debug!(url = %request.url, bytes = body.len(), "Read response");
    Ok(body.to_vec())
}
