// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! User environment of requests coming from the Eliona frontend.
//!
//! The frontend forwards a JWT, either as bearer token or in the
//! `elionaAuthorization` cookie. The platform proxy has verified it already,
//! so claims are decoded without checking the signature.
//!
//! ```no_run
//! use axum::{Router, middleware, routing::get};
//! use eliona_sdk::frontend::{CurrentEnvironment, environment_layer};
//!
//! async fn whoami(CurrentEnvironment(env): CurrentEnvironment) -> String {
//!     env.map(|env| env.user_id).unwrap_or_default()
//! }
//!
//! let app: Router = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(middleware::from_fn(environment_layer));
//! ```

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::FrontendError;

/// Cookie carrying the token when no `Authorization` header is sent.
pub const AUTHORIZATION_COOKIE: &str = "elionaAuthorization";

/// Claims of the frontend token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub aud: String,
    pub exp: i64,
    pub iss: String,
    pub role: String,
    pub cust_id: String,
    pub proj_id: String,
    pub role_id: String,
    pub user_id: String,
    pub entitlements: String,
}

/// Token of an `Authorization` header value of the form `Bearer <token>`.
///
/// The scheme is matched case-insensitively; anything other than exactly two
/// space separated parts yields `None`.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Token from the `Authorization` header, falling back to the
/// [`AUTHORIZATION_COOKIE`].
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token);
    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTHORIZATION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Decode the environment claims of a token without verifying it.
pub fn decode_environment(token: &str) -> Result<Environment, FrontendError> {
    let data = jsonwebtoken::dangerous::insecure_decode::<Environment>(token)?;
    Ok(data.claims)
}

/// Environment of a request from its headers.
pub fn parse_environment(headers: &HeaderMap) -> Result<Environment, FrontendError> {
    let token = bearer_token(headers).ok_or(FrontendError::MissingToken)?;
    decode_environment(&token)
}

/// Middleware storing the request's [`Environment`] as extension.
///
/// Requests without a valid token pass through unchanged. Use with
/// `axum::middleware::from_fn`.
pub async fn environment_layer(mut request: Request, next: Next) -> Response {
    match parse_environment(request.headers()) {
        Ok(environment) => {
            request.extensions_mut().insert(environment);
        }
        // local requests come without any token
        Err(FrontendError::MissingToken) => debug!("Request without environment"),
        Err(e) => error!(error = %e, "Failed to parse environment"),
    }
    next.run(request).await
}

/// Environment stored by [`environment_layer`], if any.
pub fn get_environment(request: &Request) -> Option<&Environment> {
    request.extensions().get::<Environment>()
}

/// Extractor for the environment stored by [`environment_layer`].
///
/// Always succeeds, with `None` when the request carried no valid token.
pub struct CurrentEnvironment(pub Option<Environment>);

impl<S> FromRequestParts<S> for CurrentEnvironment
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentEnvironment(parts.extensions.get::<Environment>().cloned()))
    }
}
