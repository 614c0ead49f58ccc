// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! ElionaClient for calling the Eliona REST API.

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::types::{App, Asset, AssetType, AssetTypeAttribute, Data, Patch, WidgetType};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Async client for the Eliona API.
///
/// Only the endpoints the SDK relies on are modeled. Every method maps one
/// HTTP call; HTTP 404 is reported as [`ApiError::NotFound`] so callers can
/// treat absence separately from failure.
#[derive(Debug, Clone)]
pub struct ElionaClient {
    http: reqwest::Client,
    base: Url,
    config: ApiConfig,
}

impl ElionaClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let base = Url::parse(&config.endpoint)
            .map_err(|e| ApiError::Config(format!("invalid API_ENDPOINT '{}': {}", config.endpoint, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Config(format!(
                "API_ENDPOINT '{}' cannot be used as base url",
                config.endpoint
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ApiConfig::from_env()?)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.config.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.config.request_timeout.as_millis() as u64)
            } else {
                ApiError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let message = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url));
        }
        Err(ApiError::Server {
            status: status.as_u16(),
            message: if message.is_empty() {
                status.to_string()
            } else {
                message
            },
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.execute(request).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Connection(format!("failed to read response body: {}", e)))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::UnexpectedResponse(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        self.execute(request).await?;
        Ok(())
    }

    async fn put_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PUT, self.url(segments)).json(body);
        self.send_json(request).await
    }

    // =========================================================================
    // Asset types
    // =========================================================================

    /// Create or update an asset type including its attributes.
    #[instrument(skip(self, asset_type), fields(asset_type = %asset_type.name))]
    pub async fn upsert_asset_type(&self, asset_type: &AssetType) -> Result<AssetType> {
        debug!("Upserting asset type");
        self.put_json(&["asset-types"], asset_type).await
    }

    /// List all asset types.
    #[instrument(skip(self))]
    pub async fn get_asset_types(&self) -> Result<Vec<AssetType>> {
        let request = self.request(Method::GET, self.url(&["asset-types"]));
        self.send_json(request).await
    }

    /// Create or update a single attribute of an asset type.
    #[instrument(skip(self, attribute), fields(attribute = %attribute.name))]
    pub async fn upsert_asset_type_attribute(
        &self,
        asset_type_name: &str,
        attribute: &AssetTypeAttribute,
    ) -> Result<AssetTypeAttribute> {
        debug!("Upserting asset type attribute");
        self.put_json(&["asset-types", asset_type_name, "attributes"], attribute)
            .await
    }

    // =========================================================================
    // Assets
    // =========================================================================

    /// Get an asset by id.
    #[instrument(skip(self))]
    pub async fn get_asset(&self, asset_id: i32) -> Result<Asset> {
        let request = self.request(Method::GET, self.url(&["assets", &asset_id.to_string()]));
        self.send_json(request).await
    }

    /// Create or update an asset identified by project and GAI.
    #[instrument(skip(self, asset), fields(gai = %asset.global_asset_identifier))]
    pub async fn upsert_asset(&self, asset: &Asset) -> Result<Asset> {
        debug!("Upserting asset");
        self.put_json(&["assets"], asset).await
    }

    /// Create or update many assets in one call, resolving parents by GAI.
    ///
    /// Parents must precede their children in `assets`.
    #[instrument(skip(self, assets), fields(count = assets.len()))]
    pub async fn upsert_assets_bulk_gai(&self, assets: &[Asset]) -> Result<Vec<Asset>> {
        debug!("Upserting assets in bulk");
        let mut url = self.url(&["assets-bulk"]);
        url.query_pairs_mut().append_pair("identifyBy", "gai");
        let request = self.request(Method::PUT, url).json(assets);
        self.send_json(request).await
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Create or update the data record of an asset and subtype.
    #[instrument(skip(self, data), fields(asset_id = data.asset_id, subtype = %data.subtype))]
    pub async fn upsert_data(&self, data: &Data) -> Result<()> {
        debug!("Upserting data");
        let request = self.request(Method::PUT, self.url(&["data"])).json(data);
        self.send_empty(request).await
    }

    // =========================================================================
    // Dashboards
    // =========================================================================

    /// Create or update a widget type.
    #[instrument(skip(self, widget_type), fields(widget_type = %widget_type.name))]
    pub async fn upsert_widget_type(&self, widget_type: &WidgetType) -> Result<WidgetType> {
        debug!("Upserting widget type");
        self.put_json(&["widget-types"], widget_type).await
    }

    // =========================================================================
    // Apps & patches
    // =========================================================================

    /// Get an app by name.
    #[instrument(skip(self))]
    pub async fn get_app(&self, app_name: &str) -> Result<App> {
        let request = self.request(Method::GET, self.url(&["apps", app_name]));
        self.send_json(request).await
    }

    /// Mark an app as registered.
    #[instrument(skip(self))]
    pub async fn register_app(&self, app_name: &str) -> Result<()> {
        let mut url = self.url(&["apps", app_name]);
        url.query_pairs_mut().append_pair("registered", "true");
        self.send_empty(self.request(Method::PATCH, url)).await
    }

    /// Get a patch of an app.
    #[instrument(skip(self))]
    pub async fn get_patch(&self, app_name: &str, patch_name: &str) -> Result<Patch> {
        let request = self.request(
            Method::GET,
            self.url(&["apps", app_name, "patches", patch_name]),
        );
        self.send_json(request).await
    }

    /// Mark a patch of an app as applied.
    #[instrument(skip(self))]
    pub async fn apply_patch(&self, app_name: &str, patch_name: &str) -> Result<()> {
        let mut url = self.url(&["apps", app_name, "patches", patch_name]);
        url.query_pairs_mut().append_pair("apply", "true");
        self.send_empty(self.request(Method::PATCH, url)).await
    }
}
