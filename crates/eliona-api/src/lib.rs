// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Eliona API client
//!
//! Async client and models for the parts of the Eliona REST API (v2) that apps
//! use: asset types, assets, data, widget types, and app/patch registration.
//!
//! # Example
//!
//! ```no_run
//! use eliona_api::{Asset, ElionaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads API_ENDPOINT and API_TOKEN
//! let client = ElionaClient::from_env()?;
//!
//! let asset = Asset {
//!     project_id: "1".to_string(),
//!     global_asset_identifier: "weather-zurich".to_string(),
//!     asset_type: "weather_location".to_string(),
//!     ..Asset::default()
//! };
//! let stored = client.upsert_asset(&asset).await?;
//! println!("Asset id: {:?}", stored.id);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod types;

pub use client::{API_KEY_HEADER, ElionaClient};
pub use config::{ApiConfig, DEFAULT_ENDPOINT};
pub use error::{ApiError, Result};
pub use types::{
    App, Asset, AssetType, AssetTypeAttribute, Data, DataSubtype, Patch, Translation, WidgetType,
    WidgetTypeElement,
};
