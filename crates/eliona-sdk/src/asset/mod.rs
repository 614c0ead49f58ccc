// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Assets, asset types and their data.
//!
//! The functions here are thin wrappers over [`ElionaClient`]. Bulk creation
//! of linked assets lives in [`bulk`] and [`structure`]; [`db`] writes the same
//! records straight into the database.

pub mod bulk;
pub mod db;
pub mod structure;
pub mod tag;

use std::path::Path;

use chrono::{DateTime, Utc};
use eliona_api::{AssetType, AssetTypeAttribute, Data, ElionaClient};
use tracing::{debug, instrument};

use crate::common::unmarshal_file;
use crate::error::AssetError;

pub use bulk::{AssetWithParentReferences, create_assets_bulk, sort_assets_by_dependencies};
pub use structure::{AssetNode, AssetToCreate, create_assets, create_assets_and_upsert_data};
pub use tag::{ElionaAttributes, ElionaTag, SubtypeData, filterable_attributes, split_by_subtype};

/// Create or update an asset type.
pub async fn upsert_asset_type(
    client: &ElionaClient,
    asset_type: &AssetType,
) -> Result<AssetType, AssetError> {
    Ok(client.upsert_asset_type(asset_type).await?)
}

/// Create or update the asset type defined in a JSON file.
pub async fn upsert_asset_type_file(
    client: &ElionaClient,
    path: impl AsRef<Path>,
) -> Result<AssetType, AssetError> {
    let asset_type: AssetType = unmarshal_file(path)?;
    upsert_asset_type(client, &asset_type).await
}

pub async fn upsert_asset_type_attribute(
    client: &ElionaClient,
    asset_type_name: &str,
    attribute: &AssetTypeAttribute,
) -> Result<AssetTypeAttribute, AssetError> {
    Ok(client
        .upsert_asset_type_attribute(asset_type_name, attribute)
        .await?)
}

/// Whether an asset with `asset_id` exists.
pub async fn exist_asset(client: &ElionaClient, asset_id: i32) -> Result<bool, AssetError> {
    match client.get_asset(asset_id).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Create or update an asset and return its id.
pub async fn upsert_asset(
    client: &ElionaClient,
    asset: &eliona_api::Asset,
) -> Result<i32, AssetError> {
    let upserted = client.upsert_asset(asset).await?;
    upserted
        .id
        .filter(|id| *id != 0)
        .ok_or_else(|| AssetError::MissingId(asset.global_asset_identifier.clone()))
}

pub async fn upsert_data(client: &ElionaClient, data: &Data) -> Result<(), AssetError> {
    Ok(client.upsert_data(data).await?)
}

/// Upsert `data` only if its asset exists. Returns whether it was written.
pub async fn upsert_data_if_asset_exists(
    client: &ElionaClient,
    data: &Data,
) -> Result<bool, AssetError> {
    if !exist_asset(client, data.asset_id).await? {
        debug!(asset_id = data.asset_id, "Asset does not exist, skipping data");
        return Ok(false);
    }
    upsert_data(client, data).await?;
    Ok(true)
}

/// Attribute values of one asset for all its subtypes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetData {
    pub asset_id: i32,
    pub timestamp: Option<DateTime<Utc>>,
    pub client_reference: Option<String>,
    pub data: SubtypeData,
}

impl AssetData {
    /// Values of the tagged fields of `value`, grouped by subtype.
    pub fn from_attributes<T: ElionaAttributes + ?Sized>(
        asset_id: i32,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            asset_id,
            data: split_by_subtype(value)?,
            ..Self::default()
        })
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_client_reference(mut self, client_reference: impl Into<String>) -> Self {
        self.client_reference = Some(client_reference.into());
        self
    }

    /// One data record per subtype.
    pub fn into_records(self) -> Vec<Data> {
        let Self {
            asset_id,
            timestamp,
            client_reference,
            data,
        } = self;
        data.into_iter()
            .map(|(subtype, values)| Data {
                asset_id,
                subtype,
                timestamp,
                data: values,
                asset_type_name: None,
                client_reference: client_reference.clone(),
            })
            .collect()
    }
}

/// Write every subtype of `asset_data`.
#[instrument(skip(client, asset_data), fields(asset_id = asset_data.asset_id))]
pub async fn upsert_asset_data(
    client: &ElionaClient,
    asset_data: AssetData,
) -> Result<(), AssetError> {
    for record in asset_data.into_records() {
        upsert_data(client, &record).await?;
    }
    Ok(())
}

/// Write every subtype of `asset_data` if the asset exists. Returns whether
/// anything was written.
pub async fn upsert_asset_data_if_asset_exists(
    client: &ElionaClient,
    asset_data: AssetData,
) -> Result<bool, AssetError> {
    if !exist_asset(client, asset_data.asset_id).await? {
        debug!(asset_id = asset_data.asset_id, "Asset does not exist, skipping data");
        return Ok(false);
    }
    upsert_asset_data(client, asset_data).await?;
    Ok(true)
}
