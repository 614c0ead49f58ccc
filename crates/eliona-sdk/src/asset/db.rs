// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Asset types, assets and heaps written directly into the Eliona database.
//!
//! For apps that run next to the database and bypass the API. The database
//! stores the `input` subtype as `""` and `output` as `"sp"`; the types here
//! convert from and to [`DataSubtype`].

use chrono::{DateTime, Utc};
use eliona_api::{DataSubtype, Translation};
use eliona_db::{
    DbError, PgPool, Postgres, args, empty_float_is_null, empty_json_is_null, empty_string_is_null,
    exec, query_scalar, small_int_is_null,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::error::AssetError;

/// Channel notified on every heap insert or update.
pub const HEAP_CHANNEL: &str = "heap";

/// Database code of a subtype.
pub fn subtype_code(subtype: DataSubtype) -> &'static str {
    match subtype {
        DataSubtype::Input => "",
        DataSubtype::Output => "sp",
        other => other.as_str(),
    }
}

/// Subtype of a database code. Plain subtype names are accepted too.
pub fn subtype_from_code(code: &str) -> Option<DataSubtype> {
    match code {
        "" => Some(DataSubtype::Input),
        "sp" => Some(DataSubtype::Output),
        other => other.parse().ok(),
    }
}

mod subtype_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(subtype: &DataSubtype, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(subtype_code(*subtype))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DataSubtype, D::Error> {
        let code = String::deserialize(deserializer)?;
        subtype_from_code(&code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown subtype code '{}'", code)))
    }
}

/// Aggregation applied to an attribute's values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    #[default]
    #[serde(rename = "")]
    None,
    Sum,
    Avg,
}

impl PipelineMode {
    fn code(self) -> Option<&'static str> {
        match self {
            PipelineMode::None => None,
            PipelineMode::Sum => Some("sum"),
            PipelineMode::Avg => Some("avg"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub mode: PipelineMode,
    #[serde(default)]
    pub raster: String,
}

/// Asset type row of `public.asset_type`, with its attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetType {
    pub name: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub vendor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
    #[serde(rename = "urldoc", default)]
    pub documentation_url: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AssetTypeAttribute>,
}

/// Attribute row of `public.attribute_schema`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetTypeAttribute {
    #[serde(rename = "assetType", default)]
    pub asset_type: String,
    #[serde(rename = "type", default)]
    pub attribute_type: String,
    pub name: String,
    #[serde(with = "subtype_serde", default)]
    pub subtype: DataSubtype,
    #[serde(default)]
    pub enable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub pipeline: Pipeline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i16>,
}

/// Asset row of `public.asset`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "projectId")]
    pub project_id: String,
    pub gai: String,
    pub name: String,
    pub asset_type: String,
    #[serde(rename = "lat", default)]
    pub latitude: f64,
    #[serde(rename = "lon", default)]
    pub longitude: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Heap row of one asset and subtype, as stored and as notified on
/// [`HEAP_CHANNEL`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heap<T> {
    pub asset_id: i32,
    #[serde(with = "subtype_serde")]
    pub subtype: DataSubtype,
    pub ts: DateTime<Utc>,
    pub data: T,
}

impl<T> Heap<T> {
    pub fn data(&self) -> &T {
        &self.data
    }
}

/// Insert or update an asset type and all of its attributes.
#[instrument(skip(connection, asset_type), fields(asset_type = %asset_type.name))]
pub async fn upsert_asset_type<'a, A>(connection: A, asset_type: &AssetType) -> Result<(), AssetError>
where
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = connection.acquire().await.map_err(DbError::from)?;

    exec(
        &mut *conn,
        "insert into public.asset_type (asset_type, custom, vendor, translation, urldoc, icon) \
         values ($1, $2, $3, $4, $5, $6) \
         on conflict (asset_type) \
         do update set custom = excluded.custom, vendor = excluded.vendor, \
         translation = excluded.translation, urldoc = excluded.urldoc, icon = excluded.icon",
        args![
            asset_type.name.as_str(),
            asset_type.custom,
            empty_string_is_null(&asset_type.vendor),
            empty_json_is_null(asset_type.translation.as_ref())?,
            empty_string_is_null(&asset_type.documentation_url),
            empty_string_is_null(&asset_type.icon),
        ]?,
    )
    .await?;

    for attribute in &asset_type.attributes {
        let attribute = AssetTypeAttribute {
            asset_type: asset_type.name.clone(),
            ..attribute.clone()
        };
        upsert_asset_type_attribute(&mut *conn, &attribute).await?;
    }

    debug!(attributes = asset_type.attributes.len(), "Upserted asset type");
    Ok(())
}

/// Insert or update one attribute of an asset type.
pub async fn upsert_asset_type_attribute<'c, E>(
    executor: E,
    attribute: &AssetTypeAttribute,
) -> Result<(), AssetError>
where
    E: Executor<'c, Database = Postgres>,
{
    exec(
        executor,
        "insert into public.attribute_schema \
         (asset_type, attribute_type, attribute, subtype, enable, translation, unit, \
         pipeline_mode, pipeline_raster, precision) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         on conflict (asset_type, subtype, attribute) \
         do update set attribute_type = excluded.attribute_type, enable = excluded.enable, \
         translation = excluded.translation, unit = excluded.unit, \
         pipeline_mode = excluded.pipeline_mode, pipeline_raster = excluded.pipeline_raster, \
         precision = excluded.precision",
        args![
            attribute.asset_type.as_str(),
            attribute.attribute_type.as_str(),
            attribute.name.as_str(),
            subtype_code(attribute.subtype),
            attribute.enable,
            empty_json_is_null(attribute.translation.as_ref())?,
            empty_string_is_null(&attribute.unit),
            attribute.pipeline.mode.code(),
            empty_string_is_null(&attribute.pipeline.raster),
            small_int_is_null(attribute.precision, i16::MIN),
        ]?,
    )
    .await?;
    Ok(())
}

/// Whether an asset with `asset_id` exists.
pub async fn exist_asset<'c, E>(executor: E, asset_id: i32) -> Result<bool, AssetError>
where
    E: Executor<'c, Database = Postgres>,
{
    let count: i64 = query_scalar(
        executor,
        "select count(*) from public.asset where asset_id = $1",
        args![asset_id]?,
    )
    .await?;
    Ok(count > 0)
}

/// Insert or update an asset identified by project and GAI and return its id.
#[instrument(skip(executor, asset), fields(gai = %asset.gai))]
pub async fn upsert_asset<'c, E>(executor: E, asset: &Asset) -> Result<i32, AssetError>
where
    E: Executor<'c, Database = Postgres>,
{
    let asset_id: i32 = query_scalar(
        executor,
        "with upserted as ( \
         insert into public.asset (proj_id, gai, name, asset_type, lat, lon, description, tags) \
         values ($1, $2, $3, $4, $5, $6, $7, $8) \
         on conflict (proj_id, gai) \
         do update set name = excluded.name, asset_type = excluded.asset_type, \
         lat = excluded.lat, lon = excluded.lon, description = excluded.description, \
         tags = excluded.tags \
         returning asset_id \
         ) select asset_id from upserted",
        args![
            asset.project_id.as_str(),
            asset.gai.as_str(),
            asset.name.as_str(),
            asset.asset_type.as_str(),
            empty_float_is_null(asset.latitude),
            empty_float_is_null(asset.longitude),
            empty_string_is_null(&asset.description),
            asset.tags.clone(),
        ]?,
    )
    .await?;
    Ok(asset_id)
}

/// Insert or update the heap of an asset and subtype.
pub async fn upsert_heap<'c, E, T>(executor: E, heap: &Heap<T>) -> Result<(), AssetError>
where
    E: Executor<'c, Database = Postgres>,
    T: Serialize,
{
    let data = serde_json::to_value(&heap.data)?;
    exec(
        executor,
        "insert into public.heap (asset_id, subtype, ts, data) \
         values ($1, $2, $3, $4) \
         on conflict (asset_id, subtype) \
         do update set ts = excluded.ts, data = excluded.data",
        args![heap.asset_id, subtype_code(heap.subtype), heap.ts, data]?,
    )
    .await?;
    Ok(())
}

/// Forward every heap change notified on [`HEAP_CHANNEL`] to `heaps` until
/// the receiver is dropped.
pub async fn listen_heap<T>(pool: &PgPool, heaps: mpsc::Sender<Heap<T>>) -> Result<(), AssetError>
where
    T: DeserializeOwned + Send,
{
    eliona_db::listen(pool, HEAP_CHANNEL, heaps).await?;
    Ok(())
}
