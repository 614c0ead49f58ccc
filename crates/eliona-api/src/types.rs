// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Models exchanged with the Eliona API.
//!
//! Field names follow the API's camelCase JSON. Optional fields are omitted
//! from request bodies when unset.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Display texts in the languages supported by Eliona.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub de: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub it: Option<String>,
}

impl Translation {
    /// Translation with English and German texts.
    pub fn en_de(en: impl Into<String>, de: impl Into<String>) -> Self {
        Self {
            en: Some(en.into()),
            de: Some(de.into()),
            ..Self::default()
        }
    }
}

/// Partition of an asset's data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSubtype {
    /// Values measured by the asset (default).
    #[default]
    Input,
    /// Static information about the asset.
    Info,
    /// Operating status of the asset.
    Status,
    /// Values written to the asset.
    Output,
    /// Configurable properties of the asset.
    Property,
}

impl DataSubtype {
    /// All subtypes in declaration order.
    pub const ALL: [DataSubtype; 5] = [
        DataSubtype::Input,
        DataSubtype::Info,
        DataSubtype::Status,
        DataSubtype::Output,
        DataSubtype::Property,
    ];

    /// Wire name of the subtype.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSubtype::Input => "input",
            DataSubtype::Info => "info",
            DataSubtype::Status => "status",
            DataSubtype::Output => "output",
            DataSubtype::Property => "property",
        }
    }
}

impl fmt::Display for DataSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSubtype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataSubtype::ALL
            .into_iter()
            .find(|subtype| subtype.as_str() == s)
            .ok_or_else(|| format!("unknown data subtype '{}'", s))
    }
}

/// Schema for a class of assets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetType {
    pub name: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urldoc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_inactivity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AssetTypeAttribute>,
}

/// Attribute definition belonging to an asset type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTypeAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type_name: Option<String>,
    pub name: String,
    #[serde(default)]
    pub subtype: DataSubtype,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_digital: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i32>,
    #[serde(rename = "virtual", default, skip_serializing_if = "Option::is_none")]
    pub is_virtual: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Value>,
}

/// A concrete asset inside a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub project_id: String,
    pub global_asset_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub asset_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_tracker: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_functional_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_locational_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_functional_asset_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_locational_asset_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Data record of one asset and subtype.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub asset_id: i32,
    #[serde(default)]
    pub subtype: DataSubtype,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_reference: Option<String>,
}

/// Dashboard widget type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetType {
    pub name: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
    #[serde(default)]
    pub elements: Vec<WidgetTypeElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_alarm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_timespan: Option<bool>,
}

/// Element inside a widget type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetTypeElement {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
}

/// An app installed in Eliona.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default)]
    pub registered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
}

/// A patch shipped with an app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub name: String,
    #[serde(default)]
    pub applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
