// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Attribute tags on app structs, implemented by `#[derive(ElionaAttributes)]`.

use std::collections::BTreeMap;

use eliona_api::DataSubtype;
use serde_json::{Map, Value};

/// Attribute values of one asset, grouped by subtype and keyed by attribute
/// name.
pub type SubtypeData = BTreeMap<DataSubtype, Map<String, Value>>;

/// Description of one tagged struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElionaTag {
    /// Rust field name.
    pub field: &'static str,
    /// Attribute name in Eliona.
    pub attribute_name: &'static str,
    /// Whether the attribute can be used to filter assets.
    pub filterable: bool,
    /// Subtype the value is written to.
    pub subtype: Option<DataSubtype>,
}

impl ElionaTag {
    /// Explicit subtype, or `input` when none was given.
    pub fn subtype_or_default(&self) -> DataSubtype {
        self.subtype.unwrap_or_default()
    }
}

/// Structs whose fields map onto asset attributes.
///
/// Implement with `#[derive(ElionaAttributes)]`.
pub trait ElionaAttributes {
    /// Tags of all tagged fields in declaration order.
    fn eliona_tags() -> Vec<ElionaTag>
    where
        Self: Sized;

    /// Tags paired with the JSON value of their field.
    fn eliona_values(&self) -> Result<Vec<(ElionaTag, Value)>, serde_json::Error>;
}

/// Group attribute values by subtype.
///
/// Fields without explicit subtype are written as `input`.
pub fn split_by_subtype<T: ElionaAttributes + ?Sized>(
    value: &T,
) -> Result<SubtypeData, serde_json::Error> {
    let mut result = SubtypeData::new();
    for (tag, field_value) in value.eliona_values()? {
        result
            .entry(tag.subtype_or_default())
            .or_default()
            .insert(tag.attribute_name.to_string(), field_value);
    }
    Ok(result)
}

/// Filterable attributes rendered as strings.
///
/// Strings are taken verbatim, lists as `[a, b]`, `null` as empty string and
/// everything else in its JSON form.
pub fn filterable_attributes<T: ElionaAttributes + ?Sized>(
    value: &T,
) -> Result<BTreeMap<String, String>, serde_json::Error> {
    Ok(value
        .eliona_values()?
        .into_iter()
        .filter(|(tag, _)| tag.filterable)
        .map(|(tag, field_value)| (tag.attribute_name.to_string(), render(&field_value)))
        .collect())
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", parts.join(", "))
        }
        other => other.to_string(),
    }
}
