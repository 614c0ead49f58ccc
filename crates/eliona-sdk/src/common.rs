// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Environment and serialization glue shared by all apps.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Result, SdkError};

/// Value of `key`, or `fallback` when the variable is unset.
///
/// A variable set to the empty string yields `""`.
pub fn getenv(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

/// App name from `APPNAME`, empty when unset.
pub fn app_name() -> String {
    getenv("APPNAME", "")
}

/// Read a JSON file into `T`.
pub fn unmarshal_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read(path).map_err(|source| SdkError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&content).map_err(|source| SdkError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a struct into a JSON object map.
pub fn struct_to_map<T: Serialize + ?Sized>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(SdkError::Config(format!(
            "expected a struct, got JSON {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
