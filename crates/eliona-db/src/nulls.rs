// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conversions that bind empty or sentinel values as SQL `NULL`.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// `None` for an empty string.
pub fn empty_string_is_null(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// `None` for `0.0`.
pub fn empty_float_is_null(value: f64) -> Option<f64> {
    (value != 0.0).then_some(value)
}

/// `None` for `0`.
pub fn empty_int_is_null(value: i64) -> Option<i64> {
    (value != 0).then_some(value)
}

/// `None` when the value is missing or equals `sentinel`.
pub fn small_int_is_null(value: Option<i16>, sentinel: i16) -> Option<i16> {
    value.filter(|v| *v != sentinel)
}

/// JSON of `value`, or `None` when the value is missing, serializes to
/// `null`, or to an empty object.
pub fn empty_json_is_null<T: Serialize + ?Sized>(value: Option<&T>) -> Result<Option<Value>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let json = serde_json::to_value(value)?;
    Ok(match &json {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        _ => Some(json),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_empty_string_is_null() {
        assert_eq!(empty_string_is_null(""), None);
        assert_eq!(empty_string_is_null("x"), Some("x"));
    }

    #[test]
    fn test_numbers_zero_is_null() {
        assert_eq!(empty_float_is_null(0.0), None);
        assert_eq!(empty_float_is_null(-2.5), Some(-2.5));
        assert_eq!(empty_int_is_null(0), None);
        assert_eq!(empty_int_is_null(7), Some(7));
    }

    #[test]
    fn test_small_int_sentinel() {
        assert_eq!(small_int_is_null(Some(i16::MIN), i16::MIN), None);
        assert_eq!(small_int_is_null(None, i16::MIN), None);
        assert_eq!(small_int_is_null(Some(2), i16::MIN), Some(2));
    }

    #[test]
    fn test_empty_json_is_null() {
        let empty: BTreeMap<String, String> = BTreeMap::new();
        assert_eq!(empty_json_is_null(Some(&empty)).unwrap(), None);
        assert_eq!(empty_json_is_null::<Value>(None).unwrap(), None);
        assert_eq!(empty_json_is_null(Some(&Value::Null)).unwrap(), None);

        let translation = json!({"en": "Weather", "de": "Wetter"});
        assert_eq!(
            empty_json_is_null(Some(&translation)).unwrap(),
            Some(translation.clone())
        );
    }
}
