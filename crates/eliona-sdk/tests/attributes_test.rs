// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `#[derive(ElionaAttributes)]` used the way apps use it.

use chrono::{TimeZone, Utc};
use eliona_sdk::ElionaAttributes;
use eliona_sdk::api::DataSubtype;
use eliona_sdk::asset::{AssetData, filterable_attributes, split_by_subtype};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
struct Location {
    floor: i32,
}

#[derive(ElionaAttributes)]
struct WeatherStation {
    #[eliona(attribute = "station_id", filterable, subtype = "info")]
    id: String,
    #[eliona(attribute = "temperature")]
    temperature: f64,
    #[eliona(subtype = "status")]
    online: bool,
    #[eliona(attribute = "location", subtype = "property")]
    location: Location,
    #[allow(dead_code)]
    api_key: String,
}

fn station() -> WeatherStation {
    WeatherStation {
        id: "ws-7".to_string(),
        temperature: 21.5,
        online: true,
        location: Location { floor: 3 },
        api_key: "secret".to_string(),
    }
}

#[test]
fn test_tags_describe_tagged_fields_only() {
    let tags = WeatherStation::eliona_tags();
    let names: Vec<&str> = tags.iter().map(|t| t.attribute_name).collect();
    assert_eq!(names, ["station_id", "temperature", "online", "location"]);

    assert_eq!(tags[0].field, "id");
    assert!(tags[0].filterable);
    assert_eq!(tags[1].subtype, None);
    assert_eq!(tags[2].subtype, Some(DataSubtype::Status));
}

#[test]
fn test_split_by_subtype_from_app_crate() {
    let split = split_by_subtype(&station()).unwrap();

    assert_eq!(split.len(), 4);
    assert_eq!(split[&DataSubtype::Info]["station_id"], json!("ws-7"));
    assert_eq!(split[&DataSubtype::Input]["temperature"], json!(21.5));
    assert_eq!(split[&DataSubtype::Status]["online"], json!(true));
    assert_eq!(split[&DataSubtype::Property]["location"], json!({"floor": 3}));
    assert!(split.values().all(|m| !m.contains_key("api_key")));

    let filterable = filterable_attributes(&station()).unwrap();
    assert_eq!(filterable.len(), 1);
    assert_eq!(filterable["station_id"], "ws-7");
}

#[test]
fn test_asset_data_records_per_subtype() {
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let records = AssetData::from_attributes(12, &station())
        .unwrap()
        .with_timestamp(ts)
        .with_client_reference("weather-app")
        .into_records();

    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.asset_id == 12));
    let status = records
        .iter()
        .find(|r| r.subtype == DataSubtype::Status)
        .unwrap();
    assert_eq!(status.data, json!({"online": true}).as_object().unwrap().clone());
}
