// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bulk creation of assets that reference their parents by GAI.
//!
//! Assets are ordered so that every parent precedes its children, sent in a
//! single bulk call, and the ids assigned by Eliona are handed back to the
//! caller's objects by matching on GAI.

use std::collections::HashMap;

use async_trait::async_trait;
use eliona_api::{Asset, ElionaClient};
use tracing::{debug, info, instrument};

use crate::error::{AssetError, BoxError};

/// An asset to create, with its parents given as GAIs.
///
/// Parents that are not part of the same batch are expected to exist already.
#[async_trait]
pub trait AssetWithParentReferences: Send + Sync {
    fn name(&self) -> String;
    fn description(&self) -> String;
    fn asset_type(&self) -> String;
    /// Global asset identifier, unique within a batch.
    fn gai(&self) -> String;
    fn locational_parent_gai(&self) -> Option<String>;
    fn functional_parent_gai(&self) -> Option<String>;

    /// Receive the id Eliona assigned in `project_id`.
    async fn set_asset_id(&self, asset_id: i32, project_id: &str) -> Result<(), BoxError>;
}

#[async_trait]
impl<T: AssetWithParentReferences + ?Sized> AssetWithParentReferences for &T {
    fn name(&self) -> String {
        (**self).name()
    }

    fn description(&self) -> String {
        (**self).description()
    }

    fn asset_type(&self) -> String {
        (**self).asset_type()
    }

    fn gai(&self) -> String {
        (**self).gai()
    }

    fn locational_parent_gai(&self) -> Option<String> {
        (**self).locational_parent_gai()
    }

    fn functional_parent_gai(&self) -> Option<String> {
        (**self).functional_parent_gai()
    }

    async fn set_asset_id(&self, asset_id: i32, project_id: &str) -> Result<(), BoxError> {
        (**self).set_asset_id(asset_id, project_id).await
    }
}

/// Create all `assets` in one bulk call and report the number of upserted
/// assets.
///
/// On success every asset has received its id through
/// [`AssetWithParentReferences::set_asset_id`].
#[instrument(skip(client, assets), fields(count = assets.len()))]
pub async fn create_assets_bulk<A>(
    client: &ElionaClient,
    assets: &[A],
    project_id: &str,
) -> Result<usize, AssetError>
where
    A: AssetWithParentReferences,
{
    if assets.is_empty() {
        debug!("No assets to create");
        return Ok(0);
    }

    let sorted = sort_assets_by_dependencies(assets)?;
    let request: Vec<Asset> = sorted
        .iter()
        .map(|asset| to_api_asset(*asset, project_id))
        .collect();

    let upserted = client.upsert_assets_bulk_gai(&request).await?;
    let by_gai: HashMap<&str, &Asset> = upserted
        .iter()
        .map(|asset| (asset.global_asset_identifier.as_str(), asset))
        .collect();

    for asset in &sorted {
        let gai = asset.gai();
        let Some(result) = by_gai.get(gai.as_str()) else {
            return Err(AssetError::MissingGai(gai));
        };
        let Some(asset_id) = result.id.filter(|id| *id != 0) else {
            return Err(AssetError::MissingId(gai));
        };
        asset
            .set_asset_id(asset_id, project_id)
            .await
            .map_err(|source| AssetError::Node { gai, source })?;
    }

    info!(count = upserted.len(), project_id, "Created assets");
    Ok(upserted.len())
}

/// Order assets so that locational and functional parents come before their
/// children.
///
/// Parent GAIs that are not in `assets` are ignored. Roots are taken in input
/// order; each asset visits its locational parent before its functional
/// parent.
pub fn sort_assets_by_dependencies<A>(assets: &[A]) -> Result<Vec<&A>, AssetError>
where
    A: AssetWithParentReferences,
{
    let mut by_gai = HashMap::with_capacity(assets.len());
    for (index, asset) in assets.iter().enumerate() {
        let gai = asset.gai();
        if by_gai.contains_key(&gai) {
            return Err(AssetError::DuplicateGai(gai));
        }
        by_gai.insert(gai, index);
    }

    let mut sorter = DependencySorter {
        assets,
        by_gai,
        state: vec![Mark::Unvisited; assets.len()],
        sorted: Vec::with_capacity(assets.len()),
    };
    for index in 0..assets.len() {
        sorter.visit(index)?;
    }
    Ok(sorter.sorted)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

struct DependencySorter<'a, A> {
    assets: &'a [A],
    by_gai: HashMap<String, usize>,
    state: Vec<Mark>,
    sorted: Vec<&'a A>,
}

impl<'a, A: AssetWithParentReferences> DependencySorter<'a, A> {
    fn visit(&mut self, index: usize) -> Result<(), AssetError> {
        match self.state[index] {
            Mark::Done => return Ok(()),
            Mark::InProgress => return Err(AssetError::Cycle(self.assets[index].gai())),
            Mark::Unvisited => {}
        }

        self.state[index] = Mark::InProgress;
        let assets = self.assets;
        let asset = &assets[index];

        let parents = [asset.locational_parent_gai(), asset.functional_parent_gai()];
        for parent in parents.into_iter().flatten() {
            if let Some(&parent_index) = self.by_gai.get(&parent) {
                self.visit(parent_index)?;
            }
        }

        self.state[index] = Mark::Done;
        self.sorted.push(asset);
        Ok(())
    }
}

fn to_api_asset<A: AssetWithParentReferences + ?Sized>(asset: &A, project_id: &str) -> Asset {
    Asset {
        project_id: project_id.to_string(),
        global_asset_identifier: asset.gai(),
        name: Some(asset.name()),
        asset_type: asset.asset_type(),
        description: Some(asset.description()),
        parent_locational_identifier: asset.locational_parent_gai().filter(|gai| !gai.is_empty()),
        parent_functional_identifier: asset.functional_parent_gai().filter(|gai| !gai.is_empty()),
        ..Asset::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eliona_api::ApiConfig;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug)]
    struct Node {
        gai: &'static str,
        locational: Option<&'static str>,
        functional: Option<&'static str>,
        id: Mutex<Option<(i32, String)>>,
    }

    fn node(gai: &'static str, locational: Option<&'static str>, functional: Option<&'static str>) -> Node {
        Node {
            gai,
            locational,
            functional,
            id: Mutex::new(None),
        }
    }

    #[async_trait]
    impl AssetWithParentReferences for Node {
        fn name(&self) -> String {
            format!("Name of {}", self.gai)
        }

        fn description(&self) -> String {
            String::new()
        }

        fn asset_type(&self) -> String {
            "room".to_string()
        }

        fn gai(&self) -> String {
            self.gai.to_string()
        }

        fn locational_parent_gai(&self) -> Option<String> {
            self.locational.map(str::to_string)
        }

        fn functional_parent_gai(&self) -> Option<String> {
            self.functional.map(str::to_string)
        }

        async fn set_asset_id(&self, asset_id: i32, project_id: &str) -> Result<(), BoxError> {
            *self.id.lock().unwrap() = Some((asset_id, project_id.to_string()));
            Ok(())
        }
    }

    fn gais(sorted: &[&Node]) -> Vec<&'static str> {
        sorted.iter().map(|n| n.gai).collect()
    }

    fn position(order: &[&str], gai: &str) -> usize {
        order.iter().position(|g| *g == gai).unwrap()
    }

    #[test]
    fn test_parents_precede_children() {
        let assets = vec![
            node("desk", Some("room"), Some("floor-meter")),
            node("room", Some("floor"), None),
            node("floor-meter", Some("floor"), None),
            node("floor", None, None),
        ];

        let sorted = sort_assets_by_dependencies(&assets).unwrap();
        let order = gais(&sorted);

        assert_eq!(order.len(), 4);
        assert!(position(&order, "floor") < position(&order, "room"));
        assert!(position(&order, "floor") < position(&order, "floor-meter"));
        assert!(position(&order, "room") < position(&order, "desk"));
        assert!(position(&order, "floor-meter") < position(&order, "desk"));
    }

    #[test]
    fn test_locational_parent_visited_before_functional() {
        let assets = vec![
            node("child", Some("loc"), Some("func")),
            node("func", None, None),
            node("loc", None, None),
        ];

        let sorted = sort_assets_by_dependencies(&assets).unwrap();
        assert_eq!(gais(&sorted), vec!["loc", "func", "child"]);
    }

    #[test]
    fn test_unknown_parents_are_ignored() {
        let assets = vec![node("a", Some("outside"), Some("")), node("b", None, Some("a"))];

        let sorted = sort_assets_by_dependencies(&assets).unwrap();
        assert_eq!(gais(&sorted), vec!["a", "b"]);
    }

    #[test]
    fn test_shared_parent_emitted_once() {
        let assets = vec![
            node("left", Some("root"), None),
            node("right", Some("root"), Some("left")),
            node("root", None, None),
        ];

        let sorted = sort_assets_by_dependencies(&assets).unwrap();
        assert_eq!(gais(&sorted), vec!["root", "left", "right"]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let assets = vec![
            node("a", Some("b"), None),
            node("b", None, Some("c")),
            node("c", Some("a"), None),
        ];

        let err = sort_assets_by_dependencies(&assets).unwrap_err();
        assert!(matches!(err, AssetError::Cycle(gai) if gai == "a"));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let assets = vec![node("a", Some("a"), None)];
        assert!(matches!(
            sort_assets_by_dependencies(&assets),
            Err(AssetError::Cycle(_))
        ));
    }

    #[test]
    fn test_duplicate_gai_rejected() {
        let assets = vec![node("a", None, None), node("a", None, None)];
        assert!(matches!(
            sort_assets_by_dependencies(&assets),
            Err(AssetError::DuplicateGai(gai)) if gai == "a"
        ));
    }

    fn client_for(server: &MockServer) -> ElionaClient {
        ElionaClient::new(ApiConfig::new().with_endpoint(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_create_assets_bulk_assigns_ids() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/assets-bulk"))
            .and(query_param("identifyBy", "gai"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 10, "projectId": "7", "globalAssetIdentifier": "building", "assetType": "room"},
                {"id": 11, "projectId": "7", "globalAssetIdentifier": "room", "assetType": "room"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let assets = vec![node("room", Some("building"), None), node("building", None, None)];
        let count = create_assets_bulk(&client_for(&mock_server), &assets, "7")
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(*assets[0].id.lock().unwrap(), Some((11, "7".to_string())));
        assert_eq!(*assets[1].id.lock().unwrap(), Some((10, "7".to_string())));

        let requests = mock_server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body[0]["globalAssetIdentifier"], "building");
        assert_eq!(body[1]["globalAssetIdentifier"], "room");
        assert_eq!(body[1]["parentLocationalIdentifier"], "building");
        assert!(body[1].get("parentFunctionalIdentifier").is_none());
        assert_eq!(body[1]["name"], "Name of room");
    }

    #[tokio::test]
    async fn test_create_assets_bulk_missing_gai_in_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/assets-bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 10, "projectId": "7", "globalAssetIdentifier": "other", "assetType": "room"}
            ])))
            .mount(&mock_server)
            .await;

        let assets = vec![node("room", None, None)];
        let err = create_assets_bulk(&client_for(&mock_server), &assets, "7")
            .await
            .unwrap_err();
        assert!(matches!(err, AssetError::MissingGai(gai) if gai == "room"));
    }

    #[tokio::test]
    async fn test_create_assets_bulk_zero_id_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/assets-bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 0, "projectId": "7", "globalAssetIdentifier": "room", "assetType": "room"}
            ])))
            .mount(&mock_server)
            .await;

        let assets = vec![node("room", None, None)];
        let err = create_assets_bulk(&client_for(&mock_server), &assets, "7")
            .await
            .unwrap_err();
        assert!(matches!(err, AssetError::MissingId(_)));
        assert!(assets[0].id.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_assets_bulk_empty_skips_api() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&mock_server)
            .await;

        let assets: Vec<Node> = Vec::new();
        let count = create_assets_bulk(&client_for(&mock_server), &assets, "7")
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
