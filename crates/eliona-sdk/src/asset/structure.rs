// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Creation of assets held in an in-memory tree.
//!
//! Nodes expose locational and functional children. The tree is walked in
//! preorder, nodes that are not known to Eliona yet are collected together
//! with the parent GAIs inherited from the walk, and the whole batch is handed
//! to [`create_assets_bulk`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eliona_api::ElionaClient;
use tracing::{debug, instrument};

use super::bulk::{AssetWithParentReferences, create_assets_bulk};
use super::tag::SubtypeData;
use super::{AssetData, upsert_asset_data_if_asset_exists};
use crate::error::{AssetError, BoxError};

/// A node of an asset tree.
#[async_trait]
pub trait AssetNode: Send + Sync {
    fn name(&self) -> String;
    fn description(&self) -> String;
    fn asset_type(&self) -> String;
    fn gai(&self) -> String;

    /// Id of the asset in `project_id`, `None` when it does not exist yet.
    async fn asset_id(&self, project_id: &str) -> Result<Option<i32>, BoxError>;

    async fn set_asset_id(&self, asset_id: i32, project_id: &str) -> Result<(), BoxError>;

    fn locational_children(&self) -> Vec<&dyn AssetNode> {
        Vec::new()
    }

    fn functional_children(&self) -> Vec<&dyn AssetNode> {
        Vec::new()
    }

    /// Attribute values written for nodes that already exist.
    fn subtype_data(&self) -> Result<SubtypeData, BoxError> {
        Ok(SubtypeData::new())
    }
}

/// A tree node scheduled for creation, with the parents inherited from the
/// walk.
pub struct AssetToCreate<'a> {
    node: &'a dyn AssetNode,
    locational_parent_gai: Option<String>,
    functional_parent_gai: Option<String>,
}

#[async_trait]
impl AssetWithParentReferences for AssetToCreate<'_> {
    fn name(&self) -> String {
        self.node.name()
    }

    fn description(&self) -> String {
        self.node.description()
    }

    fn asset_type(&self) -> String {
        self.node.asset_type()
    }

    fn gai(&self) -> String {
        self.node.gai()
    }

    fn locational_parent_gai(&self) -> Option<String> {
        self.locational_parent_gai.clone()
    }

    fn functional_parent_gai(&self) -> Option<String> {
        self.functional_parent_gai.clone()
    }

    async fn set_asset_id(&self, asset_id: i32, project_id: &str) -> Result<(), BoxError> {
        self.node.set_asset_id(asset_id, project_id).await
    }
}

/// Create every asset of the tree below (and including) `root` that has no id
/// yet.
///
/// Existing nodes are not created again, but their children are still
/// visited. Returns the number of created assets.
#[instrument(skip(client, root), fields(root = %root.gai()))]
pub async fn create_assets(
    client: &ElionaClient,
    root: &dyn AssetNode,
    project_id: &str,
) -> Result<usize, AssetError> {
    let collected = collect(root, project_id).await?;
    create_assets_bulk(client, &collected.to_create, project_id).await
}

/// Like [`create_assets`], and additionally upsert the subtype data of nodes
/// that already existed.
///
/// Data is only written while the asset still exists in Eliona.
#[instrument(skip(client, root), fields(root = %root.gai()))]
pub async fn create_assets_and_upsert_data(
    client: &ElionaClient,
    root: &dyn AssetNode,
    project_id: &str,
    timestamp: Option<DateTime<Utc>>,
    client_reference: Option<&str>,
) -> Result<usize, AssetError> {
    let collected = collect(root, project_id).await?;
    let created = create_assets_bulk(client, &collected.to_create, project_id).await?;

    for (asset_id, node) in collected.existing {
        let data = node.subtype_data().map_err(|source| AssetError::Node {
            gai: node.gai(),
            source,
        })?;
        let asset_data = AssetData {
            asset_id,
            timestamp,
            client_reference: client_reference.map(str::to_string),
            data,
        };
        upsert_asset_data_if_asset_exists(client, asset_data).await?;
    }

    Ok(created)
}

struct Collected<'a> {
    to_create: Vec<AssetToCreate<'a>>,
    existing: Vec<(i32, &'a dyn AssetNode)>,
}

/// Preorder walk. Locational children inherit the node as locational parent
/// and keep the node's functional parent; functional children the other way
/// round.
async fn collect<'a>(root: &'a dyn AssetNode, project_id: &str) -> Result<Collected<'a>, AssetError> {
    let mut collected = Collected {
        to_create: Vec::new(),
        existing: Vec::new(),
    };
    // GAI of every visited node, with its position in `to_create` if it is
    // going to be created
    let mut visited: HashMap<String, Option<usize>> = HashMap::new();
    let mut stack: Vec<(&'a dyn AssetNode, Option<String>, Option<String>)> =
        vec![(root, None, None)];

    while let Some((node, locational_parent, functional_parent)) = stack.pop() {
        let gai = node.gai();

        if let Some(position) = visited.get(&gai) {
            // reached again over another edge: fill only missing links
            if let Some(entry) = position.and_then(|i| collected.to_create.get_mut(i)) {
                if entry.locational_parent_gai.is_none() {
                    entry.locational_parent_gai = locational_parent;
                }
                if entry.functional_parent_gai.is_none() {
                    entry.functional_parent_gai = functional_parent;
                }
            }
            continue;
        }

        let asset_id = node
            .asset_id(project_id)
            .await
            .map_err(|source| AssetError::Node {
                gai: gai.clone(),
                source,
            })?;

        match asset_id {
            Some(asset_id) => {
                debug!(gai = %gai, asset_id, "Asset exists, not creating");
                visited.insert(gai.clone(), None);
                collected.existing.push((asset_id, node));
            }
            None => {
                visited.insert(gai.clone(), Some(collected.to_create.len()));
                collected.to_create.push(AssetToCreate {
                    node,
                    locational_parent_gai: locational_parent.clone(),
                    functional_parent_gai: functional_parent.clone(),
                });
            }
        }

        // pushed in reverse so that locational children are popped first, in
        // their declared order
        for child in node.functional_children().into_iter().rev() {
            stack.push((child, locational_parent.clone(), Some(gai.clone())));
        }
        for child in node.locational_children().into_iter().rev() {
            stack.push((child, Some(gai.clone()), functional_parent.clone()));
        }
    }

    Ok(collected)
}
