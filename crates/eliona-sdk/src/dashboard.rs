// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dashboard widget types.

use std::path::PathBuf;

use async_trait::async_trait;
use eliona_api::{ApiError, ElionaClient, WidgetType};
use eliona_db::PgConnection;

use crate::app::InitStep;
use crate::common::unmarshal_file;
use crate::error::BoxError;

/// Create or update a widget type.
pub async fn upsert_widget_type(
    client: &ElionaClient,
    widget_type: &WidgetType,
) -> Result<WidgetType, ApiError> {
    client.upsert_widget_type(widget_type).await
}

/// Init step upserting the widget type defined in a JSON file.
#[derive(Debug, Clone)]
pub struct InitWidgetTypeFile {
    client: ElionaClient,
    path: PathBuf,
}

pub fn init_widget_type_file(client: &ElionaClient, path: impl Into<PathBuf>) -> InitWidgetTypeFile {
    InitWidgetTypeFile {
        client: client.clone(),
        path: path.into(),
    }
}

#[async_trait]
impl InitStep for InitWidgetTypeFile {
    async fn run(&self, _conn: &mut PgConnection) -> Result<(), BoxError> {
        let widget_type: WidgetType = unmarshal_file(&self.path)?;
        upsert_widget_type(&self.client, &widget_type).await?;
        Ok(())
    }
}
