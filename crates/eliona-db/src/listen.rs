// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! LISTEN/NOTIFY subscriptions with JSON payloads.

use serde::de::DeserializeOwned;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::Result;

/// Listen on `channel` and forward every notification payload, decoded as
/// JSON into `T`, to `payloads`.
///
/// Payloads that do not decode are logged and skipped. The listener
/// reconnects on its own after connection loss. Returns when the receiver
/// side of `payloads` is dropped.
pub async fn listen<T>(pool: &PgPool, channel: &str, payloads: mpsc::Sender<T>) -> Result<()>
where
    T: DeserializeOwned + Send,
{
    let mut listener = PgListener::connect_with(pool).await.map_err(|e| {
        error!(error = %e, channel, "Unable to create listener connection");
        e
    })?;
    listener.listen(channel).await.map_err(|e| {
        error!(error = %e, channel, "Unable to listen on channel");
        e
    })?;
    info!(channel, "Listening for notifications");

    loop {
        let notification = tokio::select! {
            notification = listener.recv() => notification?,
            _ = payloads.closed() => {
                debug!(channel, "Payload receiver dropped, stop listening");
                break;
            }
        };

        match serde_json::from_str::<T>(notification.payload()) {
            Ok(payload) => {
                if payloads.send(payload).await.is_err() {
                    debug!(channel, "Payload receiver dropped, stop listening");
                    break;
                }
            }
            Err(e) => {
                error!(
                    error = %e,
                    channel,
                    payload = notification.payload(),
                    "Unable to decode notification payload"
                );
            }
        }
    }

    listener.unlisten(channel).await.ok();
    Ok(())
}
