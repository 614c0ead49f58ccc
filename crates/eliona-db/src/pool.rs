// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Connections, pools and transactions.

use once_cell::sync::Lazy;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Connection, Postgres, Transaction};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::DbConfig;
use crate::error::Result;

/// Process-wide pool created on first use.
static POOL: Lazy<Mutex<Option<PgPool>>> = Lazy::new(|| Mutex::new(None));

/// Open a single connection.
pub async fn new_connection(config: &DbConfig) -> Result<PgConnection> {
    let options = config.connect_options()?;
    PgConnection::connect_with(&options).await.map_err(|e| {
        error!(error = %e, "Unable to connect to database");
        e.into()
    })
}

/// Open a new connection pool.
pub async fn new_pool(config: &DbConfig) -> Result<PgPool> {
    let options = config.connect_options()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| {
            error!(error = %e, "Unable to create connection pool");
            e
        })?;

    info!(
        max_connections = config.max_connections,
        "Database connection pool established"
    );
    Ok(pool)
}

/// The process-wide pool, configured from the environment on first call.
///
/// Returns a cheap clone; all clones share the same connections.
pub async fn pool() -> Result<PgPool> {
    let mut slot = POOL.lock().await;
    if let Some(pool) = slot.as_ref() {
        return Ok(pool.clone());
    }

    let pool = new_pool(&DbConfig::from_env()?).await?;
    *slot = Some(pool.clone());
    Ok(pool)
}

/// Close the process-wide pool. The next [`pool`] call opens a new one.
pub async fn close_pool() {
    let pool = POOL.lock().await.take();
    if let Some(pool) = pool {
        pool.close().await;
        info!("Database connection pool closed");
    }
}

/// Start a transaction on the pool.
pub async fn begin(pool: &PgPool) -> Result<Transaction<'static, Postgres>> {
    pool.begin().await.map_err(|e| {
        error!(error = %e, "Error starting transaction");
        e.into()
    })
}
