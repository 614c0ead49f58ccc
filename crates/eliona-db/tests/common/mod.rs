// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for eliona-db integration tests.

#![allow(dead_code)]

use eliona_db::{DbConfig, PgPool};
use uuid::Uuid;

/// Test context holding a pool against TEST_DATABASE_URL and a scratch table.
pub struct TestContext {
    pub pool: PgPool,
    pub config: DbConfig,
    pub table: String,
}

impl TestContext {
    /// Connect and create a scratch table `(id int, name text, value float8)`.
    ///
    /// Returns `None` when TEST_DATABASE_URL is unset or unreachable.
    pub async fn new() -> Option<Self> {
        let database_url = std::env::var("TEST_DATABASE_URL").ok()?;
        let config = DbConfig::default()
            .with_connection_string(database_url)
            .with_application_name("eliona-db-test");
        let pool = eliona_db::new_pool(&config).await.ok()?;

        let table = format!("test_{}", Uuid::new_v4().simple());
        sqlx::query(&format!(
            "create table {table} (id int primary key, name text, value float8)"
        ))
        .execute(&pool)
        .await
        .ok()?;

        Some(Self {
            pool,
            config,
            table,
        })
    }

    /// Drop the scratch table.
    pub async fn cleanup(&self) {
        let _ = sqlx::query(&format!("drop table if exists {}", self.table))
            .execute(&self.pool)
            .await;
    }
}

#[macro_export]
macro_rules! skip_if_no_db {
    () => {
        if std::env::var("TEST_DATABASE_URL").is_err() {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        }
    };
}
