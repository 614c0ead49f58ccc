// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for eliona-sdk integration tests.

#![allow(dead_code)]

use eliona_sdk::db::{DbConfig, PgPool};
use uuid::Uuid;

/// Tables of the shared Eliona schema touched by the SDK, reduced to the
/// columns it uses. Existing tables are left alone.
const SCHEMA: &str = r#"
begin;
select pg_advisory_xact_lock(47110815);
create table if not exists public.asset_type (
    asset_type text primary key,
    custom boolean not null default false,
    vendor text,
    translation jsonb,
    urldoc text,
    icon text
);
create table if not exists public.attribute_schema (
    asset_type text not null,
    attribute_type text,
    attribute text not null,
    subtype text not null,
    enable boolean,
    translation jsonb,
    unit text,
    pipeline_mode text,
    pipeline_raster text,
    precision smallint,
    unique (asset_type, subtype, attribute)
);
create table if not exists public.asset (
    asset_id serial primary key,
    proj_id text not null,
    gai text not null,
    name text,
    asset_type text,
    lat double precision,
    lon double precision,
    description text,
    tags text[],
    unique (proj_id, gai)
);
create table if not exists public.heap (
    asset_id integer not null,
    subtype text not null,
    ts timestamptz,
    data jsonb,
    unique (asset_id, subtype)
);
create table if not exists public.eliona_app (
    app_name text primary key,
    category text,
    active boolean,
    initialised boolean
);
create schema if not exists versioning;
create table if not exists versioning.patches (
    patch_name text not null,
    app_name text not null,
    applied_tsz timestamptz,
    applied_by text
);
commit;
"#;

/// Test context holding a pool against TEST_DATABASE_URL and a unique name
/// prefix for rows and schemas created by one test.
pub struct TestContext {
    pub pool: PgPool,
    pub prefix: String,
}

impl TestContext {
    /// Connect and make sure the Eliona tables exist.
    ///
    /// Returns `None` when TEST_DATABASE_URL is unset or unreachable.
    pub async fn new() -> Option<Self> {
        let database_url = std::env::var("TEST_DATABASE_URL").ok()?;
        let config = DbConfig::default()
            .with_connection_string(database_url)
            .with_application_name("eliona-sdk-test");
        let pool = eliona_sdk::db::new_pool(&config).await.ok()?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await.ok()?;

        Some(Self {
            pool,
            prefix: format!("test_{}", Uuid::new_v4().simple()),
        })
    }

    /// Unique name derived from the test prefix.
    pub fn name(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    /// Remove every row and schema created under the test prefix.
    pub async fn cleanup(&self) {
        let like = format!("{}%", self.prefix);
        for sql in [
            "delete from public.heap where asset_id in (select asset_id from public.asset where proj_id like $1)",
            "delete from public.asset where proj_id like $1",
            "delete from public.attribute_schema where asset_type like $1",
            "delete from public.asset_type where asset_type like $1",
            "delete from public.eliona_app where app_name like $1",
            "delete from versioning.patches where app_name like $1",
        ] {
            let _ = sqlx::query(sql).bind(&like).execute(&self.pool).await;
        }
        let _ = sqlx::query(&format!("drop schema if exists {} cascade", self.prefix))
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
