// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for app init and patch runs against PostgreSQL.

mod common;

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::*;
use eliona_sdk::api::{ApiConfig, ElionaClient};
use eliona_sdk::app::{ApiRegistry, DatabaseRegistry, FnStep, exec_sql_file, init, patch, step};
use eliona_sdk::{AppError, BoxError};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn schema_exists(ctx: &TestContext, schema: &str) -> bool {
    let count: i64 =
        sqlx::query_scalar("select count(*) from information_schema.schemata where schema_name = $1")
            .bind(schema)
            .fetch_one(&ctx.pool)
            .await
            .unwrap();
    count > 0
}

fn counting_step(schema: String, runs: Arc<AtomicUsize>) -> FnStep {
    step(move |conn| {
        let sql = format!("create schema if not exists {}", schema);
        let runs = runs.clone();
        Box::pin(async move {
            sqlx::query(&sql).execute(conn).await?;
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
}

#[tokio::test]
async fn test_init_runs_steps_once() {
    skip_if_no_db!();

    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: failed to create test context");
        return;
    };

    let app = ctx.prefix.clone();
    let runs = Arc::new(AtomicUsize::new(0));
    let create_schema = counting_step(ctx.prefix.clone(), runs.clone());

    init(&ctx.pool, &DatabaseRegistry, &app, &[&create_schema])
        .await
        .unwrap();
    init(&ctx.pool, &DatabaseRegistry, &app, &[&create_schema])
        .await
        .unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(schema_exists(&ctx, &ctx.prefix).await);

    let initialised: bool =
        sqlx::query_scalar("select initialised from public.eliona_app where app_name = $1")
            .bind(&app)
            .fetch_one(&ctx.pool)
            .await
            .unwrap();
    assert!(initialised);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_init_with_sql_file() {
    skip_if_no_db!();

    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: failed to create test context");
        return;
    };

    let app = ctx.prefix.clone();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "create schema if not exists {schema};\n\
         create table {schema}.configuration (id serial primary key, api_key text);\n\
         insert into {schema}.configuration (api_key) values ('secret');",
        schema = ctx.prefix
    )
    .unwrap();

    init(&ctx.pool, &DatabaseRegistry, &app, &[&exec_sql_file(file.path())])
        .await
        .unwrap();

    let count: i64 = sqlx::query_scalar(&format!("select count(*) from {}.configuration", ctx.prefix))
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let missing = init(
        &ctx.pool,
        &DatabaseRegistry,
        &ctx.name("other"),
        &[&exec_sql_file("/nonexistent/init.sql")],
    )
    .await
    .unwrap_err();
    assert!(matches!(missing, AppError::Step { index: 0, .. }));

    ctx.cleanup().await;
}

async fn mount_app_lookups(server: &MockServer, app: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/apps/{}", app)))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/apps/{}/patches/010300", app)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "010300",
            "appName": app,
            "applied": false
        })))
        .mount(server)
        .await;
}

fn api_registry(server: &MockServer) -> ApiRegistry {
    let client = ElionaClient::new(ApiConfig::new().with_endpoint(server.uri())).unwrap();
    ApiRegistry::new(client)
}

#[tokio::test]
async fn test_api_registry_registers_after_commit() {
    skip_if_no_db!();

    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: failed to create test context");
        return;
    };

    let server = MockServer::start().await;
    let app = ctx.prefix.clone();
    mount_app_lookups(&server, &app).await;
    Mock::given(method("PATCH"))
        .and(path(format!("/apps/{}", app)))
        .and(query_param("registered", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("/apps/{}/patches/010300", app)))
        .and(query_param("apply", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let registry = api_registry(&server);
    let runs = Arc::new(AtomicUsize::new(0));
    let create_schema = counting_step(ctx.prefix.clone(), runs.clone());

    init(&ctx.pool, &registry, &app, &[&create_schema]).await.unwrap();
    assert!(schema_exists(&ctx, &ctx.prefix).await);

    patch(&ctx.pool, &registry, &app, "010300", &[&create_schema])
        .await
        .unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    // registration and patch application are the last calls of each run
    let requests = server.received_requests().await.unwrap();
    let calls: Vec<String> = requests
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect();
    assert_eq!(
        calls,
        [
            format!("GET /apps/{}", app),
            format!("PATCH /apps/{}", app),
            format!("GET /apps/{}/patches/010300", app),
            format!("PATCH /apps/{}/patches/010300", app),
        ]
    );

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_api_registry_not_called_on_failing_step() {
    skip_if_no_db!();

    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: failed to create test context");
        return;
    };

    let server = MockServer::start().await;
    let app = ctx.prefix.clone();
    mount_app_lookups(&server, &app).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let registry = api_registry(&server);
    let runs = Arc::new(AtomicUsize::new(0));
    let create_schema = counting_step(ctx.prefix.clone(), runs.clone());
    let fail = step(|_conn| Box::pin(async { Err::<(), BoxError>("broken step".into()) }));

    let err = init(&ctx.pool, &registry, &app, &[&create_schema, &fail])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Step { index: 1, .. }));

    let err = patch(&ctx.pool, &registry, &app, "010300", &[&fail])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Step { index: 0, .. }));

    assert!(!schema_exists(&ctx, &ctx.prefix).await);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_init_rolls_back_on_failing_step() {
    skip_if_no_db!();

    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: failed to create test context");
        return;
    };

    let app = ctx.prefix.clone();
    let runs = Arc::new(AtomicUsize::new(0));
    let create_schema = counting_step(ctx.prefix.clone(), runs.clone());
    let fail = step(|_conn| Box::pin(async { Err::<(), BoxError>("broken step".into()) }));

    let err = init(&ctx.pool, &DatabaseRegistry, &app, &[&create_schema, &fail])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Step { index: 1, .. }));

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!schema_exists(&ctx, &ctx.prefix).await);

    let count: i64 = sqlx::query_scalar("select count(*) from public.eliona_app where app_name = $1")
        .bind(&app)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    // a later run without the broken step succeeds
    init(&ctx.pool, &DatabaseRegistry, &app, &[&create_schema])
        .await
        .unwrap();
    assert!(schema_exists(&ctx, &ctx.prefix).await);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_patch_with_sql_file() {
    skip_if_no_db!();

    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: failed to create test context");
        return;
    };

    let app = ctx.prefix.clone();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "create schema if not exists {schema};\n\
         create table {schema}.configuration (id serial primary key, api_key text);",
        schema = ctx.prefix
    )
    .unwrap();
    let sql_file = exec_sql_file(file.path());

    patch(&ctx.pool, &DatabaseRegistry, &app, "010200", &[&sql_file])
        .await
        .unwrap();
    // applied patches are skipped, so the create table does not fail
    patch(&ctx.pool, &DatabaseRegistry, &app, "010200", &[&sql_file])
        .await
        .unwrap();

    let count: i64 = sqlx::query_scalar(
        "select count(*) from versioning.patches where app_name = $1 and patch_name = '010200'",
    )
    .bind(&app)
    .fetch_one(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(count, 1);

    let tables: i64 = sqlx::query_scalar(
        "select count(*) from information_schema.tables where table_schema = $1 and table_name = 'configuration'",
    )
    .bind(&ctx.prefix)
    .fetch_one(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(tables, 1);

    ctx.cleanup().await;
}
