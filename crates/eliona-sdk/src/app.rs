// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! App metadata, one-time initialization and patches.
//!
//! [`init`] and [`patch`] run a list of [`InitStep`]s inside one transaction
//! and record the result in an [`AppRegistry`], so every step list runs exactly
//! once per installation. A failing step rolls the transaction back and
//! nothing is recorded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eliona_api::ElionaClient;
use eliona_db::{PgConnection, PgPool, args, exec, query_scalar};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{AppError, BoxError, Result, SdkError};

/// Name of the metadata file in the app's working directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Content of an app's `metadata.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub name: String,
    pub eliona_min_version: String,
    pub display_name: BTreeMap<String, String>,
    pub description: BTreeMap<String, String>,
    pub dashboard_template_names: Vec<String>,
    pub api_url: String,
    pub api_specification_path: String,
    pub documentation_url: String,
    pub use_environment: Vec<String>,
}

/// Metadata of the app together with the raw file content.
pub fn get_metadata() -> Result<(Metadata, Vec<u8>)> {
    metadata_from_file(METADATA_FILE)
}

pub fn metadata_from_file(path: impl AsRef<Path>) -> Result<(Metadata, Vec<u8>)> {
    let path = path.as_ref();
    let raw = std::fs::read(path).map_err(|source| SdkError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let metadata = serde_json::from_slice(&raw).map_err(|source| SdkError::ParseFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((metadata, raw))
}

/// App name from `metadata.json`, empty when it cannot be determined.
pub fn app_name() -> String {
    app_name_from_file(METADATA_FILE)
}

fn app_name_from_file(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    match metadata_from_file(path) {
        Ok((metadata, _)) => {
            if metadata.name.is_empty() {
                warn!(path = %path.display(), "Metadata file contains no app name");
            }
            metadata.name
        }
        Err(e) => {
            warn!(error = %e, "Cannot determine app name");
            String::new()
        }
    }
}

/// One unit of work of an init or patch run.
///
/// Steps receive the connection of the surrounding transaction and must do
/// all their database work on it.
#[async_trait]
pub trait InitStep: Send + Sync {
    async fn run(&self, conn: &mut PgConnection) -> std::result::Result<(), BoxError>;
}

/// Step executing every statement of an SQL file.
#[derive(Debug, Clone)]
pub struct ExecSqlFile {
    path: PathBuf,
}

pub fn exec_sql_file(path: impl Into<PathBuf>) -> ExecSqlFile {
    ExecSqlFile { path: path.into() }
}

#[async_trait]
impl InitStep for ExecSqlFile {
    async fn run(&self, conn: &mut PgConnection) -> std::result::Result<(), BoxError> {
        eliona_db::exec_file(conn, &self.path).await?;
        Ok(())
    }
}

type StepFn =
    dyn for<'c> Fn(&'c mut PgConnection) -> BoxFuture<'c, std::result::Result<(), BoxError>> + Send + Sync;

/// Step built from a function.
///
/// ```no_run
/// use eliona_sdk::app::step;
///
/// let create_schema = step(|conn| {
///     Box::pin(async move {
///         sqlx::query("create schema if not exists weather").execute(conn).await?;
///         Ok(())
///     })
/// });
/// ```
pub struct FnStep(Box<StepFn>);

pub fn step<F>(f: F) -> FnStep
where
    F: for<'c> Fn(&'c mut PgConnection) -> BoxFuture<'c, std::result::Result<(), BoxError>>
        + Send
        + Sync
        + 'static,
{
    FnStep(Box::new(f))
}

#[async_trait]
impl InitStep for FnStep {
    async fn run(&self, conn: &mut PgConnection) -> std::result::Result<(), BoxError> {
        (self.0)(conn).await
    }
}

/// Where initialized apps and applied patches are recorded.
///
/// Recording happens in two places: inside the transaction of the run, before
/// commit, and after a successful commit. Implementations use whichever fits.
#[async_trait]
pub trait AppRegistry: Send + Sync {
    async fn app_registered(&self, pool: &PgPool, app_name: &str) -> std::result::Result<bool, AppError>;

    async fn register_app_in_transaction(
        &self,
        _conn: &mut PgConnection,
        _app_name: &str,
    ) -> std::result::Result<(), AppError> {
        Ok(())
    }

    async fn register_app(&self, _pool: &PgPool, _app_name: &str) -> std::result::Result<(), AppError> {
        Ok(())
    }

    async fn patch_applied(
        &self,
        pool: &PgPool,
        app_name: &str,
        patch_name: &str,
    ) -> std::result::Result<bool, AppError>;

    async fn apply_patch_in_transaction(
        &self,
        _conn: &mut PgConnection,
        _app_name: &str,
        _patch_name: &str,
    ) -> std::result::Result<(), AppError> {
        Ok(())
    }

    async fn apply_patch(
        &self,
        _pool: &PgPool,
        _app_name: &str,
        _patch_name: &str,
    ) -> std::result::Result<(), AppError> {
        Ok(())
    }
}

/// Registry backed by the app endpoints of the Eliona API.
///
/// Registration happens after commit and is preceded by [`fix_privilege`].
#[derive(Debug, Clone)]
pub struct ApiRegistry {
    client: ElionaClient,
}

impl ApiRegistry {
    pub fn new(client: ElionaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AppRegistry for ApiRegistry {
    async fn app_registered(&self, _pool: &PgPool, app_name: &str) -> std::result::Result<bool, AppError> {
        match self.client.get_app(app_name).await {
            Ok(app) => Ok(app.registered),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn register_app(&self, pool: &PgPool, app_name: &str) -> std::result::Result<(), AppError> {
        fix_privilege(pool, app_name).await;
        self.client.register_app(app_name).await?;
        Ok(())
    }

    async fn patch_applied(
        &self,
        _pool: &PgPool,
        app_name: &str,
        patch_name: &str,
    ) -> std::result::Result<bool, AppError> {
        match self.client.get_patch(app_name, patch_name).await {
            Ok(patch) => Ok(patch.applied),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_patch(
        &self,
        pool: &PgPool,
        app_name: &str,
        patch_name: &str,
    ) -> std::result::Result<(), AppError> {
        fix_privilege(pool, app_name).await;
        self.client.apply_patch(app_name, patch_name).await?;
        Ok(())
    }
}

/// Registry backed by `public.eliona_app` and `versioning.patches`.
///
/// Records are written inside the run's transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseRegistry;

#[async_trait]
impl AppRegistry for DatabaseRegistry {
    async fn app_registered(&self, pool: &PgPool, app_name: &str) -> std::result::Result<bool, AppError> {
        let count: i64 = query_scalar(
            pool,
            "select count(*) from public.eliona_app where app_name = $1 and initialised",
            args![app_name]?,
        )
        .await?;
        Ok(count > 0)
    }

    async fn register_app_in_transaction(
        &self,
        conn: &mut PgConnection,
        app_name: &str,
    ) -> std::result::Result<(), AppError> {
        exec(
            conn,
            "insert into public.eliona_app (app_name, category, active, initialised) \
             values ($1, 'app', true, true) \
             on conflict (app_name) do update set initialised = true",
            args![app_name]?,
        )
        .await?;
        Ok(())
    }

    async fn patch_applied(
        &self,
        pool: &PgPool,
        app_name: &str,
        patch_name: &str,
    ) -> std::result::Result<bool, AppError> {
        let count: i64 = query_scalar(
            pool,
            "select count(*) from versioning.patches where app_name = $1 and patch_name = $2",
            args![app_name, patch_name]?,
        )
        .await?;
        Ok(count > 0)
    }

    async fn apply_patch_in_transaction(
        &self,
        conn: &mut PgConnection,
        app_name: &str,
        patch_name: &str,
    ) -> std::result::Result<(), AppError> {
        exec(
            conn,
            "insert into versioning.patches (patch_name, app_name, applied_tsz, applied_by) \
             values ($1, $2, now(), current_user)",
            args![patch_name, app_name]?,
        )
        .await?;
        Ok(())
    }
}

/// Run the init steps of `app_name` unless the app is registered already.
#[instrument(skip(pool, registry, steps), fields(steps = steps.len()))]
pub async fn init(
    pool: &PgPool,
    registry: &dyn AppRegistry,
    app_name: &str,
    steps: &[&dyn InitStep],
) -> std::result::Result<(), AppError> {
    if registry.app_registered(pool, app_name).await? {
        info!(app_name, "Skip init because app is already initialized");
        return Ok(());
    }
    info!(app_name, "Start initializing and registering the app");

    let mut tx = pool.begin().await?;
    run_steps(&mut tx, steps).await?;
    registry.register_app_in_transaction(&mut tx, app_name).await?;
    tx.commit().await?;

    registry.register_app(pool, app_name).await?;
    info!(app_name, "Finished initializing and registering the app");
    Ok(())
}

/// Run the steps of `patch_name` unless the patch is applied already.
#[instrument(skip(pool, registry, steps), fields(steps = steps.len()))]
pub async fn patch(
    pool: &PgPool,
    registry: &dyn AppRegistry,
    app_name: &str,
    patch_name: &str,
    steps: &[&dyn InitStep],
) -> std::result::Result<(), AppError> {
    if registry.patch_applied(pool, app_name, patch_name).await? {
        info!(app_name, patch_name, "Skip patching because patch is already applied");
        return Ok(());
    }
    info!(app_name, patch_name, "Start patching the app");

    let mut tx = pool.begin().await?;
    run_steps(&mut tx, steps).await?;
    registry
        .apply_patch_in_transaction(&mut tx, app_name, patch_name)
        .await?;
    tx.commit().await?;

    registry.apply_patch(pool, app_name, patch_name).await?;
    info!(app_name, patch_name, "Finished patching the app");
    Ok(())
}

async fn run_steps(conn: &mut PgConnection, steps: &[&dyn InitStep]) -> std::result::Result<(), AppError> {
    for (index, step) in steps.iter().enumerate() {
        step.run(conn)
            .await
            .map_err(|source| AppError::Step { index, source })?;
        debug!(index, "Step finished");
    }
    Ok(())
}

/// Grant the platform roles access to `schema` by calling the database's
/// `fixprivilege` function for the pool's user.
///
/// Failures are logged as warnings and not returned.
pub async fn fix_privilege(pool: &PgPool, schema: &str) {
    let options = pool.connect_options();
    let user = options.get_username();
    let arguments = match args![schema, user] {
        Ok(arguments) => arguments,
        Err(e) => {
            warn!(error = %e, schema, "Cannot fix privileges");
            return;
        }
    };
    if let Err(e) = exec(pool, "select fixprivilege($1, $2)", arguments).await {
        warn!(error = %e, schema, "Cannot fix privileges");
    }
}
