// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Statement execution and typed queries.
//!
//! Every helper takes any sqlx executor (pool, connection or transaction) and
//! a [`PgArguments`] list, usually built with [`args!`](crate::args). Failures
//! are logged with the offending statement before they are returned.

use std::path::Path;

use futures::TryStreamExt;
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::{Executor, FromRow, Postgres};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::{DbError, Result};

fn log_failure(sql: &str, err: sqlx::Error) -> DbError {
    error!(error = %err, sql = %sql.trim(), "Error executing statement");
    DbError::Sqlx(err)
}

/// Build a [`PgArguments`] list from bind values.
///
/// Evaluates to `Result<PgArguments, DbError>`.
///
/// ```
/// let arguments = eliona_db::args!["weather", 42_i32]?;
/// # Ok::<(), eliona_db::DbError>(())
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::core::result::Result::<$crate::PgArguments, $crate::DbError>::Ok(
            $crate::PgArguments::default(),
        )
    };
    ($($value:expr),+ $(,)?) => {{
        let mut arguments = $crate::PgArguments::default();
        let mut result: ::core::result::Result<(), $crate::DbError> = ::core::result::Result::Ok(());
        $(
            if result.is_ok() {
                result = $crate::Arguments::add(&mut arguments, $value).map_err($crate::DbError::Encode);
            }
        )+
        result.map(|()| arguments)
    }};
}

/// Execute a statement and return the number of affected rows.
pub async fn exec<'c, E>(executor: E, sql: &str, args: PgArguments) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query_with(sql, args)
        .execute(executor)
        .await
        .map_err(|e| log_failure(sql, e))?;
    Ok(result.rows_affected())
}

/// Execute every statement of an SQL file on `conn`.
///
/// Pool callers pass `&mut *pool.acquire().await?`; inside a transaction pass
/// `&mut *tx`.
pub async fn exec_file(conn: &mut PgConnection, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let sql = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| {
            error!(error = %source, path = %path.display(), "Error reading sql file");
            DbError::ReadFile {
                path: path.to_path_buf(),
                source,
            }
        })?;

    (&mut *conn).execute(sqlx::raw_sql(&sql)).await.map_err(|e| {
        error!(error = %e, path = %path.display(), "Error executing sql file");
        DbError::Sqlx(e)
    })?;

    debug!(path = %path.display(), "Executed sql file");
    Ok(())
}

/// Run a query and map every row onto `T`.
pub async fn query<'c, T, E>(executor: E, sql: &str, args: PgArguments) -> Result<Vec<T>>
where
    E: Executor<'c, Database = Postgres>,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    sqlx::query_as_with::<_, T, _>(sql, args)
        .fetch_all(executor)
        .await
        .map_err(|e| log_failure(sql, e))
}

/// Run a query and send every row into `rows`.
///
/// Rows are streamed, not buffered. The sender is dropped when the query
/// completes, which closes the channel for the receiver. Streaming stops early
/// once the receiver is gone.
pub async fn query_into<'c, T, E>(
    executor: E,
    sql: &str,
    args: PgArguments,
    rows: mpsc::Sender<T>,
) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut stream = sqlx::query_as_with::<_, T, _>(sql, args).fetch(executor);
    while let Some(row) = stream.try_next().await.map_err(|e| log_failure(sql, e))? {
        if rows.send(row).await.is_err() {
            debug!("Row receiver dropped, stopping query");
            break;
        }
    }
    Ok(())
}

/// Run a query that must return exactly one row.
pub async fn query_single_row<'c, T, E>(executor: E, sql: &str, args: PgArguments) -> Result<T>
where
    E: Executor<'c, Database = Postgres>,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    sqlx::query_as_with::<_, T, _>(sql, args)
        .fetch_one(executor)
        .await
        .map_err(|e| log_failure(sql, e))
}

/// Run a query that returns at most one row.
pub async fn query_optional<'c, T, E>(
    executor: E,
    sql: &str,
    args: PgArguments,
) -> Result<Option<T>>
where
    E: Executor<'c, Database = Postgres>,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    sqlx::query_as_with::<_, T, _>(sql, args)
        .fetch_optional(executor)
        .await
        .map_err(|e| log_failure(sql, e))
}

/// Run a query returning one row with one column.
pub async fn query_scalar<'c, T, E>(executor: E, sql: &str, args: PgArguments) -> Result<T>
where
    E: Executor<'c, Database = Postgres>,
    (T,): for<'r> FromRow<'r, PgRow>,
    T: Send + Unpin,
{
    sqlx::query_scalar_with::<_, T, _>(sql, args)
        .fetch_one(executor)
        .await
        .map_err(|e| log_failure(sql, e))
}
