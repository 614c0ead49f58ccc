// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Small scheduling helpers: run-once guards, fan-out and polling loops.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use once_cell::sync::Lazy;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Guard that runs at most one future per id at a time.
///
/// A new run for an id is refused while an earlier run for the same id is
/// still in flight. The id is released when the future finishes, is aborted or
/// panics.
#[derive(Debug)]
pub struct RunOnce<K: Eq + Hash> {
    running: Arc<DashSet<K>>,
}

impl<K: Eq + Hash> Clone for RunOnce<K> {
    fn clone(&self) -> Self {
        Self {
            running: Arc::clone(&self.running),
        }
    }
}

impl<K: Eq + Hash> Default for RunOnce<K> {
    fn default() -> Self {
        Self {
            running: Arc::new(DashSet::new()),
        }
    }
}

impl<K> RunOnce<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run for `id` is in flight.
    pub fn is_running(&self, id: &K) -> bool {
        self.running.contains(id)
    }

    /// Spawn `future` unless a run for `id` is in flight.
    ///
    /// Returns `None` when the run was skipped.
    pub fn spawn<F>(&self, id: K, future: F) -> Option<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if !self.running.insert(id.clone()) {
            debug!(id = ?id, "Already running, skipping");
            return None;
        }

        let guard = Running {
            running: Arc::clone(&self.running),
            id,
        };
        Some(tokio::spawn(async move {
            let _guard = guard;
            future.await
        }))
    }
}

struct Running<K: Eq + Hash> {
    running: Arc<DashSet<K>>,
    id: K,
}

impl<K: Eq + Hash> Drop for Running<K> {
    fn drop(&mut self) {
        self.running.remove(&self.id);
    }
}

static RUN_ONCE: Lazy<RunOnce<String>> = Lazy::new(RunOnce::new);

/// Spawn `future` on the process-wide guard unless a run for `id` is in
/// flight.
pub fn run_once<F>(id: impl Into<String>, future: F) -> Option<JoinHandle<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    RUN_ONCE.spawn(id.into(), future)
}

/// Run all futures concurrently and wait for every one of them.
pub async fn wait_for<I>(futures: I) -> Vec<<I::Item as Future>::Output>
where
    I: IntoIterator,
    I::Item: Future,
{
    futures::future::join_all(futures).await
}

/// Call `f`, wait `interval`, repeat until `cancel` fires.
///
/// A running call is never interrupted; cancellation is observed between calls.
pub async fn run_loop<F, Fut>(mut f: F, interval: Duration, cancel: CancellationToken)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    while !cancel.is_cancelled() {
        f().await;
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// Call `f` every `interval` until SIGINT, SIGTERM or SIGQUIT.
pub async fn loop_every<F, Fut>(f: F, interval: Duration)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    let watcher = tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping loop");
        signal_cancel.cancel();
    });

    run_loop(f, interval, cancel).await;
    watcher.abort();
}

/// Resolves on SIGINT, SIGTERM or SIGQUIT.
pub async fn shutdown_signal() {
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match (signal(SignalKind::terminate()), signal(SignalKind::quit())) {
            (Ok(mut term), Ok(mut quit)) => {
                tokio::select! {
                    _ = term.recv() => {}
                    _ = quit.recv() => {}
                }
            }
            _ => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}
