// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling and background task teardown.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal
/// arrives.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
            let _ = ctrl_c.await;
            info!("received SIGINT (Ctrl+C), initiating shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl+C, initiating shutdown");
}

/// Waits for background loops to exit, aborting any still running after
/// `timeout`.
pub async fn join_background(handles: Vec<JoinHandle<()>>, timeout: Duration) {
    let count = handles.len();
    let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

    let joined = tokio::time::timeout(timeout, join_all(handles)).await;
    if joined.is_err() {
        warn!(count, "background tasks did not stop in time, aborting");
        for abort in aborts {
            abort.abort();
        }
    } else {
        debug!(count, "background tasks stopped");
    }
}

async fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            if e.is_panic() {
                warn!("background task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_starts_uncancelled() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn finished_tasks_are_joined() {
        let handles = vec![tokio::spawn(async {}), tokio::spawn(async {})];
        join_background(handles, Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_tasks_are_aborted() {
        let stuck = tokio::spawn(std::future::pending::<()>());
        let finished = tokio::spawn(async {});
        join_background(vec![finished, stuck], Duration::from_secs(5)).await;
    }
}
