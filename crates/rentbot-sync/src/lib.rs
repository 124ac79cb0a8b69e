// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background synchronisation of the booking store to an external mirror.
//!
//! The booking service writes outbox rows; [`SyncWorker`] consumes them with
//! at-least-once delivery, exponential backoff, and per-booking ordering.

pub mod backoff;
pub mod csv_mirror;
pub mod gate;
pub mod null;
pub mod worker;

use std::sync::Arc;

use rentbot_config::model::SyncConfig;
use rentbot_core::{MirrorSink, RentError};

pub use backoff::{RetryDecision, decide, retry_delay};
pub use csv_mirror::CsvMirror;
pub use gate::BookingGate;
pub use null::NullSink;
pub use worker::{SyncWorker, TaskOutcome, WorkerSettings};

/// Builds the sink selected by configuration: a CSV mirror when a directory
/// is configured, otherwise a sink that discards writes.
pub fn sink_from_config(config: &SyncConfig) -> Result<Arc<dyn MirrorSink>, RentError> {
    match config.mirror_dir.as_deref() {
        Some(dir) => Ok(Arc::new(CsvMirror::new(dir)?)),
        None => Ok(Arc::new(NullSink)),
    }
}
