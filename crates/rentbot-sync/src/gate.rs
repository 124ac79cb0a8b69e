// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-booking single-flight gate.
//!
//! Every task touching a booking takes the booking's slot before it reaches
//! the sink, so two workers never push changes for the same booking at once.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct BookingGate {
    slots: DashMap<i64, Arc<Mutex<()>>>,
}

impl BookingGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder owns `booking_id`.
    pub async fn acquire(&self, booking_id: i64) -> OwnedMutexGuard<()> {
        let slot = Arc::clone(self.slots.entry(booking_id).or_default().value());
        slot.lock_owned().await
    }

    /// Drops slots nobody holds or waits on.
    pub fn prune(&self) {
        self.slots.retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
