// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder can collect these metrics.
//! Without an installed recorder every call is a no-op, which keeps tests
//! free of global state.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all Rentbot metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("rentbot_updates_total", "Total chat updates processed");
    describe_counter!(
        "rentbot_update_errors_total",
        "Chat updates that failed, timed out, or panicked"
    );
    describe_counter!("rentbot_bookings_created_total", "Bookings created");
    describe_counter!(
        "rentbot_booking_events_total",
        "Booking domain events published on the bus"
    );
    describe_counter!(
        "rentbot_sync_tasks_total",
        "Outbox tasks processed by the sync worker"
    );
    describe_counter!(
        "rentbot_rate_limited_total",
        "Updates dropped by the per-user rate limit"
    );
    describe_gauge!("rentbot_pending_bookings", "Bookings awaiting a manager decision");
    describe_gauge!("rentbot_outbox_failed", "Outbox tasks parked as failed");
    describe_gauge!("rentbot_active_users", "Users active in the last 30 days");
    describe_gauge!("rentbot_memory_heap_bytes", "Allocated heap bytes");
    describe_gauge!("rentbot_memory_resident_bytes", "Resident memory bytes");
    describe_histogram!(
        "rentbot_update_latency_seconds",
        "Time spent handling one chat update"
    );
}

/// Record a processed update.
pub fn record_update(kind: &str) {
    metrics::counter!("rentbot_updates_total", "kind" => kind.to_string()).increment(1);
}

/// Record a failed update. `reason` is one of `error`, `timeout`, `panic`.
pub fn record_update_error(reason: &str) {
    metrics::counter!("rentbot_update_errors_total", "reason" => reason.to_string()).increment(1);
}

/// Record update handling latency.
pub fn record_update_latency(seconds: f64) {
    metrics::histogram!("rentbot_update_latency_seconds").record(seconds);
}

pub fn record_booking_created() {
    metrics::counter!("rentbot_bookings_created_total").increment(1);
}

/// Record a booking event by its type name.
pub fn record_booking_event(event: &str) {
    metrics::counter!("rentbot_booking_events_total", "event" => event.to_string()).increment(1);
}

/// Record one outbox task outcome (`completed`, `retry`, `failed`, `released`).
pub fn record_sync_task(kind: &str, outcome: &str) {
    metrics::counter!(
        "rentbot_sync_tasks_total",
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("rentbot_rate_limited_total").increment(1);
}

pub fn set_pending_bookings(count: f64) {
    metrics::gauge!("rentbot_pending_bookings").set(count);
}

pub fn set_outbox_failed(count: f64) {
    metrics::gauge!("rentbot_outbox_failed").set(count);
}

pub fn set_active_users(count: f64) {
    metrics::gauge!("rentbot_active_users").set(count);
}

pub fn set_memory_heap(bytes: f64) {
    metrics::gauge!("rentbot_memory_heap_bytes").set(bytes);
}

pub fn set_memory_resident(bytes: f64) {
    metrics::gauge!("rentbot_memory_resident_bytes").set(bytes);
}
