// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for the Rentbot booking engine.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. The rendered
//! text is available through [`PrometheusAdapter::render`].

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use rentbot_core::types::{AdapterType, HealthStatus};
use rentbot_core::{PluginAdapter, RentError};

pub use recording::{
    record_booking_created, record_booking_event, record_rate_limited, record_sync_task,
    record_update, record_update_error, record_update_latency, register_metrics,
    set_active_users, set_memory_heap, set_memory_resident, set_outbox_failed,
    set_pending_bookings,
};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and keeps a handle for rendering.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Installs the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn new() -> Result<Self, RentError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            RentError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, RentError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RentError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One recorder per process, so a single test covers install and render.
    #[tokio::test]
    async fn installs_once_and_renders_recorded_metrics() {
        let adapter = PrometheusAdapter::new().unwrap();
        assert_eq!(adapter.name(), "prometheus");
        assert_eq!(adapter.adapter_type(), AdapterType::Observability);
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Healthy);

        record_update("message");
        record_sync_task("upsert", "completed");
        set_pending_bookings(3.0);

        let text = adapter.render();
        assert!(text.contains("rentbot_updates_total"));
        assert!(text.contains("rentbot_sync_tasks_total"));
        assert!(text.contains("rentbot_pending_bookings 3"));

        assert!(PrometheusAdapter::new().is_err());
    }

    #[test]
    fn recording_helpers_never_panic() {
        record_booking_event("booking_created");
        record_rate_limited();
        record_update_latency(0.25);
    }
}
