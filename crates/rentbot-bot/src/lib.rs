// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat surface of the Rentbot booking engine.
//!
//! The [`Orchestrator`] maps inbound chat updates onto the conversation
//! state machine and the booking services; the [`UpdateRunner`] feeds it
//! from a [`ChatChannel`](rentbot_core::ChatChannel). Event-bus observers
//! ([`NotificationHandler`], [`MetricsObserver`]) and the background loops
//! ([`ReminderScheduler`], [`GaugeRefresher`]) live here as well.

pub mod callback;
pub mod command;
pub mod export;
pub mod keyboards;
pub mod metrics;
pub mod notifier;
pub mod orchestrator;
pub mod reminder;
pub mod runner;
pub mod texts;

pub use callback::{BookingAction, Callback};
pub use command::Command;
pub use export::CsvExporter;
pub use metrics::{GaugeRefresher, MetricsObserver};
pub use notifier::NotificationHandler;
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use reminder::ReminderScheduler;
pub use runner::UpdateRunner;
