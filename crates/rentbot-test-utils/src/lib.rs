// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Rentbot integration tests.
//!
//! Provides mock adapters and a wired harness for fast, deterministic,
//! CI-runnable tests without a messaging platform or a real mirror.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock chat channel with update injection and capture
//! - [`MockSink`] - In-memory mirror sink with scriptable failures
//! - [`TestHarness`] - Store, services and orchestrator on a temp database

pub mod harness;
pub mod mock_channel;
pub mod mock_sink;

pub use harness::{TestHarness, TestHarnessBuilder, MANAGER_ID, USER_ID};
pub use mock_channel::{MockChannel, SentDocument};
pub use mock_sink::{MockSink, SinkCall};
