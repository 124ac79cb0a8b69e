// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Rentbot booking engine.
//!
//! This crate provides the domain model (items, users, bookings, outbox
//! tasks, conversational state), the adapter traits the engine is wired
//! through, and the error type shared by every crate in the workspace.

pub mod chat;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RentError;
pub use types::{
    AdapterType, Booking, BookingEvent, BookingStatus, HealthStatus, Item, NewBooking, SyncJob,
    SyncTask, SyncTaskKind, SyncTaskStatus, User, UserState,
};

pub use traits::{ChatChannel, Clock, FixedClock, MirrorSink, PluginAdapter, Store, SystemClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_store<T: Store>() {}
        fn _assert_chat_channel<T: ChatChannel>() {}
        fn _assert_mirror_sink<T: MirrorSink>() {}
        fn _assert_clock<T: Clock>() {}
        _assert_clock::<SystemClock>();
        _assert_clock::<FixedClock>();
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Channel,
            AdapterType::Store,
            AdapterType::Sink,
            AdapterType::Observability,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }
}
