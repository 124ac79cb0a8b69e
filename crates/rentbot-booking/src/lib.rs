// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Services of the Rentbot booking engine.
//!
//! [`BookingService`] drives the booking lifecycle, [`UserService`] resolves
//! roles and stores profiles, and [`ItemService`] maintains the catalogue.
//! All three hold only an `Arc<dyn Store>`; the store owns the data.

pub mod booking;
pub mod helpers;
pub mod item;
pub mod rules;
pub mod user;

pub use booking::{
    BookingService, DayAvailability, FailedDate, ManagerBookingOutcome, ManagerBookingRequest,
};
pub use item::{ItemService, Move};
pub use rules::BookingRules;
pub use user::UserService;
