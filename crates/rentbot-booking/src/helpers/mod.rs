// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input normalisation shared by the services and the chat layer.

pub mod dates;
pub mod pagination;
pub mod phone;
pub mod sanitize;

pub use dates::{date_range, format_date, parse_date, MAX_RANGE_DATES};
pub use pagination::{paginate, Page, DEFAULT_BOOKING_PAGE_SIZE, DEFAULT_ITEM_PAGE_SIZE};
pub use phone::{format_phone, is_valid_phone, normalize_phone};
pub use sanitize::{sanitize_input, validate_name};
