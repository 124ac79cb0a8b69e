// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing message texts.
//!
//! Messages are sent with HTML parse mode. Names and comments are escaped
//! when they are captured, so stored values are embedded as they are.

use std::fmt::Write;

use rentbot_booking::helpers::{format_date, format_phone};
use rentbot_booking::{DayAvailability, FailedDate};
use rentbot_core::types::BookingStats;
use rentbot_core::{Booking, BookingStatus, Item, RentError};

// Reply keyboard labels. Incoming text is matched against these.
pub const BTN_BOOK: &str = "📅 Book an item";
pub const BTN_MY_BOOKINGS: &str = "📋 My bookings";
pub const BTN_SCHEDULE: &str = "🗓 Schedule";
pub const BTN_CONTACTS: &str = "☎️ Contacts";
pub const BTN_PENDING: &str = "⏳ Pending bookings";
pub const BTN_NEW_BOOKING: &str = "➕ New booking";
pub const BTN_STATS: &str = "📊 Statistics";
pub const BTN_BACK: &str = "⬅️ Back";
pub const BTN_CANCEL: &str = "❌ Cancel";
pub const BTN_CONFIRM: &str = "✅ Confirm";
pub const BTN_SKIP: &str = "Skip";
pub const BTN_SHARE_PHONE: &str = "📱 Share phone number";
pub const BTN_CHECK_DATE: &str = "🔎 Check a date";

// Inline button labels.
pub const BTN_PREV: &str = "« Prev";
pub const BTN_NEXT: &str = "Next »";
pub const BTN_MAIN_MENU: &str = "🏠 Main menu";
pub const BTN_SINGLE_DATE: &str = "One day";
pub const BTN_DATE_RANGE: &str = "Several days";
pub const BTN_CALL: &str = "📞 Contact client";
pub const BTN_EXPORT_USERS: &str = "⬇️ Export users";

pub const MAIN_MENU: &str = "Choose an action from the menu below.";
pub const CHOOSE_ITEM: &str = "Choose an item:";
pub const NO_ITEMS: &str = "No items are available right now.";
pub const ENTER_NAME: &str = "Please enter your name:";
pub const ENTER_PHONE: &str =
    "Share your phone number with the button below or type it, e.g. +7 999 123-45-67.";
pub const INVALID_PHONE: &str = "That does not look like a phone number. Please try again.";
pub const INVALID_DATE: &str = "Please enter the date as DD.MM.YYYY, for example 05.06.2025.";
pub const BOOKING_SUBMITTED: &str =
    "Thank you! Your request was sent to a manager. You will be notified once it is reviewed.";
pub const RATE_LIMITED: &str = "You are sending messages too fast. Please wait a minute.";
pub const MANAGERS_ONLY: &str = "This command is available to managers only.";
pub const UNKNOWN_INPUT: &str = "Sorry, I did not understand that. Use the menu below.";
pub const NO_BOOKINGS: &str = "You have no upcoming bookings.";
pub const NO_PENDING: &str = "There are no pending bookings.";
pub const NO_CONTACTS: &str = "Contacts are not configured yet.";
pub const ENTER_CLIENT_NAME: &str = "Enter the client's name:";
pub const ENTER_CLIENT_PHONE: &str = "Enter the client's phone number:";
pub const CHOOSE_DATE_TYPE: &str = "Book one day or several days in a row?";
pub const ENTER_SINGLE_DATE: &str = "Enter the date (DD.MM.YYYY):";
pub const ENTER_START_DATE: &str = "Enter the first date (DD.MM.YYYY):";
pub const ENTER_END_DATE: &str = "Enter the last date (DD.MM.YYYY):";
pub const ENTER_COMMENT: &str = "Add a comment for this booking, or press Skip.";
pub const ENTER_SPECIFIC_DATE: &str = "Enter the date to check (DD.MM.YYYY):";
pub const CHOOSE_NEW_ITEM: &str = "Choose the new item:";
pub const NO_OTHER_ITEMS: &str = "No other item is free on that date.";
pub const EXPORT_FAILED: &str = "The export could not be created. Please try again later.";
pub const DONE: &str = "Done.";

/// Short human label of a status.
pub fn status_label(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Pending => "⏳ pending",
        BookingStatus::Confirmed => "✅ confirmed",
        BookingStatus::Changed => "🔄 item changed",
        BookingStatus::Rescheduled => "📆 awaiting new date",
        BookingStatus::Canceled => "❌ canceled",
        BookingStatus::Completed => "🏁 completed",
    }
}

/// Reply shown for an error surfaced by a service call.
pub fn error_reply(err: &RentError) -> String {
    match err {
        RentError::NotAvailable => {
            "Sorry, this item is fully booked on that date. Please choose another date or item."
                .into()
        }
        RentError::PastDate => "This date can no longer be booked.".into(),
        RentError::DateTooFar => "This date is too far ahead. Please choose an earlier one.".into(),
        RentError::ConcurrentModification => {
            "This booking was just changed by someone else. Refresh it and try again.".into()
        }
        RentError::NotFound { entity, .. } => format!("The {entity} was not found."),
        RentError::Validation(msg) => format!("⚠️ {msg}"),
        RentError::InvalidTransition { from, to } => format!(
            "This booking is {} and cannot become {}.",
            status_label(*from),
            status_label(*to)
        ),
        _ => "Something went wrong on our side. Please try again later.".into(),
    }
}

pub fn welcome(first_name: &str, is_manager: bool) -> String {
    let mut text = format!("Hello, {}! ", escape(first_name));
    if is_manager {
        text.push_str("You are signed in as a manager.");
    } else {
        text.push_str("Here you can book an item for a day.");
    }
    text
}

/// Full description of a booking, as shown to managers.
pub fn booking_card(booking: &Booking) -> String {
    let mut text = format!("<b>Booking #{}</b>\n", booking.id);
    let _ = writeln!(text, "Item: {}", booking.item_name);
    let _ = writeln!(text, "Date: {}", format_date(booking.date));
    let _ = write!(text, "Client: {}", booking.user_name);
    if let Some(username) = &booking.username {
        let _ = write!(text, " (@{username})");
    }
    text.push('\n');
    let _ = writeln!(text, "Phone: {}", format_phone(&booking.phone));
    let _ = write!(text, "Status: {}", status_label(booking.status));
    if let Some(comment) = &booking.comment {
        let _ = write!(text, "\nComment: {comment}");
    }
    text
}

/// One-line summary used in lists.
pub fn booking_line(booking: &Booking) -> String {
    format!(
        "#{} {} · {} · {}",
        booking.id,
        format_date(booking.date),
        booking.item_name,
        status_label(booking.status)
    )
}

pub fn booking_list(title: &str, bookings: &[Booking], page: usize, total_pages: usize) -> String {
    let mut text = format!("<b>{title}</b>");
    if total_pages > 1 {
        let _ = write!(text, " (page {}/{total_pages})", page + 1);
    }
    for booking in bookings {
        let _ = write!(text, "\n{}", booking_line(booking));
    }
    text
}

pub fn confirm_request(item: &Item, date: chrono::NaiveDate, name: &str, phone: &str) -> String {
    format!(
        "Please check your request:\n\nItem: {}\nDate: {}\nName: {name}\nPhone: {}\n\nPress Confirm to send it.",
        item.name,
        format_date(date),
        format_phone(phone)
    )
}

pub fn item_selected(item: &Item) -> String {
    format!(
        "You chose <b>{}</b>. Enter the date you need (DD.MM.YYYY):",
        item.name
    )
}

pub fn manager_confirm_request(
    client_name: &str,
    client_phone: &str,
    item: &Item,
    dates: &[chrono::NaiveDate],
    comment: Option<&str>,
) -> String {
    let dates = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) if dates.len() > 1 => format!(
            "{} to {} ({} days)",
            format_date(*first),
            format_date(*last),
            dates.len()
        ),
        (Some(first), _) => format_date(*first),
        _ => String::new(),
    };
    let mut text = format!(
        "Create a confirmed booking?\n\nClient: {client_name}\nPhone: {}\nItem: {}\nDates: {dates}",
        format_phone(client_phone),
        item.name
    );
    if let Some(comment) = comment {
        let _ = write!(text, "\nComment: {comment}");
    }
    text
}

pub fn manager_batch_result(created: &[Booking], failed: &[FailedDate]) -> String {
    let mut text = format!("Created {} booking(s).", created.len());
    for booking in created {
        let _ = write!(text, "\n✅ {} · #{}", format_date(booking.date), booking.id);
    }
    if !failed.is_empty() {
        let _ = write!(text, "\n\nFailed {}:", failed.len());
        for f in failed {
            let _ = write!(text, "\n❌ {}: {}", format_date(f.date), error_reply(&f.error));
        }
    }
    text
}

pub fn item_list(items: &[Item]) -> String {
    if items.is_empty() {
        return NO_ITEMS.to_string();
    }
    let mut text = String::from("<b>Items</b>");
    for item in items {
        let _ = write!(
            text,
            "\n{}. {} · {} per day",
            item.sort_order, item.name, item.total_quantity
        );
    }
    text
}

pub fn item_created(item: &Item) -> String {
    format!(
        "Item <b>{}</b> added with {} unit(s) per day.",
        item.name, item.total_quantity
    )
}

pub fn item_updated(item: &Item) -> String {
    format!(
        "Item <b>{}</b> now has {} unit(s) per day.",
        item.name, item.total_quantity
    )
}

pub fn item_disabled(item: &Item) -> String {
    format!("Item <b>{}</b> is no longer offered.", item.name)
}

pub fn item_reordered(item: &Item) -> String {
    format!("Item <b>{}</b> is now at position {}.", item.name, item.sort_order)
}

/// Occupancy of one item over the next days.
pub fn schedule(item: &Item, days: &[DayAvailability]) -> String {
    let mut text = format!("<b>{}</b>: free units per day", item.name);
    for day in days {
        let _ = write!(
            text,
            "\n{} · {}/{}",
            format_date(day.date),
            day.free(),
            day.capacity
        );
    }
    text
}

pub fn day_availability(item: &Item, day: &DayAvailability) -> String {
    if day.free() > 0 {
        format!(
            "<b>{}</b> on {}: {} of {} free.",
            item.name,
            format_date(day.date),
            day.free(),
            day.capacity
        )
    } else {
        format!(
            "<b>{}</b> is fully booked on {}.",
            item.name,
            format_date(day.date)
        )
    }
}

pub fn contacts(lines: &[String]) -> String {
    if lines.is_empty() {
        return NO_CONTACTS.to_string();
    }
    let mut text = String::from("<b>Contacts</b>");
    for line in lines {
        let _ = write!(text, "\n{}", escape(line));
    }
    text
}

pub fn client_contact(booking: &Booking) -> String {
    let mut text = format!(
        "{}: {}",
        booking.user_name,
        format_phone(&booking.phone)
    );
    if let Some(username) = &booking.username {
        let _ = write!(text, "\nhttps://t.me/{username}");
    }
    text
}

pub fn stats(stats: &BookingStats) -> String {
    let mut text = String::from("<b>Statistics</b>");
    let total: i64 = stats.by_status.values().sum();
    let _ = write!(text, "\nBookings: {total}");
    for (status, count) in &stats.by_status {
        let _ = write!(text, "\n  {}: {count}", status_label(*status));
    }
    let _ = write!(text, "\nUsers: {}", stats.total_users);
    let _ = write!(text, "\nActive in 30 days: {}", stats.active_users);
    let _ = write!(text, "\nFailed sync tasks: {}", stats.failed_sync_tasks);
    text
}

pub fn new_booking_for_managers(booking: &Booking) -> String {
    format!("🆕 New booking request\n\n{}", booking_card(booking))
}

pub fn owner_update(booking: &Booking) -> String {
    let what = format!(
        "Booking #{} ({}, {})",
        booking.id,
        booking.item_name,
        format_date(booking.date)
    );
    match booking.status {
        BookingStatus::Confirmed => format!("✅ {what} is confirmed. See you!"),
        BookingStatus::Canceled => format!("❌ {what} was rejected."),
        BookingStatus::Completed => format!("🏁 {what} is completed. Thank you!"),
        BookingStatus::Changed => format!("🔄 The item of your booking changed. {what}."),
        BookingStatus::Rescheduled => format!(
            "📆 {what} has to be moved to another date. A manager will contact you."
        ),
        BookingStatus::Pending => format!("⏳ {what} is waiting for review again."),
    }
}

pub fn reminder(booking: &Booking) -> String {
    format!(
        "🔔 Reminder: tomorrow, {}, you have <b>{}</b> booked (booking #{}).",
        format_date(booking.date),
        booking.item_name,
        booking.id
    )
}

pub fn action_done(booking: &Booking) -> String {
    format!("{}\n\n{}", booking_card(booking), DONE)
}

pub fn export_caption(kind: &str, rows: usize) -> String {
    format!("{kind}: {rows} row(s)")
}

/// Escapes text that did not pass through input sanitisation.
pub fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;

    fn booking(status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: 42,
            user_id: 100,
            user_name: "Иван".into(),
            username: Some("ivan".into()),
            phone: "79991234567".into(),
            item_id: 1,
            item_name: "Kayak".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            status,
            comment: Some("holiday".into()),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn card_lists_every_field() {
        let card = booking_card(&booking(BookingStatus::Pending));
        assert!(card.contains("Booking #42"));
        assert!(card.contains("05.06.2025"));
        assert!(card.contains("Иван (@ivan)"));
        assert!(card.contains("+7 (999) 123-45-67"));
        assert!(card.contains("pending"));
        assert!(card.contains("holiday"));
    }

    #[test]
    fn domain_errors_get_specific_replies() {
        assert!(error_reply(&RentError::NotAvailable).contains("fully booked"));
        assert!(error_reply(&RentError::ConcurrentModification).contains("Refresh"));
        assert!(error_reply(&RentError::not_found("booking", 9)).contains("booking"));
        assert!(error_reply(&RentError::Internal("db".into())).contains("went wrong"));
    }

    #[test]
    fn owner_updates_follow_status() {
        assert!(owner_update(&booking(BookingStatus::Confirmed)).contains("confirmed"));
        assert!(owner_update(&booking(BookingStatus::Canceled)).contains("rejected"));
    }

    #[test]
    fn escape_handles_markup() {
        assert_eq!(escape("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
    }
}
