// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline button payloads.
//!
//! Every callback string the bot emits is built from a [`Callback`] and
//! parsed back into one, so handlers never pick strings apart themselves.
//! Encoded payloads stay well under the 64-byte platform limit.

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString};

use rentbot_core::{BookingStatus, RentError};

/// Manager actions on a single booking, encoded as `<action>_<bookingId>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum BookingAction {
    Confirm,
    Reject,
    Reschedule,
    Reopen,
    Complete,
    ChangeItem,
}

impl BookingAction {
    pub const ALL: [BookingAction; 6] = [
        BookingAction::Confirm,
        BookingAction::Reject,
        BookingAction::Reschedule,
        BookingAction::Reopen,
        BookingAction::Complete,
        BookingAction::ChangeItem,
    ];

    /// Status the booking ends up in.
    pub fn target(self) -> BookingStatus {
        match self {
            BookingAction::Confirm => BookingStatus::Confirmed,
            BookingAction::Reject => BookingStatus::Canceled,
            BookingAction::Reschedule => BookingStatus::Rescheduled,
            BookingAction::Reopen => BookingStatus::Pending,
            BookingAction::Complete => BookingStatus::Completed,
            BookingAction::ChangeItem => BookingStatus::Changed,
        }
    }

    /// Whether the button makes sense for a booking in `status`.
    pub fn applies_to(self, status: BookingStatus) -> bool {
        status.can_transition_to(self.target())
    }
}

/// A parsed inline button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    BackToMain,
    BackToMainFromSchedule,
    ItemsPage(usize),
    SelectItem(i64),
    ScheduleItemsPage(usize),
    ScheduleSelectItem(i64),
    ManagerItemsPage(usize),
    ManagerSelectItem(i64),
    ManagerSingleDate,
    ManagerDateRange,
    Booking {
        action: BookingAction,
        booking_id: i64,
    },
    ChangeTo {
        booking_id: i64,
        item_id: i64,
    },
    CallBooking(i64),
    ShowBooking(i64),
    ExportUsers,
    PendingPage(usize),
    MyBookingsPage(usize),
}

mod tags {
    pub const BACK_TO_MAIN: &str = "back_to_main";
    pub const BACK_TO_MAIN_FROM_SCHEDULE: &str = "back_to_main_from_schedule";
    pub const ITEMS_PAGE: &str = "items_page";
    pub const SELECT_ITEM: &str = "select_item";
    pub const SCHEDULE_ITEMS_PAGE: &str = "schedule_items_page";
    pub const SCHEDULE_SELECT_ITEM: &str = "schedule_select_item";
    pub const MANAGER_ITEMS_PAGE: &str = "manager_items_page";
    pub const MANAGER_SELECT_ITEM: &str = "manager_select_item";
    pub const MANAGER_SINGLE_DATE: &str = "manager_single_date";
    pub const MANAGER_DATE_RANGE: &str = "manager_date_range";
    pub const CHANGE_TO: &str = "change_to_";
    pub const CALL_BOOKING: &str = "call_booking";
    pub const SHOW_BOOKING: &str = "show_booking";
    pub const EXPORT_USERS: &str = "export_users";
    pub const PENDING_PAGE: &str = "pending_page";
    pub const MY_BOOKINGS_PAGE: &str = "my_bookings_page";
}

fn malformed(data: &str) -> RentError {
    RentError::Validation(format!("unrecognised callback `{data}`"))
}

fn number<T: FromStr>(raw: &str, data: &str) -> Result<T, RentError> {
    raw.parse().map_err(|_| malformed(data))
}

impl Callback {
    pub fn parse(data: &str) -> Result<Callback, RentError> {
        match data {
            tags::BACK_TO_MAIN => return Ok(Callback::BackToMain),
            tags::BACK_TO_MAIN_FROM_SCHEDULE => return Ok(Callback::BackToMainFromSchedule),
            tags::MANAGER_SINGLE_DATE => return Ok(Callback::ManagerSingleDate),
            tags::MANAGER_DATE_RANGE => return Ok(Callback::ManagerDateRange),
            tags::EXPORT_USERS => return Ok(Callback::ExportUsers),
            _ => {}
        }

        if let Some((tag, arg)) = data.split_once(':') {
            return match tag {
                tags::ITEMS_PAGE => Ok(Callback::ItemsPage(number(arg, data)?)),
                tags::SELECT_ITEM => Ok(Callback::SelectItem(number(arg, data)?)),
                tags::SCHEDULE_ITEMS_PAGE => Ok(Callback::ScheduleItemsPage(number(arg, data)?)),
                tags::SCHEDULE_SELECT_ITEM => Ok(Callback::ScheduleSelectItem(number(arg, data)?)),
                tags::MANAGER_ITEMS_PAGE => Ok(Callback::ManagerItemsPage(number(arg, data)?)),
                tags::MANAGER_SELECT_ITEM => Ok(Callback::ManagerSelectItem(number(arg, data)?)),
                tags::CALL_BOOKING => Ok(Callback::CallBooking(number(arg, data)?)),
                tags::SHOW_BOOKING => Ok(Callback::ShowBooking(number(arg, data)?)),
                tags::PENDING_PAGE => Ok(Callback::PendingPage(number(arg, data)?)),
                tags::MY_BOOKINGS_PAGE => Ok(Callback::MyBookingsPage(number(arg, data)?)),
                _ => Err(malformed(data)),
            };
        }

        if let Some(rest) = data.strip_prefix(tags::CHANGE_TO) {
            let (booking_id, item_id) = rest.split_once('_').ok_or_else(|| malformed(data))?;
            return Ok(Callback::ChangeTo {
                booking_id: number(booking_id, data)?,
                item_id: number(item_id, data)?,
            });
        }

        let (action, booking_id) = data.rsplit_once('_').ok_or_else(|| malformed(data))?;
        let action = BookingAction::from_str(action).map_err(|_| malformed(data))?;
        Ok(Callback::Booking {
            action,
            booking_id: number(booking_id, data)?,
        })
    }
}

impl FromStr for Callback {
    type Err = RentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Callback::parse(s)
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::BackToMain => f.write_str(tags::BACK_TO_MAIN),
            Callback::BackToMainFromSchedule => f.write_str(tags::BACK_TO_MAIN_FROM_SCHEDULE),
            Callback::ItemsPage(n) => write!(f, "{}:{n}", tags::ITEMS_PAGE),
            Callback::SelectItem(id) => write!(f, "{}:{id}", tags::SELECT_ITEM),
            Callback::ScheduleItemsPage(n) => write!(f, "{}:{n}", tags::SCHEDULE_ITEMS_PAGE),
            Callback::ScheduleSelectItem(id) => write!(f, "{}:{id}", tags::SCHEDULE_SELECT_ITEM),
            Callback::ManagerItemsPage(n) => write!(f, "{}:{n}", tags::MANAGER_ITEMS_PAGE),
            Callback::ManagerSelectItem(id) => write!(f, "{}:{id}", tags::MANAGER_SELECT_ITEM),
            Callback::ManagerSingleDate => f.write_str(tags::MANAGER_SINGLE_DATE),
            Callback::ManagerDateRange => f.write_str(tags::MANAGER_DATE_RANGE),
            Callback::Booking { action, booking_id } => write!(f, "{action}_{booking_id}"),
            Callback::ChangeTo {
                booking_id,
                item_id,
            } => write!(f, "{}{booking_id}_{item_id}", tags::CHANGE_TO),
            Callback::CallBooking(id) => write!(f, "{}:{id}", tags::CALL_BOOKING),
            Callback::ShowBooking(id) => write!(f, "{}:{id}", tags::SHOW_BOOKING),
            Callback::ExportUsers => f.write_str(tags::EXPORT_USERS),
            Callback::PendingPage(n) => write!(f, "{}:{n}", tags::PENDING_PAGE),
            Callback::MyBookingsPage(n) => write!(f, "{}:{n}", tags::MY_BOOKINGS_PAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_tags() {
        assert_eq!(Callback::parse("back_to_main").unwrap(), Callback::BackToMain);
        assert_eq!(
            Callback::parse("back_to_main_from_schedule").unwrap(),
            Callback::BackToMainFromSchedule
        );
        assert_eq!(
            Callback::parse("manager_date_range").unwrap(),
            Callback::ManagerDateRange
        );
        assert_eq!(Callback::parse("export_users").unwrap(), Callback::ExportUsers);
    }

    #[test]
    fn parses_numeric_arguments() {
        assert_eq!(Callback::parse("items_page:2").unwrap(), Callback::ItemsPage(2));
        assert_eq!(Callback::parse("select_item:1").unwrap(), Callback::SelectItem(1));
        assert_eq!(
            Callback::parse("schedule_select_item:7").unwrap(),
            Callback::ScheduleSelectItem(7)
        );
        assert_eq!(
            Callback::parse("manager_items_page:0").unwrap(),
            Callback::ManagerItemsPage(0)
        );
        assert_eq!(
            Callback::parse("show_booking:42").unwrap(),
            Callback::ShowBooking(42)
        );
    }

    #[test]
    fn parses_booking_actions() {
        assert_eq!(
            Callback::parse("confirm_42").unwrap(),
            Callback::Booking {
                action: BookingAction::Confirm,
                booking_id: 42
            }
        );
        assert_eq!(
            Callback::parse("change_item_9").unwrap(),
            Callback::Booking {
                action: BookingAction::ChangeItem,
                booking_id: 9
            }
        );
        assert_eq!(
            Callback::parse("change_to_9_3").unwrap(),
            Callback::ChangeTo {
                booking_id: 9,
                item_id: 3
            }
        );
    }

    #[test]
    fn rejects_garbage() {
        for data in [
            "",
            "select_item:",
            "select_item:abc",
            "items_page:-1",
            "frobnicate_3",
            "confirm_",
            "change_to_9",
            "unknown:1",
        ] {
            assert!(Callback::parse(data).is_err(), "{data} should not parse");
        }
    }

    #[test]
    fn encoded_form_parses_back() {
        let samples = [
            Callback::ItemsPage(3),
            Callback::Booking {
                action: BookingAction::Reschedule,
                booking_id: 1_000_000,
            },
            Callback::ChangeTo {
                booking_id: i64::MAX,
                item_id: i64::MAX,
            },
        ];
        for cb in samples {
            let encoded = cb.to_string();
            assert!(encoded.len() <= 64, "{encoded} exceeds the payload limit");
            assert_eq!(Callback::parse(&encoded).unwrap(), cb);
        }
    }

    #[test]
    fn actions_follow_the_lifecycle() {
        assert!(BookingAction::Confirm.applies_to(BookingStatus::Pending));
        assert!(!BookingAction::Confirm.applies_to(BookingStatus::Confirmed));
        assert!(BookingAction::Complete.applies_to(BookingStatus::Confirmed));
        assert!(BookingAction::Reopen.applies_to(BookingStatus::Confirmed));
        assert!(!BookingAction::Reject.applies_to(BookingStatus::Completed));
    }
}
