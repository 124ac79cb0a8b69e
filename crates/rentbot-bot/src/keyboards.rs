// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyboard layouts.

use rentbot_booking::helpers::{Page, format_date};
use rentbot_core::chat::{InlineButton, Markup, ReplyButton};
use rentbot_core::{Booking, Item};

use crate::callback::{BookingAction, Callback};
use crate::texts;

/// Which flow an item list belongs to; decides the callbacks it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemList {
    Booking,
    Schedule,
    Manager,
}

impl ItemList {
    fn select(self, item_id: i64) -> Callback {
        match self {
            ItemList::Booking => Callback::SelectItem(item_id),
            ItemList::Schedule => Callback::ScheduleSelectItem(item_id),
            ItemList::Manager => Callback::ManagerSelectItem(item_id),
        }
    }

    fn page(self, page: usize) -> Callback {
        match self {
            ItemList::Booking => Callback::ItemsPage(page),
            ItemList::Schedule => Callback::ScheduleItemsPage(page),
            ItemList::Manager => Callback::ManagerItemsPage(page),
        }
    }

    fn back(self) -> Callback {
        match self {
            ItemList::Schedule => Callback::BackToMainFromSchedule,
            ItemList::Booking | ItemList::Manager => Callback::BackToMain,
        }
    }
}

fn button(text: &str, callback: Callback) -> InlineButton {
    InlineButton::new(text, callback.to_string())
}

fn reply_rows(rows: &[&[&str]]) -> Markup {
    Markup::Reply(
        rows.iter()
            .map(|row| row.iter().map(|label| ReplyButton::text(*label)).collect())
            .collect(),
    )
}

pub fn main_menu(is_manager: bool) -> Markup {
    if is_manager {
        reply_rows(&[
            &[texts::BTN_PENDING, texts::BTN_NEW_BOOKING],
            &[texts::BTN_SCHEDULE, texts::BTN_STATS],
            &[texts::BTN_BOOK, texts::BTN_CONTACTS],
        ])
    } else {
        reply_rows(&[
            &[texts::BTN_BOOK],
            &[texts::BTN_MY_BOOKINGS, texts::BTN_SCHEDULE],
            &[texts::BTN_CONTACTS],
        ])
    }
}

/// Back and cancel, shown while free text is expected.
pub fn navigation() -> Markup {
    reply_rows(&[&[texts::BTN_BACK, texts::BTN_CANCEL]])
}

pub fn phone_request() -> Markup {
    Markup::Reply(vec![
        vec![ReplyButton::contact(texts::BTN_SHARE_PHONE)],
        vec![
            ReplyButton::text(texts::BTN_BACK),
            ReplyButton::text(texts::BTN_CANCEL),
        ],
    ])
}

pub fn confirmation() -> Markup {
    reply_rows(&[&[texts::BTN_CONFIRM], &[texts::BTN_BACK, texts::BTN_CANCEL]])
}

pub fn comment() -> Markup {
    reply_rows(&[&[texts::BTN_SKIP], &[texts::BTN_BACK, texts::BTN_CANCEL]])
}

pub fn schedule() -> Markup {
    reply_rows(&[&[texts::BTN_CHECK_DATE], &[texts::BTN_BACK, texts::BTN_CANCEL]])
}

/// One page of items with paging and a way back to the menu.
pub fn items(page: &Page<'_, Item>, list: ItemList) -> Vec<Vec<InlineButton>> {
    let mut rows: Vec<Vec<InlineButton>> = page
        .items
        .iter()
        .map(|item| vec![button(&item.name, list.select(item.id))])
        .collect();

    let mut paging = Vec::new();
    if page.has_prev() {
        paging.push(button(texts::BTN_PREV, list.page(page.page - 1)));
    }
    if page.has_next() {
        paging.push(button(texts::BTN_NEXT, list.page(page.page + 1)));
    }
    if !paging.is_empty() {
        rows.push(paging);
    }
    rows.push(vec![button(texts::BTN_MAIN_MENU, list.back())]);
    rows
}

pub fn date_type() -> Vec<Vec<InlineButton>> {
    vec![
        vec![
            button(texts::BTN_SINGLE_DATE, Callback::ManagerSingleDate),
            button(texts::BTN_DATE_RANGE, Callback::ManagerDateRange),
        ],
        vec![button(texts::BTN_MAIN_MENU, Callback::BackToMain)],
    ]
}

fn action_label(action: BookingAction) -> &'static str {
    match action {
        BookingAction::Confirm => "✅ Confirm",
        BookingAction::Reject => "❌ Reject",
        BookingAction::Reschedule => "📆 Reschedule",
        BookingAction::Reopen => "↩️ Reopen",
        BookingAction::Complete => "🏁 Complete",
        BookingAction::ChangeItem => "🔄 Change item",
    }
}

/// The manager buttons valid for the booking's current status.
pub fn booking_actions(booking: &Booking) -> Vec<Vec<InlineButton>> {
    let actions: Vec<InlineButton> = BookingAction::ALL
        .into_iter()
        .filter(|action| action.applies_to(booking.status))
        .map(|action| {
            button(
                action_label(action),
                Callback::Booking {
                    action,
                    booking_id: booking.id,
                },
            )
        })
        .collect();

    let mut rows: Vec<Vec<InlineButton>> = actions.chunks(2).map(<[_]>::to_vec).collect();
    rows.push(vec![button(texts::BTN_CALL, Callback::CallBooking(booking.id))]);
    rows
}

/// Replacement items for a change-item action.
pub fn change_targets(booking: &Booking, candidates: &[Item]) -> Vec<Vec<InlineButton>> {
    let mut rows: Vec<Vec<InlineButton>> = candidates
        .iter()
        .filter(|item| item.id != booking.item_id)
        .map(|item| {
            vec![button(
                &item.name,
                Callback::ChangeTo {
                    booking_id: booking.id,
                    item_id: item.id,
                },
            )]
        })
        .collect();
    rows.push(vec![button("⬅️ Back", Callback::ShowBooking(booking.id))]);
    rows
}

/// Bookings of one page as buttons opening their cards.
pub fn bookings(
    page: &Page<'_, Booking>,
    page_callback: fn(usize) -> Callback,
    openable: bool,
) -> Vec<Vec<InlineButton>> {
    let mut rows: Vec<Vec<InlineButton>> = if openable {
        page.items
            .iter()
            .map(|b| {
                vec![button(
                    &format!("#{} {} {}", b.id, format_date(b.date), b.item_name),
                    Callback::ShowBooking(b.id),
                )]
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut paging = Vec::new();
    if page.has_prev() {
        paging.push(button(texts::BTN_PREV, page_callback(page.page - 1)));
    }
    if page.has_next() {
        paging.push(button(texts::BTN_NEXT, page_callback(page.page + 1)));
    }
    if !paging.is_empty() {
        rows.push(paging);
    }
    rows
}

pub fn stats() -> Vec<Vec<InlineButton>> {
    vec![vec![button(texts::BTN_EXPORT_USERS, Callback::ExportUsers)]]
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rentbot_booking::helpers::paginate;
    use rentbot_core::BookingStatus;

    use super::*;

    fn item(id: i64) -> Item {
        let now = Utc::now();
        Item {
            id,
            name: format!("Item {id}"),
            description: None,
            total_quantity: 1,
            sort_order: id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn booking(status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: 5,
            user_id: 1,
            user_name: "Ivan".into(),
            username: None,
            phone: "79991234567".into(),
            item_id: 2,
            item_name: "Item 2".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            status,
            comment: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn data(rows: Vec<Vec<InlineButton>>) -> Vec<String> {
        rows.into_iter()
            .flatten()
            .map(|b| b.callback_data)
            .collect()
    }

    #[test]
    fn middle_item_page_links_both_ways() {
        let all: Vec<Item> = (1..=20).map(item).collect();
        let page = paginate(&all, 1, 8, 8);
        let callbacks = data(items(&page, ItemList::Booking));
        assert_eq!(callbacks[0], "select_item:9");
        assert!(callbacks.contains(&"items_page:0".to_string()));
        assert!(callbacks.contains(&"items_page:2".to_string()));
        assert_eq!(callbacks.last().unwrap(), "back_to_main");
    }

    #[test]
    fn schedule_list_returns_through_its_own_tag() {
        let all: Vec<Item> = (1..=2).map(item).collect();
        let page = paginate(&all, 0, 8, 8);
        let callbacks = data(items(&page, ItemList::Schedule));
        assert_eq!(
            callbacks,
            vec![
                "schedule_select_item:1",
                "schedule_select_item:2",
                "back_to_main_from_schedule"
            ]
        );
    }

    #[test]
    fn pending_booking_offers_review_actions() {
        let callbacks = data(booking_actions(&booking(BookingStatus::Pending)));
        assert_eq!(
            callbacks,
            vec![
                "confirm_5",
                "reject_5",
                "reschedule_5",
                "change_item_5",
                "call_booking:5"
            ]
        );
    }

    #[test]
    fn terminal_booking_only_offers_contact() {
        let callbacks = data(booking_actions(&booking(BookingStatus::Completed)));
        assert_eq!(callbacks, vec!["call_booking:5"]);
    }

    #[test]
    fn change_targets_skip_current_item() {
        let candidates: Vec<Item> = (1..=3).map(item).collect();
        let callbacks = data(change_targets(&booking(BookingStatus::Pending), &candidates));
        assert_eq!(
            callbacks,
            vec!["change_to_5_1", "change_to_5_3", "show_booking:5"]
        );
    }
}
