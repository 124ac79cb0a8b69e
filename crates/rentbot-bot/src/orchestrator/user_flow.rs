// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Steps open to every user: booking capture, schedules and own bookings.

use chrono::NaiveDate;
use tracing::info;

use rentbot_booking::helpers::{self, normalize_phone, paginate, parse_date, validate_name};
use rentbot_conversation::{ClientDraft, Conversation};
use rentbot_core::{BookingStatus, NewBooking, RentError};

use super::{Ctx, Orchestrator, SCHEDULE_DAYS};
use crate::callback::Callback;
use crate::keyboards::{self, ItemList};
use crate::texts;

impl Orchestrator {
    pub(super) async fn on_select_item(&self, ctx: &Ctx, item_id: i64) -> Result<(), RentError> {
        let item = self.active_item(item_id).await?;
        self.conversations
            .save(ctx.user_id(), &Conversation::WaitingDate { item_id })
            .await?;
        self.reply(
            ctx.chat_id,
            &texts::item_selected(&item),
            Some(keyboards::navigation()),
        )
        .await;
        Ok(())
    }

    pub(super) async fn on_booking_date(
        &self,
        ctx: &Ctx,
        item_id: i64,
        text: &str,
    ) -> Result<(), RentError> {
        let date = parse_date(text)?;
        self.bookings.validate_date(date)?;
        if !self.bookings.check_availability(item_id, date).await? {
            return Err(RentError::NotAvailable);
        }
        self.conversations
            .save(ctx.user_id(), &Conversation::EnterName { item_id, date })
            .await?;
        self.reply(ctx.chat_id, texts::ENTER_NAME, Some(keyboards::navigation()))
            .await;
        Ok(())
    }

    pub(super) async fn on_booking_name(
        &self,
        ctx: &Ctx,
        item_id: i64,
        date: NaiveDate,
        text: &str,
    ) -> Result<(), RentError> {
        let user_name = validate_name(text)?;
        let next = Conversation::PhoneNumber {
            item_id,
            date,
            user_name,
        };
        self.conversations.save(ctx.user_id(), &next).await?;
        self.reply(ctx.chat_id, texts::ENTER_PHONE, Some(keyboards::phone_request()))
            .await;
        Ok(())
    }

    /// Phone input for both the user and the manager flow, typed or shared
    /// as a contact.
    pub(super) async fn on_phone(
        &self,
        ctx: &Ctx,
        state: Conversation,
        raw: &str,
    ) -> Result<(), RentError> {
        let phone = normalize_phone(raw);
        if phone.is_empty() {
            self.reply(ctx.chat_id, texts::INVALID_PHONE, None).await;
            return Ok(());
        }

        match state {
            Conversation::PhoneNumber {
                item_id,
                date,
                user_name,
            } => {
                self.users.update_phone(ctx.user_id(), &phone).await?;
                let item = self.active_item(item_id).await?;
                let text = texts::confirm_request(&item, date, &user_name, &phone);
                let next = Conversation::Confirmation {
                    item_id,
                    date,
                    user_name,
                    phone,
                };
                self.conversations.save(ctx.user_id(), &next).await?;
                self.reply(ctx.chat_id, &text, Some(keyboards::confirmation()))
                    .await;
                Ok(())
            }
            Conversation::ManagerClientPhone { client_name } => {
                let next = Conversation::ManagerItemSelection {
                    client: ClientDraft {
                        client_name,
                        client_phone: phone,
                    },
                    page: 0,
                };
                self.conversations.save(ctx.user_id(), &next).await?;
                self.show_items(ctx, None, ItemList::Manager, 0).await
            }
            other => self.prompt(ctx, &other).await,
        }
    }

    pub(super) async fn submit_booking(
        &self,
        ctx: &Ctx,
        item_id: i64,
        date: NaiveDate,
        user_name: String,
        phone: String,
    ) -> Result<(), RentError> {
        let item = self.active_item(item_id).await?;
        let booking = self
            .bookings
            .create_booking(NewBooking {
                user_id: ctx.user_id(),
                user_name,
                username: ctx.sender.username.clone(),
                phone,
                item_id,
                item_name: item.name,
                date,
                status: BookingStatus::Pending,
                comment: None,
            })
            .await?;
        self.conversations.reset(ctx.user_id()).await?;
        info!(booking_id = booking.id, user_id = ctx.user_id(), "booking request submitted");
        let text = format!(
            "{}\n\n{}",
            texts::BOOKING_SUBMITTED,
            texts::booking_line(&booking)
        );
        self.reply(ctx.chat_id, &text, Some(keyboards::main_menu(ctx.is_manager)))
            .await;
        Ok(())
    }

    /// Occupancy of the item for the next two weeks.
    pub(super) async fn show_schedule(&self, ctx: &Ctx, item_id: i64) -> Result<(), RentError> {
        let item = self.active_item(item_id).await?;
        let days = self
            .bookings
            .item_schedule(item_id, self.bookings.today(), SCHEDULE_DAYS)
            .await?;
        self.conversations
            .save(ctx.user_id(), &Conversation::ViewSchedule { item_id })
            .await?;
        self.reply(
            ctx.chat_id,
            &texts::schedule(&item, &days),
            Some(keyboards::schedule()),
        )
        .await;
        Ok(())
    }

    pub(super) async fn on_specific_date(
        &self,
        ctx: &Ctx,
        item_id: i64,
        text: &str,
    ) -> Result<(), RentError> {
        let date = parse_date(text)?;
        let item = self.active_item(item_id).await?;
        let days = self.bookings.item_schedule(item_id, date, 1).await?;
        let Some(day) = days.first() else {
            return Err(RentError::Internal("empty schedule window".into()));
        };
        self.conversations
            .save(ctx.user_id(), &Conversation::ViewSchedule { item_id })
            .await?;
        self.reply(
            ctx.chat_id,
            &texts::day_availability(&item, day),
            Some(keyboards::schedule()),
        )
        .await;
        Ok(())
    }

    pub(super) async fn show_my_bookings(
        &self,
        ctx: &Ctx,
        message_id: Option<i32>,
        page: usize,
    ) -> Result<(), RentError> {
        let bookings = self.bookings.user_upcoming_bookings(ctx.user_id()).await?;
        if bookings.is_empty() {
            self.reply(ctx.chat_id, texts::NO_BOOKINGS, None).await;
            return Ok(());
        }
        let page = paginate(
            &bookings,
            page,
            self.settings.booking_page_size,
            helpers::DEFAULT_BOOKING_PAGE_SIZE,
        );
        let text = texts::booking_list("My bookings", page.items, page.page, page.total_pages);
        let rows = keyboards::bookings(&page, Callback::MyBookingsPage, false);
        if rows.is_empty() {
            self.reply(ctx.chat_id, &text, None).await;
        } else {
            self.show_inline(ctx.chat_id, message_id, &text, rows).await;
        }
        Ok(())
    }
}
