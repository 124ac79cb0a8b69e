// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manager-only steps: bookings on a client's behalf, booking actions,
//! exports and catalogue commands.

use chrono::NaiveDate;
use tracing::{info, warn};

use rentbot_booking::helpers::{self, date_range, paginate, parse_date, sanitize_input, validate_name};
use rentbot_booking::{ManagerBookingRequest, Move};
use rentbot_conversation::{ClientDraft, Conversation, DateType};
use rentbot_core::chat::{Markup, OutboundMessage};
use rentbot_core::{Booking, BookingStatus, RentError};

use super::{Ctx, Orchestrator};
use crate::callback::{BookingAction, Callback};
use crate::command::Command;
use crate::keyboards::{self, ItemList};
use crate::texts;

/// A button from an earlier step of a flow that has since moved on.
fn stale() -> RentError {
    RentError::Validation("this button has expired, start again from the menu".into())
}

impl Orchestrator {
    pub(super) async fn start_manager_booking(&self, ctx: &Ctx) -> Result<(), RentError> {
        let next = Conversation::ManagerClientName;
        self.conversations.save(ctx.user_id(), &next).await?;
        self.prompt(ctx, &next).await
    }

    pub(super) async fn on_client_name(&self, ctx: &Ctx, text: &str) -> Result<(), RentError> {
        let client_name = validate_name(text)?;
        let next = Conversation::ManagerClientPhone { client_name };
        self.conversations.save(ctx.user_id(), &next).await?;
        self.prompt(ctx, &next).await
    }

    pub(super) async fn on_manager_items_page(
        &self,
        ctx: &Ctx,
        message_id: Option<i32>,
        page: usize,
    ) -> Result<(), RentError> {
        match self.conversations.load(ctx.user_id()).await? {
            Conversation::ManagerItemSelection { .. } => {
                self.show_items(ctx, message_id, ItemList::Manager, page)
                    .await
            }
            _ => Err(stale()),
        }
    }

    pub(super) async fn on_manager_select_item(
        &self,
        ctx: &Ctx,
        item_id: i64,
    ) -> Result<(), RentError> {
        let Conversation::ManagerItemSelection { client, .. } =
            self.conversations.load(ctx.user_id()).await?
        else {
            return Err(stale());
        };
        self.active_item(item_id).await?;
        let next = Conversation::ManagerDateType { client, item_id };
        self.conversations.save(ctx.user_id(), &next).await?;
        self.prompt(ctx, &next).await
    }

    pub(super) async fn on_date_type(&self, ctx: &Ctx, range: bool) -> Result<(), RentError> {
        let Conversation::ManagerDateType { client, item_id } =
            self.conversations.load(ctx.user_id()).await?
        else {
            return Err(stale());
        };
        let next = if range {
            Conversation::ManagerStartDate { client, item_id }
        } else {
            Conversation::ManagerSingleDate { client, item_id }
        };
        self.conversations.save(ctx.user_id(), &next).await?;
        self.prompt(ctx, &next).await
    }

    pub(super) async fn on_single_date(
        &self,
        ctx: &Ctx,
        client: ClientDraft,
        item_id: i64,
        text: &str,
    ) -> Result<(), RentError> {
        let date = parse_date(text)?;
        self.bookings.validate_date(date)?;
        self.ask_comment(ctx, client, item_id, DateType::Single, vec![date])
            .await
    }

    pub(super) async fn on_start_date(
        &self,
        ctx: &Ctx,
        client: ClientDraft,
        item_id: i64,
        text: &str,
    ) -> Result<(), RentError> {
        let start_date = parse_date(text)?;
        self.bookings.validate_date(start_date)?;
        let next = Conversation::ManagerEndDate {
            client,
            item_id,
            start_date,
        };
        self.conversations.save(ctx.user_id(), &next).await?;
        self.prompt(ctx, &next).await
    }

    pub(super) async fn on_end_date(
        &self,
        ctx: &Ctx,
        client: ClientDraft,
        item_id: i64,
        start_date: NaiveDate,
        text: &str,
    ) -> Result<(), RentError> {
        let end_date = parse_date(text)?;
        let dates = date_range(start_date, end_date)?;
        self.ask_comment(ctx, client, item_id, DateType::Range, dates)
            .await
    }

    async fn ask_comment(
        &self,
        ctx: &Ctx,
        client: ClientDraft,
        item_id: i64,
        date_type: DateType,
        dates: Vec<NaiveDate>,
    ) -> Result<(), RentError> {
        let next = Conversation::ManagerComment {
            client,
            item_id,
            date_type,
            dates,
        };
        self.conversations.save(ctx.user_id(), &next).await?;
        self.prompt(ctx, &next).await
    }

    pub(super) async fn on_comment(
        &self,
        ctx: &Ctx,
        client: ClientDraft,
        item_id: i64,
        date_type: DateType,
        dates: Vec<NaiveDate>,
        text: &str,
    ) -> Result<(), RentError> {
        let comment = if text == texts::BTN_SKIP {
            None
        } else {
            Some(sanitize_input(text)).filter(|c| !c.is_empty())
        };
        let next = Conversation::ManagerConfirm {
            client,
            item_id,
            date_type,
            dates,
            comment,
        };
        self.conversations.save(ctx.user_id(), &next).await?;
        self.prompt(ctx, &next).await
    }

    pub(super) async fn submit_manager_booking(
        &self,
        ctx: &Ctx,
        client: ClientDraft,
        item_id: i64,
        dates: Vec<NaiveDate>,
        comment: Option<String>,
    ) -> Result<(), RentError> {
        let request = ManagerBookingRequest {
            manager_id: ctx.user_id(),
            client_name: client.client_name,
            client_phone: client.client_phone,
            item_id,
            comment,
        };
        let outcome = self
            .bookings
            .create_manager_bookings(&request, &dates)
            .await?;
        self.conversations.reset(ctx.user_id()).await?;
        info!(
            manager_id = ctx.user_id(),
            created = outcome.created.len(),
            failed = outcome.failed.len(),
            "manager bookings submitted"
        );
        self.reply(
            ctx.chat_id,
            &texts::manager_batch_result(&outcome.created, &outcome.failed),
            Some(keyboards::main_menu(true)),
        )
        .await;
        Ok(())
    }

    /// Applies a lifecycle action pressed on a booking card.
    ///
    /// The booking is re-read so the action carries the version current at
    /// press time; a concurrent change between the read and the write
    /// surfaces as a concurrent-modification reply.
    pub(super) async fn on_booking_action(
        &self,
        ctx: &Ctx,
        message_id: Option<i32>,
        action: BookingAction,
        booking_id: i64,
    ) -> Result<(), RentError> {
        let booking = self.bookings.get_booking(booking_id).await?;
        let (id, version, actor) = (booking.id, booking.version, ctx.user_id());

        let updated = match action {
            BookingAction::ChangeItem => {
                return self.show_change_targets(ctx, message_id, &booking).await;
            }
            BookingAction::Confirm => self.bookings.confirm_booking(id, version, actor).await?,
            BookingAction::Reject => self.bookings.reject_booking(id, version, actor).await?,
            BookingAction::Complete => self.bookings.complete_booking(id, version, actor).await?,
            BookingAction::Reopen => self.bookings.reopen_booking(id, version, actor).await?,
            BookingAction::Reschedule => {
                self.bookings.reschedule_booking(id, version, actor).await?
            }
        };
        info!(booking_id, action = %action, manager_id = actor, status = %updated.status, "booking action applied");

        // Reopen and reschedule publish no event, so the owner is told here.
        if matches!(action, BookingAction::Reopen | BookingAction::Reschedule) {
            self.notify_owner(&updated, actor).await;
        }
        self.show_inline(
            ctx.chat_id,
            message_id,
            &texts::action_done(&updated),
            keyboards::booking_actions(&updated),
        )
        .await;
        Ok(())
    }

    async fn show_change_targets(
        &self,
        ctx: &Ctx,
        message_id: Option<i32>,
        booking: &Booking,
    ) -> Result<(), RentError> {
        if !booking.status.can_transition_to(BookingStatus::Changed) {
            return Err(RentError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Changed,
            });
        }
        let mut candidates = Vec::new();
        for item in self.items.list_items().await? {
            if item.id == booking.item_id {
                continue;
            }
            if self
                .bookings
                .check_availability(item.id, booking.date)
                .await?
            {
                candidates.push(item);
            }
        }
        if candidates.is_empty() {
            self.reply(ctx.chat_id, texts::NO_OTHER_ITEMS, None).await;
            return Ok(());
        }
        let text = format!("{}\n\n{}", texts::booking_card(booking), texts::CHOOSE_NEW_ITEM);
        self.show_inline(
            ctx.chat_id,
            message_id,
            &text,
            keyboards::change_targets(booking, &candidates),
        )
        .await;
        Ok(())
    }

    pub(super) async fn on_change_to(
        &self,
        ctx: &Ctx,
        message_id: Option<i32>,
        booking_id: i64,
        item_id: i64,
    ) -> Result<(), RentError> {
        let booking = self.bookings.get_booking(booking_id).await?;
        let updated = self
            .bookings
            .change_item(booking.id, booking.version, item_id, ctx.user_id())
            .await?;
        info!(booking_id, from = booking.item_id, to = item_id, "booking moved to another item");
        self.show_inline(
            ctx.chat_id,
            message_id,
            &texts::action_done(&updated),
            keyboards::booking_actions(&updated),
        )
        .await;
        Ok(())
    }

    async fn notify_owner(&self, booking: &Booking, actor: i64) {
        if booking.user_id == actor {
            return;
        }
        let msg = OutboundMessage::text(booking.user_id, texts::owner_update(booking));
        if let Err(e) = self.channel.send(msg).await {
            warn!(booking_id = booking.id, user_id = booking.user_id, error = %e, "owner notification failed");
        }
    }

    pub(super) async fn show_booking(&self, ctx: &Ctx, booking_id: i64) -> Result<(), RentError> {
        let booking = self.bookings.get_booking(booking_id).await?;
        self.reply(
            ctx.chat_id,
            &texts::booking_card(&booking),
            Some(Markup::Inline(keyboards::booking_actions(&booking))),
        )
        .await;
        Ok(())
    }

    pub(super) async fn show_client_contact(
        &self,
        ctx: &Ctx,
        booking_id: i64,
    ) -> Result<(), RentError> {
        let booking = self.bookings.get_booking(booking_id).await?;
        self.reply(ctx.chat_id, &texts::client_contact(&booking), None)
            .await;
        Ok(())
    }

    pub(super) async fn show_pending(
        &self,
        ctx: &Ctx,
        message_id: Option<i32>,
        page: usize,
    ) -> Result<(), RentError> {
        let mut pending = self.bookings.bookings_by_status(BookingStatus::Pending).await?;
        if pending.is_empty() {
            self.reply(ctx.chat_id, texts::NO_PENDING, None).await;
            return Ok(());
        }
        pending.sort_by_key(|b| (b.date, b.id));
        let page = paginate(
            &pending,
            page,
            self.settings.booking_page_size,
            helpers::DEFAULT_BOOKING_PAGE_SIZE,
        );
        let text = texts::booking_list("Pending bookings", page.items, page.page, page.total_pages);
        let rows = keyboards::bookings(&page, Callback::PendingPage, true);
        self.show_inline(ctx.chat_id, message_id, &text, rows).await;
        Ok(())
    }

    pub(super) async fn show_stats(&self, ctx: &Ctx) -> Result<(), RentError> {
        let stats = self.bookings.stats().await?;
        self.reply(
            ctx.chat_id,
            &texts::stats(&stats),
            Some(Markup::Inline(keyboards::stats())),
        )
        .await;
        Ok(())
    }

    pub(super) async fn export_bookings(&self, ctx: &Ctx) -> Result<(), RentError> {
        let bookings = self.bookings.all_bookings().await?;
        let path = match self
            .exporter
            .export_bookings(&bookings, self.clock.now())
            .await
        {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "bookings export failed");
                self.reply(ctx.chat_id, texts::EXPORT_FAILED, None).await;
                return Ok(());
            }
        };
        self.send_export(ctx, &path, &texts::export_caption("Bookings", bookings.len()))
            .await
    }

    pub(super) async fn export_users(&self, ctx: &Ctx) -> Result<(), RentError> {
        let users = self.users.all_users().await?;
        let path = match self.exporter.export_users(&users, self.clock.now()).await {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "users export failed");
                self.reply(ctx.chat_id, texts::EXPORT_FAILED, None).await;
                return Ok(());
            }
        };
        self.send_export(ctx, &path, &texts::export_caption("Users", users.len()))
            .await
    }

    async fn send_export(
        &self,
        ctx: &Ctx,
        path: &std::path::Path,
        caption: &str,
    ) -> Result<(), RentError> {
        if let Err(e) = self
            .channel
            .send_document(ctx.chat_id, path, Some(caption))
            .await
        {
            warn!(path = %path.display(), error = %e, "failed to upload export");
            self.reply(ctx.chat_id, texts::EXPORT_FAILED, None).await;
        }
        Ok(())
    }

    /// Catalogue commands.
    pub(super) async fn run_item_command(
        &self,
        ctx: &Ctx,
        command: Command,
    ) -> Result<(), RentError> {
        let text = match command {
            Command::AddItem { name, quantity } => {
                texts::item_created(&self.items.create_item(&name, quantity).await?)
            }
            Command::EditItem { name, quantity } => {
                texts::item_updated(&self.items.update_quantity(&name, quantity).await?)
            }
            Command::DisableItem { name } => {
                texts::item_disabled(&self.items.deactivate_item(&name).await?)
            }
            Command::SetItemOrder { name, order } => {
                texts::item_reordered(&self.items.reorder_item(&name, order).await?)
            }
            Command::MoveItemUp { name } => {
                texts::item_reordered(&self.items.move_item(&name, Move::Up).await?)
            }
            Command::MoveItemDown { name } => {
                texts::item_reordered(&self.items.move_item(&name, Move::Down).await?)
            }
            Command::ListItems => texts::item_list(&self.items.list_items().await?),
            other => {
                return Err(RentError::Internal(format!(
                    "{other:?} is not a catalogue command"
                )));
            }
        };
        self.reply(ctx.chat_id, &text, None).await;
        Ok(())
    }
}
