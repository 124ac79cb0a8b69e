// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binds chat updates to the conversation state machine and the services.
//!
//! Each update is classified once: blacklisted senders are dropped, the
//! rate limit is applied, the profile is refreshed, and then the update is
//! dispatched by command, menu button, callback tag, or current step.
//! Domain errors become short replies; infrastructure errors are replied to
//! generically and returned to the caller for logging.

mod manager_flow;
mod user_flow;

use std::sync::Arc;

use tracing::{debug, warn};

use rentbot_booking::helpers::paginate;
use rentbot_booking::{BookingService, ItemService, UserService};
use rentbot_config::RentbotConfig;
use rentbot_conversation::{Conversation, ConversationManager};
use rentbot_core::chat::{EditMessage, InboundUpdate, InlineButton, Markup, OutboundMessage, Sender};
use rentbot_core::{ChatChannel, Clock, Item, RentError};

use crate::callback::Callback;
use crate::command::Command;
use crate::export::CsvExporter;
use crate::keyboards::{self, ItemList};
use crate::texts;

/// Days shown when an item's schedule is opened.
pub const SCHEDULE_DAYS: u32 = 14;

/// Presentation settings of the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub item_page_size: usize,
    pub booking_page_size: usize,
    pub contacts: Vec<String>,
}

impl OrchestratorSettings {
    pub fn from_config(config: &RentbotConfig) -> Self {
        Self {
            item_page_size: config.bot.pagination_size,
            booking_page_size: config.bot.booking_pagination_size,
            contacts: config.managers_contacts.clone(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&RentbotConfig::default())
    }
}

/// The sender of the update being handled.
struct Ctx {
    chat_id: i64,
    sender: Sender,
    is_manager: bool,
}

impl Ctx {
    fn user_id(&self) -> i64 {
        self.sender.id
    }
}

/// Reply-keyboard buttons that work from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Book,
    MyBookings,
    Schedule,
    Contacts,
    Pending,
    NewBooking,
    Stats,
}

impl MenuAction {
    fn from_label(text: &str) -> Option<MenuAction> {
        Some(match text {
            texts::BTN_BOOK => MenuAction::Book,
            texts::BTN_MY_BOOKINGS => MenuAction::MyBookings,
            texts::BTN_SCHEDULE => MenuAction::Schedule,
            texts::BTN_CONTACTS => MenuAction::Contacts,
            texts::BTN_PENDING => MenuAction::Pending,
            texts::BTN_NEW_BOOKING => MenuAction::NewBooking,
            texts::BTN_STATS => MenuAction::Stats,
            _ => return None,
        })
    }

    fn requires_manager(self) -> bool {
        matches!(
            self,
            MenuAction::Pending | MenuAction::NewBooking | MenuAction::Stats
        )
    }
}

pub struct Orchestrator {
    channel: Arc<dyn ChatChannel>,
    bookings: Arc<BookingService>,
    users: Arc<UserService>,
    items: Arc<ItemService>,
    conversations: Arc<ConversationManager>,
    exporter: CsvExporter,
    clock: Arc<dyn Clock>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel: Arc<dyn ChatChannel>,
        bookings: Arc<BookingService>,
        users: Arc<UserService>,
        items: Arc<ItemService>,
        conversations: Arc<ConversationManager>,
        exporter: CsvExporter,
        clock: Arc<dyn Clock>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            channel,
            bookings,
            users,
            items,
            conversations,
            exporter,
            clock,
            settings,
        }
    }

    pub fn channel(&self) -> &Arc<dyn ChatChannel> {
        &self.channel
    }

    /// Handles one update end to end.
    pub async fn handle(&self, update: InboundUpdate) -> Result<(), RentError> {
        let sender = update.sender().clone();
        if self.users.is_blacklisted(sender.id) {
            debug!(user_id = sender.id, "dropping update from blacklisted user");
            return Ok(());
        }

        let is_manager = self.users.is_manager(sender.id);
        if !self.conversations.allow(sender.id, is_manager).await? {
            rentbot_prometheus::record_rate_limited();
            debug!(user_id = sender.id, "rate limited");
            match &update {
                InboundUpdate::Callback { callback_id, .. } => {
                    self.answer(callback_id, Some(texts::RATE_LIMITED)).await
                }
                InboundUpdate::Message { chat_id, .. } => {
                    self.reply(*chat_id, texts::RATE_LIMITED, None).await
                }
            }
            return Ok(());
        }

        self.users.save_user(&sender).await?;
        self.users.touch_activity(sender.id).await?;

        let ctx = Ctx {
            chat_id: update.chat_id(),
            sender,
            is_manager,
        };
        let result = match update {
            InboundUpdate::Message {
                text,
                contact_phone,
                ..
            } => {
                self.on_message(&ctx, text.as_deref(), contact_phone.as_deref())
                    .await
            }
            InboundUpdate::Callback {
                callback_id,
                message_id,
                data,
                ..
            } => {
                let result = self.on_callback(&ctx, message_id, &data).await;
                let toast = match &result {
                    Err(RentError::Validation(msg)) if msg == texts::MANAGERS_ONLY => {
                        Some(texts::MANAGERS_ONLY)
                    }
                    _ => None,
                };
                self.answer(&callback_id, toast).await;
                result
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => self.on_error(&ctx, e).await,
        }
    }

    async fn on_error(&self, ctx: &Ctx, err: RentError) -> Result<(), RentError> {
        if !err.is_domain() {
            self.reply(ctx.chat_id, &texts::error_reply(&err), None).await;
            return Err(err);
        }
        debug!(user_id = ctx.user_id(), error = %err, "request rejected");
        match err {
            RentError::NotAvailable | RentError::PastDate | RentError::NotFound { .. } => {
                self.conversations.reset(ctx.user_id()).await?;
                self.reply(
                    ctx.chat_id,
                    &texts::error_reply(&err),
                    Some(keyboards::main_menu(ctx.is_manager)),
                )
                .await;
            }
            _ => self.reply(ctx.chat_id, &texts::error_reply(&err), None).await,
        }
        Ok(())
    }

    async fn on_message(
        &self,
        ctx: &Ctx,
        text: Option<&str>,
        contact_phone: Option<&str>,
    ) -> Result<(), RentError> {
        if let Some(command) = text.and_then(Command::parse) {
            let command = command?;
            if command.requires_manager() && !ctx.is_manager {
                self.reply(ctx.chat_id, texts::MANAGERS_ONLY, None).await;
                return Ok(());
            }
            return self.run_command(ctx, command).await;
        }

        let text = text.map(str::trim);
        match text {
            Some(texts::BTN_CANCEL) => return self.show_main_menu(ctx).await,
            Some(texts::BTN_BACK) => {
                let previous = self.conversations.back(ctx.user_id()).await?;
                return self.prompt(ctx, &previous).await;
            }
            _ => {}
        }
        if let Some(action) = text.and_then(MenuAction::from_label) {
            if action.requires_manager() && !ctx.is_manager {
                self.reply(ctx.chat_id, texts::MANAGERS_ONLY, None).await;
                return Ok(());
            }
            self.conversations.reset(ctx.user_id()).await?;
            return self.run_menu(ctx, action).await;
        }

        let state = self.conversations.load(ctx.user_id()).await?;
        if matches!(
            state,
            Conversation::PhoneNumber { .. } | Conversation::ManagerClientPhone { .. }
        ) {
            return match contact_phone.or(text) {
                Some(raw) => self.on_phone(ctx, state, raw).await,
                None => Ok(()),
            };
        }
        match text {
            Some(text) => self.on_text(ctx, state, text).await,
            None => Ok(()),
        }
    }

    /// Free text for the current step.
    async fn on_text(&self, ctx: &Ctx, state: Conversation, text: &str) -> Result<(), RentError> {
        match state {
            Conversation::WaitingDate { item_id } => self.on_booking_date(ctx, item_id, text).await,
            Conversation::EnterName { item_id, date } => {
                self.on_booking_name(ctx, item_id, date, text).await
            }
            Conversation::Confirmation {
                item_id,
                date,
                user_name,
                phone,
            } if text == texts::BTN_CONFIRM => {
                self.submit_booking(ctx, item_id, date, user_name, phone)
                    .await
            }
            Conversation::ManagerClientName => self.on_client_name(ctx, text).await,
            Conversation::ManagerSingleDate { client, item_id } => {
                self.on_single_date(ctx, client, item_id, text).await
            }
            Conversation::ManagerStartDate { client, item_id } => {
                self.on_start_date(ctx, client, item_id, text).await
            }
            Conversation::ManagerEndDate {
                client,
                item_id,
                start_date,
            } => self.on_end_date(ctx, client, item_id, start_date, text).await,
            Conversation::ManagerComment {
                client,
                item_id,
                date_type,
                dates,
            } => {
                self.on_comment(ctx, client, item_id, date_type, dates, text)
                    .await
            }
            Conversation::ManagerConfirm {
                client,
                item_id,
                dates,
                comment,
                ..
            } if text == texts::BTN_CONFIRM => {
                self.submit_manager_booking(ctx, client, item_id, dates, comment)
                    .await
            }
            Conversation::ViewSchedule { item_id } if text == texts::BTN_CHECK_DATE => {
                let next = Conversation::WaitingSpecificDate { item_id };
                self.conversations.save(ctx.user_id(), &next).await?;
                self.prompt(ctx, &next).await
            }
            Conversation::WaitingSpecificDate { item_id } => {
                self.on_specific_date(ctx, item_id, text).await
            }
            Conversation::MainMenu => {
                self.reply(
                    ctx.chat_id,
                    texts::UNKNOWN_INPUT,
                    Some(keyboards::main_menu(ctx.is_manager)),
                )
                .await;
                Ok(())
            }
            // Steps waiting for a button press: show the step again.
            other => self.prompt(ctx, &other).await,
        }
    }

    async fn on_callback(
        &self,
        ctx: &Ctx,
        message_id: Option<i32>,
        data: &str,
    ) -> Result<(), RentError> {
        let callback = Callback::parse(data)?;
        debug!(user_id = ctx.user_id(), callback = %callback, "callback");
        if requires_manager(&callback) && !ctx.is_manager {
            return Err(RentError::Validation(texts::MANAGERS_ONLY.into()));
        }

        match callback {
            Callback::BackToMain | Callback::BackToMainFromSchedule => {
                self.show_main_menu(ctx).await
            }
            Callback::ItemsPage(page) => {
                self.show_items(ctx, message_id, ItemList::Booking, page)
                    .await
            }
            Callback::SelectItem(item_id) => self.on_select_item(ctx, item_id).await,
            Callback::ScheduleItemsPage(page) => {
                self.show_items(ctx, message_id, ItemList::Schedule, page)
                    .await
            }
            Callback::ScheduleSelectItem(item_id) => self.show_schedule(ctx, item_id).await,
            Callback::ManagerItemsPage(page) => {
                self.on_manager_items_page(ctx, message_id, page).await
            }
            Callback::ManagerSelectItem(item_id) => {
                self.on_manager_select_item(ctx, item_id).await
            }
            Callback::ManagerSingleDate | Callback::ManagerDateRange => {
                self.on_date_type(ctx, callback == Callback::ManagerDateRange)
                    .await
            }
            Callback::Booking { action, booking_id } => {
                self.on_booking_action(ctx, message_id, action, booking_id)
                    .await
            }
            Callback::ChangeTo {
                booking_id,
                item_id,
            } => {
                self.on_change_to(ctx, message_id, booking_id, item_id)
                    .await
            }
            Callback::CallBooking(booking_id) => self.show_client_contact(ctx, booking_id).await,
            Callback::ShowBooking(booking_id) => self.show_booking(ctx, booking_id).await,
            Callback::ExportUsers => self.export_users(ctx).await,
            Callback::PendingPage(page) => self.show_pending(ctx, message_id, page).await,
            Callback::MyBookingsPage(page) => {
                self.show_my_bookings(ctx, message_id, page).await
            }
        }
    }

    async fn run_menu(&self, ctx: &Ctx, action: MenuAction) -> Result<(), RentError> {
        match action {
            MenuAction::Book => self.show_items(ctx, None, ItemList::Booking, 0).await,
            MenuAction::Schedule => self.show_items(ctx, None, ItemList::Schedule, 0).await,
            MenuAction::MyBookings => self.show_my_bookings(ctx, None, 0).await,
            MenuAction::Contacts => {
                self.reply(ctx.chat_id, &texts::contacts(&self.settings.contacts), None)
                    .await;
                Ok(())
            }
            MenuAction::Pending => self.show_pending(ctx, None, 0).await,
            MenuAction::NewBooking => self.start_manager_booking(ctx).await,
            MenuAction::Stats => self.show_stats(ctx).await,
        }
    }

    async fn run_command(&self, ctx: &Ctx, command: Command) -> Result<(), RentError> {
        match command {
            Command::Start => {
                self.conversations.reset(ctx.user_id()).await?;
                self.reply(
                    ctx.chat_id,
                    &texts::welcome(&ctx.sender.first_name, ctx.is_manager),
                    Some(keyboards::main_menu(ctx.is_manager)),
                )
                .await;
                Ok(())
            }
            Command::StartBooking => self.start_manager_booking(ctx).await,
            Command::ManagerBooking(booking_id) => self.show_booking(ctx, booking_id).await,
            Command::GetAll => self.export_bookings(ctx).await,
            Command::Stats => self.show_stats(ctx).await,
            other => self.run_item_command(ctx, other).await,
        }
    }

    /// Shows the prompt of `state` again, e.g. after stepping back.
    async fn prompt(&self, ctx: &Ctx, state: &Conversation) -> Result<(), RentError> {
        let chat = ctx.chat_id;
        match state {
            Conversation::MainMenu => {
                self.reply(chat, texts::MAIN_MENU, Some(keyboards::main_menu(ctx.is_manager)))
                    .await
            }
            Conversation::SelectItem { page } => {
                return self.show_items(ctx, None, ItemList::Booking, *page).await;
            }
            Conversation::ScheduleSelectItem { page } => {
                return self.show_items(ctx, None, ItemList::Schedule, *page).await;
            }
            Conversation::ManagerItemSelection { page, .. } => {
                return self.show_items(ctx, None, ItemList::Manager, *page).await;
            }
            Conversation::WaitingDate { item_id } => {
                let item = self.active_item(*item_id).await?;
                self.reply(chat, &texts::item_selected(&item), Some(keyboards::navigation()))
                    .await
            }
            Conversation::EnterName { .. } => {
                self.reply(chat, texts::ENTER_NAME, Some(keyboards::navigation()))
                    .await
            }
            Conversation::PhoneNumber { .. } => {
                self.reply(chat, texts::ENTER_PHONE, Some(keyboards::phone_request()))
                    .await
            }
            Conversation::Confirmation {
                item_id,
                date,
                user_name,
                phone,
            } => {
                let item = self.active_item(*item_id).await?;
                self.reply(
                    chat,
                    &texts::confirm_request(&item, *date, user_name, phone),
                    Some(keyboards::confirmation()),
                )
                .await
            }
            Conversation::ManagerClientName => {
                self.reply(chat, texts::ENTER_CLIENT_NAME, Some(keyboards::navigation()))
                    .await
            }
            Conversation::ManagerClientPhone { .. } => {
                self.reply(chat, texts::ENTER_CLIENT_PHONE, Some(keyboards::phone_request()))
                    .await
            }
            Conversation::ManagerDateType { .. } => {
                self.reply(
                    chat,
                    texts::CHOOSE_DATE_TYPE,
                    Some(Markup::Inline(keyboards::date_type())),
                )
                .await
            }
            Conversation::ManagerSingleDate { .. } => {
                self.reply(chat, texts::ENTER_SINGLE_DATE, Some(keyboards::navigation()))
                    .await
            }
            Conversation::ManagerStartDate { .. } => {
                self.reply(chat, texts::ENTER_START_DATE, Some(keyboards::navigation()))
                    .await
            }
            Conversation::ManagerEndDate { .. } => {
                self.reply(chat, texts::ENTER_END_DATE, Some(keyboards::navigation()))
                    .await
            }
            Conversation::ManagerComment { .. } => {
                self.reply(chat, texts::ENTER_COMMENT, Some(keyboards::comment()))
                    .await
            }
            Conversation::ManagerConfirm {
                client,
                item_id,
                dates,
                comment,
                ..
            } => {
                let item = self.active_item(*item_id).await?;
                self.reply(
                    chat,
                    &texts::manager_confirm_request(
                        &client.client_name,
                        &client.client_phone,
                        &item,
                        dates,
                        comment.as_deref(),
                    ),
                    Some(keyboards::confirmation()),
                )
                .await
            }
            Conversation::ViewSchedule { item_id } => {
                return self.show_schedule(ctx, *item_id).await;
            }
            Conversation::WaitingSpecificDate { .. } => {
                self.reply(chat, texts::ENTER_SPECIFIC_DATE, Some(keyboards::navigation()))
                    .await
            }
        }
        Ok(())
    }

    async fn show_main_menu(&self, ctx: &Ctx) -> Result<(), RentError> {
        self.conversations.reset(ctx.user_id()).await?;
        self.reply(
            ctx.chat_id,
            texts::MAIN_MENU,
            Some(keyboards::main_menu(ctx.is_manager)),
        )
        .await;
        Ok(())
    }

    /// Renders a page of active items for one of the three item pickers and
    /// records the page in the conversation.
    async fn show_items(
        &self,
        ctx: &Ctx,
        message_id: Option<i32>,
        list: ItemList,
        page: usize,
    ) -> Result<(), RentError> {
        let items = self.items.list_items().await?;
        if items.is_empty() {
            self.reply(ctx.chat_id, texts::NO_ITEMS, None).await;
            return Ok(());
        }
        let page = paginate(
            &items,
            page,
            self.settings.item_page_size,
            rentbot_booking::helpers::DEFAULT_ITEM_PAGE_SIZE,
        );

        let state = match list {
            ItemList::Booking => Some(Conversation::SelectItem { page: page.page }),
            ItemList::Schedule => Some(Conversation::ScheduleSelectItem { page: page.page }),
            ItemList::Manager => match self.conversations.load(ctx.user_id()).await? {
                Conversation::ManagerItemSelection { client, .. } => {
                    Some(Conversation::ManagerItemSelection {
                        client,
                        page: page.page,
                    })
                }
                _ => None,
            },
        };
        if let Some(state) = state {
            self.conversations.save(ctx.user_id(), &state).await?;
        }

        let rows = keyboards::items(&page, list);
        self.show_inline(ctx.chat_id, message_id, texts::CHOOSE_ITEM, rows)
            .await;
        Ok(())
    }

    async fn active_item(&self, item_id: i64) -> Result<Item, RentError> {
        let item = self.items.get_item(item_id).await?;
        if !item.is_active {
            return Err(RentError::not_found("item", item_id));
        }
        Ok(item)
    }

    // --- Channel helpers. Send failures are logged and swallowed. ---

    async fn reply(&self, chat_id: i64, text: &str, markup: Option<Markup>) {
        let mut msg = OutboundMessage::text(chat_id, text);
        msg.markup = markup;
        if let Err(e) = self.channel.send(msg).await {
            warn!(chat_id, error = %e, "failed to send reply");
        }
    }

    /// Edits the message a button belongs to, or sends a new one.
    async fn show_inline(
        &self,
        chat_id: i64,
        message_id: Option<i32>,
        text: &str,
        rows: Vec<Vec<InlineButton>>,
    ) {
        let Some(message_id) = message_id else {
            return self.reply(chat_id, text, Some(Markup::Inline(rows))).await;
        };
        let edit = EditMessage {
            chat_id,
            message_id,
            text: text.to_string(),
            inline: Some(rows),
        };
        if let Err(e) = self.channel.edit(edit).await {
            warn!(chat_id, message_id, error = %e, "failed to edit message");
        }
    }

    async fn answer(&self, callback_id: &str, text: Option<&str>) {
        if let Err(e) = self.channel.answer_callback(callback_id, text).await {
            debug!(error = %e, "failed to answer callback");
        }
    }
}

fn requires_manager(callback: &Callback) -> bool {
    matches!(
        callback,
        Callback::ManagerItemsPage(_)
            | Callback::ManagerSelectItem(_)
            | Callback::ManagerSingleDate
            | Callback::ManagerDateRange
            | Callback::Booking { .. }
            | Callback::ChangeTo { .. }
            | Callback::CallBooking(_)
            | Callback::ShowBooking(_)
            | Callback::ExportUsers
            | Callback::PendingPage(_)
    )
}
