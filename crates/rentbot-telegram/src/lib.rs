// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the Rentbot booking engine.
//!
//! Implements [`ChatChannel`] for the Telegram Bot API via teloxide: long
//! polling of messages and callback queries, HTML-formatted replies with
//! inline and reply keyboards, message edits, and document uploads.

pub mod handler;
pub mod markup;

use std::path::Path;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, ChatId, InputFile, MessageId, ParseMode};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use rentbot_config::model::TelegramConfig;
use rentbot_core::chat::{EditMessage, InboundUpdate, MessageRef, OutboundMessage};
use rentbot_core::types::{AdapterType, HealthStatus};
use rentbot_core::{ChatChannel, PluginAdapter, RentError};

/// Telegram channel adapter implementing [`ChatChannel`].
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundUpdate>>,
    inbound_tx: mpsc::Sender<InboundUpdate>,
    polling_handle: StdMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TelegramChannel {
    /// Creates the adapter. `queue_size` bounds updates waiting for the
    /// receiver loop; polling pauses while the queue is full.
    pub fn new(config: &TelegramConfig, queue_size: usize) -> Result<Self, RentError> {
        let token = config
            .bot_token
            .as_deref()
            .ok_or_else(|| RentError::Config("telegram.bot_token is required".into()))?;

        if token.is_empty() {
            return Err(RentError::Config("telegram.bot_token cannot be empty".into()));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(queue_size.max(1));

        Ok(Self {
            bot,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: StdMutex::new(None),
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    async fn send_html(&self, msg: &OutboundMessage) -> Result<Message, RequestError> {
        let mut request = self
            .bot
            .send_message(ChatId(msg.chat_id), &msg.text)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = &msg.markup {
            request = request.reply_markup(markup::reply_markup(markup));
        }
        request.await
    }

    async fn send_plain(&self, msg: &OutboundMessage) -> Result<Message, RequestError> {
        let mut request = self.bot.send_message(ChatId(msg.chat_id), &msg.text);
        if let Some(markup) = &msg.markup {
            request = request.reply_markup(markup::reply_markup(markup));
        }
        request.await
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, RentError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), RentError> {
        debug!("Telegram channel shutting down");
        let handle = self
            .polling_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChatChannel for TelegramChannel {
    async fn connect(&mut self) -> Result<(), RentError> {
        let slot = self
            .polling_handle
            .get_mut()
            .unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let message_tx = self.inbound_tx.clone();
        let callback_tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = dptree::entry()
                .branch(Update::filter_message().endpoint(move |msg: Message| {
                    let tx = message_tx.clone();
                    async move {
                        if let Some(update) = handler::to_inbound_message(&msg) {
                            if tx.send(update).await.is_err() {
                                warn!("inbound queue closed, dropping message");
                            }
                        }
                        respond(())
                    }
                }))
                .branch(
                    Update::filter_callback_query().endpoint(move |query: CallbackQuery| {
                        let tx = callback_tx.clone();
                        async move {
                            if let Some(update) = handler::to_inbound_callback(&query) {
                                if tx.send(update).await.is_err() {
                                    warn!("inbound queue closed, dropping callback");
                                }
                            }
                            respond(())
                        }
                    }),
                );

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        *slot = Some(handle);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundUpdate, RentError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| RentError::transport("Telegram inbound channel closed"))
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageRef, RentError> {
        let sent = match self.send_html(&msg).await {
            Ok(sent) => sent,
            Err(e) if e.to_string().contains("can't parse entities") => {
                warn!(chat_id = msg.chat_id, error = %e, "HTML send failed, sending as plain text");
                self.send_plain(&msg)
                    .await
                    .map_err(|e| transport_error("failed to send message", e))?
            }
            Err(e) => return Err(transport_error("failed to send message", e)),
        };
        Ok(MessageRef {
            chat_id: sent.chat.id.0,
            message_id: sent.id.0,
        })
    }

    async fn edit(&self, edit: EditMessage) -> Result<(), RentError> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(edit.chat_id), MessageId(edit.message_id), &edit.text)
            .parse_mode(ParseMode::Html);
        if let Some(rows) = &edit.inline {
            request = request.reply_markup(markup::inline_keyboard(rows));
        }
        match request.await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) => Err(transport_error("failed to edit message", e)),
        }
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), RentError> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        request
            .await
            .map_err(|e| transport_error("failed to answer callback", e))?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageRef, RentError> {
        let mut request = self
            .bot
            .send_document(ChatId(chat_id), InputFile::file(path.to_path_buf()));
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        let sent = request
            .await
            .map_err(|e| transport_error("failed to send document", e))?;
        Ok(MessageRef {
            chat_id: sent.chat.id.0,
            message_id: sent.id.0,
        })
    }
}

fn transport_error(context: &str, e: RequestError) -> RentError {
    RentError::Transport {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(matches!(
            TelegramChannel::new(&config(None), 10),
            Err(RentError::Config(_))
        ));
    }

    #[test]
    fn new_rejects_empty_token() {
        assert!(TelegramChannel::new(&config(Some("")), 10).is_err());
    }

    #[test]
    fn plugin_adapter_metadata() {
        let channel = TelegramChannel::new(&config(Some("123456:ABC-DEF")), 10).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert_eq!(channel.version(), semver::Version::new(0, 1, 0));
        assert_eq!(channel.adapter_type(), AdapterType::Channel);
    }

    #[tokio::test]
    async fn receive_waits_while_queue_is_empty() {
        let channel = TelegramChannel::new(&config(Some("123456:ABC-DEF")), 1).unwrap();
        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            channel.receive(),
        )
        .await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn shutdown_without_connect_is_noop() {
        let channel = TelegramChannel::new(&config(Some("123456:ABC-DEF")), 1).unwrap();
        channel.shutdown().await.unwrap();
    }
}
