// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat channel trait for messaging platform integrations.

use std::path::Path;

use async_trait::async_trait;

use crate::chat::{EditMessage, InboundUpdate, MessageRef, OutboundMessage};
use crate::error::RentError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for the bidirectional messaging channel.
///
/// The booking engine depends only on this capability set and is agnostic
/// to the provider behind it.
#[async_trait]
pub trait ChatChannel: PluginAdapter {
    /// Starts receiving updates from the platform.
    async fn connect(&mut self) -> Result<(), RentError>;

    /// Receives the next inbound update. Fails once the update stream is closed.
    async fn receive(&self) -> Result<InboundUpdate, RentError>;

    /// Sends a text message with an optional keyboard.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageRef, RentError>;

    /// Replaces the text and inline keyboard of a sent message.
    async fn edit(&self, edit: EditMessage) -> Result<(), RentError>;

    /// Acknowledges an inline button press, optionally with a toast text.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>)
    -> Result<(), RentError>;

    /// Uploads a file to the chat.
    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageRef, RentError>;
}
