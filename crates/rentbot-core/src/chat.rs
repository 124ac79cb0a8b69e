// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel-agnostic chat update and outbound message types.

/// The participant an update came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub language_code: Option<String>,
}

/// An incoming update from the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundUpdate {
    /// A text message, optionally carrying a shared contact.
    Message {
        chat_id: i64,
        sender: Sender,
        text: Option<String>,
        contact_phone: Option<String>,
    },
    /// An inline keyboard button press.
    Callback {
        callback_id: String,
        chat_id: i64,
        message_id: Option<i32>,
        sender: Sender,
        data: String,
    },
}

impl InboundUpdate {
    pub fn sender(&self) -> &Sender {
        match self {
            InboundUpdate::Message { sender, .. } | InboundUpdate::Callback { sender, .. } => {
                sender
            }
        }
    }

    pub fn chat_id(&self) -> i64 {
        match self {
            InboundUpdate::Message { chat_id, .. } | InboundUpdate::Callback { chat_id, .. } => {
                *chat_id
            }
        }
    }
}

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// One reply keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyButton {
    pub text: String,
    /// Ask the client to share its phone number when pressed.
    pub request_contact: bool,
}

impl ReplyButton {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_contact: false,
        }
    }

    pub fn contact(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_contact: true,
        }
    }
}

/// Keyboard attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Inline(Vec<Vec<InlineButton>>),
    Reply(Vec<Vec<ReplyButton>>),
    RemoveReply,
}

impl Markup {
    /// Callback data of every inline button, row-major.
    pub fn callback_data(&self) -> Vec<&str> {
        match self {
            Markup::Inline(rows) => rows
                .iter()
                .flatten()
                .map(|b| b.callback_data.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A message to be delivered to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub markup: Option<Markup>,
}

impl OutboundMessage {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            markup: None,
        }
    }

    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = Some(markup);
        self
    }
}

/// Replacement text and inline keyboard for an already sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub text: String,
    pub inline: Option<Vec<Vec<InlineButton>>>,
}

/// Reference to a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}
