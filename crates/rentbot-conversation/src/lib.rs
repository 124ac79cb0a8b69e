// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state machine driving multi-step data capture from chat.
//!
//! The persisted form is an open key/value map keyed by step name; the
//! typed [`Conversation`] union is what the chat layer works with.

pub mod conversation;
pub mod manager;
pub mod step;

pub use conversation::{ClientDraft, Conversation, DateType};
pub use manager::ConversationManager;
pub use step::Step;
