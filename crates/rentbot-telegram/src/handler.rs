// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of Telegram updates into channel-agnostic inbound updates.
//!
//! Only private chats are served. Messages without a sender and callbacks
//! without data are dropped here so the orchestrator never sees them.

use teloxide::types::{CallbackQuery, ChatKind, Message, User};
use tracing::debug;

use rentbot_core::chat::{InboundUpdate, Sender};

/// Whether the message comes from a private (DM) chat.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

pub fn to_sender(user: &User) -> Sender {
    Sender {
        // Telegram user ids fit in 52 bits.
        id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone().unwrap_or_default(),
        language_code: user.language_code.clone(),
    }
}

/// Maps a text or contact message. Other message kinds yield `None`.
pub fn to_inbound_message(msg: &Message) -> Option<InboundUpdate> {
    if !is_dm(msg) {
        debug!(chat_id = msg.chat.id.0, "ignoring non-private message");
        return None;
    }
    let sender = to_sender(msg.from.as_ref()?);
    let text = msg.text().map(str::to_string);
    let contact_phone = msg.contact().map(|c| c.phone_number.clone());
    if text.is_none() && contact_phone.is_none() {
        debug!(msg_id = msg.id.0, "ignoring unsupported message type");
        return None;
    }
    Some(InboundUpdate::Message {
        chat_id: msg.chat.id.0,
        sender,
        text,
        contact_phone,
    })
}

/// Maps an inline button press. Presses without data yield `None`.
pub fn to_inbound_callback(query: &CallbackQuery) -> Option<InboundUpdate> {
    let data = query.data.clone()?;
    let sender = to_sender(&query.from);
    let (chat_id, message_id) = match query.message.as_ref() {
        Some(message) => (message.chat().id.0, Some(message.id().0)),
        None => (sender.id, None),
    };
    Some(InboundUpdate::Callback {
        callback_id: query.id.0.clone(),
        chat_id,
        message_id,
        sender,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_json(user_id: u64, username: Option<&str>) -> serde_json::Value {
        let mut from = serde_json::json!({
            "id": user_id,
            "is_bot": false,
            "first_name": "Ivan",
            "last_name": "Petrov",
            "language_code": "ru",
        });
        if let Some(name) = username {
            from["username"] = serde_json::json!(name);
        }
        from
    }

    fn private_message(user_id: u64, extra: serde_json::Value) -> serde_json::Value {
        let mut json = serde_json::json!({
            "message_id": 10,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Ivan",
            },
            "from": from_json(user_id, Some("ivan")),
        });
        if let (Some(obj), Some(extra)) = (json.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }
        json
    }

    fn message(json: serde_json::Value) -> Message {
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    #[test]
    fn text_message_maps_sender_and_chat() {
        let msg = message(private_message(555, serde_json::json!({ "text": "/start" })));
        let update = to_inbound_message(&msg).unwrap();
        match update {
            InboundUpdate::Message {
                chat_id,
                sender,
                text,
                contact_phone,
            } => {
                assert_eq!(chat_id, 555);
                assert_eq!(sender.id, 555);
                assert_eq!(sender.username.as_deref(), Some("ivan"));
                assert_eq!(sender.last_name, "Petrov");
                assert_eq!(sender.language_code.as_deref(), Some("ru"));
                assert_eq!(text.as_deref(), Some("/start"));
                assert!(contact_phone.is_none());
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn contact_message_carries_phone() {
        let msg = message(private_message(
            555,
            serde_json::json!({
                "contact": { "phone_number": "+7 999 123-45-67", "first_name": "Ivan" }
            }),
        ));
        match to_inbound_message(&msg).unwrap() {
            InboundUpdate::Message { contact_phone, text, .. } => {
                assert_eq!(contact_phone.as_deref(), Some("+7 999 123-45-67"));
                assert!(text.is_none());
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn group_messages_are_ignored() {
        let msg = message(serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": { "id": -100123i64, "type": "supergroup", "title": "Group" },
            "from": from_json(555, None),
            "text": "hello",
        }));
        assert!(!is_dm(&msg));
        assert!(to_inbound_message(&msg).is_none());
    }

    #[test]
    fn callback_maps_message_reference() {
        let query: CallbackQuery = serde_json::from_value(serde_json::json!({
            "id": "cb-1",
            "from": from_json(777, None),
            "message": private_message(777, serde_json::json!({ "text": "menu" })),
            "chat_instance": "-42",
            "data": "select_item:3",
        }))
        .expect("failed to deserialize callback");
        match to_inbound_callback(&query).unwrap() {
            InboundUpdate::Callback {
                callback_id,
                chat_id,
                message_id,
                sender,
                data,
            } => {
                assert_eq!(callback_id, "cb-1");
                assert_eq!(chat_id, 777);
                assert_eq!(message_id, Some(10));
                assert_eq!(sender.id, 777);
                assert!(sender.username.is_none());
                assert_eq!(data, "select_item:3");
            }
            other => panic!("expected callback, got {other:?}"),
        }
    }

    #[test]
    fn callback_without_data_is_dropped() {
        let query: CallbackQuery = serde_json::from_value(serde_json::json!({
            "id": "cb-2",
            "from": from_json(777, None),
            "chat_instance": "-42",
        }))
        .expect("failed to deserialize callback");
        assert!(to_inbound_callback(&query).is_none());
    }
}
