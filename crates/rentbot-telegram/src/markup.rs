// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyboard conversion from channel-agnostic markup to Telegram types.

use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    KeyboardRemove, ReplyMarkup,
};

use rentbot_core::chat::{InlineButton, Markup};

pub fn inline_keyboard(rows: &[Vec<InlineButton>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.text.clone(), b.callback_data.clone()))
            .collect::<Vec<_>>()
    }))
}

pub fn reply_markup(markup: &Markup) -> ReplyMarkup {
    match markup {
        Markup::Inline(rows) => ReplyMarkup::InlineKeyboard(inline_keyboard(rows)),
        Markup::Reply(rows) => {
            let keyboard = rows.iter().map(|row| {
                row.iter()
                    .map(|b| {
                        let button = KeyboardButton::new(b.text.clone());
                        if b.request_contact {
                            button.request(ButtonRequest::Contact)
                        } else {
                            button
                        }
                    })
                    .collect::<Vec<_>>()
            });
            ReplyMarkup::Keyboard(KeyboardMarkup::new(keyboard).resize_keyboard())
        }
        Markup::RemoveReply => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}
