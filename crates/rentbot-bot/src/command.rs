// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash command parsing.

use rentbot_core::RentError;

/// Prefix of the deep-link command that opens a booking card.
const MANAGER_BOOKING_PREFIX: &str = "/manager_booking_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`, `сброс` or `reset`: drop the conversation and show the menu.
    Start,
    GetAll,
    Stats,
    StartBooking,
    ManagerBooking(i64),
    AddItem { name: String, quantity: i64 },
    EditItem { name: String, quantity: i64 },
    ListItems,
    DisableItem { name: String },
    SetItemOrder { name: String, order: i64 },
    MoveItemUp { name: String },
    MoveItemDown { name: String },
}

impl Command {
    /// Parses a text message.
    ///
    /// Returns `None` for text that is not a command, and `Some(Err)` for a
    /// known command with malformed arguments.
    pub fn parse(text: &str) -> Option<Result<Command, RentError>> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("reset") || text.to_lowercase() == "сброс" {
            return Some(Ok(Command::Start));
        }
        if !text.starts_with('/') {
            return None;
        }

        let (head, args) = match text.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (text, ""),
        };
        // `/cmd@botname` is how group chats address a bot.
        let head = head.split_once('@').map_or(head, |(cmd, _)| cmd);

        if let Some(id) = head.strip_prefix(MANAGER_BOOKING_PREFIX) {
            return Some(
                id.parse()
                    .map(Command::ManagerBooking)
                    .map_err(|_| usage("/manager_booking_<id>")),
            );
        }

        let parsed = match head {
            "/start" => Ok(Command::Start),
            "/get_all" => Ok(Command::GetAll),
            "/stats" => Ok(Command::Stats),
            "/start_booking" => Ok(Command::StartBooking),
            "/list_items" => Ok(Command::ListItems),
            "/add_item" => name_and_number(args, "/add_item <name> <quantity>")
                .map(|(name, quantity)| Command::AddItem { name, quantity }),
            "/edit_item" => name_and_number(args, "/edit_item <name> <quantity>")
                .map(|(name, quantity)| Command::EditItem { name, quantity }),
            "/set_item_order" => name_and_number(args, "/set_item_order <name> <order>")
                .map(|(name, order)| Command::SetItemOrder { name, order }),
            "/disable_item" => name(args, "/disable_item <name>").map(|name| Command::DisableItem { name }),
            "/move_item_up" => name(args, "/move_item_up <name>").map(|name| Command::MoveItemUp { name }),
            "/move_item_down" => {
                name(args, "/move_item_down <name>").map(|name| Command::MoveItemDown { name })
            }
            _ => return None,
        };
        Some(parsed)
    }

    /// Everything except `/start` is reserved for managers.
    pub fn requires_manager(&self) -> bool {
        !matches!(self, Command::Start)
    }
}

fn usage(form: &str) -> RentError {
    RentError::Validation(format!("usage: {form}"))
}

fn name(args: &str, form: &str) -> Result<String, RentError> {
    if args.is_empty() {
        return Err(usage(form));
    }
    Ok(args.to_string())
}

/// Splits `<name words…> <number>`; the name may contain spaces.
fn name_and_number(args: &str, form: &str) -> Result<(String, i64), RentError> {
    let (name, number) = args
        .rsplit_once(char::is_whitespace)
        .ok_or_else(|| usage(form))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(usage(form));
    }
    let number = number.parse().map_err(|_| usage(form))?;
    Ok((name.to_string(), number))
}
