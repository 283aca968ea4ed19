// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from the abstract [`Keyboard`] to Telegram reply markup.

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ReplyMarkup,
};
use tessera_core::{Button, Keyboard};

/// Inline rows only, for message edits where Telegram accepts no other
/// markup kind.
pub fn to_inline_markup(rows: Vec<Vec<Button>>) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|b| InlineKeyboardButton::callback(b.label, b.action))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

pub fn to_reply_markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Inline(rows) => ReplyMarkup::InlineKeyboard(to_inline_markup(rows)),
        Keyboard::Reply(rows) => {
            let rows: Vec<Vec<KeyboardButton>> = rows
                .into_iter()
                .map(|row| row.into_iter().map(KeyboardButton::new).collect())
                .collect();
            ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard())
        }
        Keyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}
