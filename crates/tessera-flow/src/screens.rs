// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Screen rendering: every [`Screen`] identifier maps to one message with a
//! reply keyboard, so "back" can re-render any screen from the nav stack
//! alone plus the persisted profile/session.

use tessera_config::model::OrderConfig;
use tessera_core::{Keyboard, OutboundMessage};

use crate::input::short_text;
use crate::profile::Profile;
use crate::script::FOOD_CATEGORIES;
use crate::session::SessionRecord;
use crate::state::Screen;

pub const BTN_CREATE_PROFILE: &str = "💾 Create Profile";
pub const BTN_SKIP: &str = "Skip (this time)";
pub const BTN_BACK: &str = "⬅️ Back";
pub const BTN_HOME: &str = "🏠 Home";
pub const BTN_CANCEL: &str = "⬅️ Cancel";
pub const BTN_USE_ADDRESS: &str = "✅ Use this address";
pub const BTN_CHOOSE_ANOTHER: &str = "🔁 Choose another";
pub const BTN_ADD_ADDRESS: &str = "➕ Add Address";
pub const BTN_MANAGE: &str = "⚙️ Manage";
pub const BTN_CHANGE_ADDRESS: &str = "🔁 Change address";
pub const BTN_CONTINUE_ORDER: &str = "✅ Continue Order";
pub const BTN_SET_DEFAULT: &str = "⭐ Set Default";
pub const BTN_EDIT: &str = "✏️ Edit";
pub const BTN_RENAME: &str = "🏷 Rename";
pub const BTN_DELETE: &str = "🗑 Delete";
pub const BTN_DELETE_YES: &str = "✅ Yes, delete";
pub const BTN_DELETE_NO: &str = "❌ Cancel";
pub const BTN_LABEL_HOME: &str = "🏠 Home";
pub const BTN_LABEL_WORK: &str = "🏢 Work";
pub const BTN_LABEL_OTHER: &str = "📍 Other";
pub const BTN_LABEL_CUSTOM: &str = "✍️ Custom";

/// Food menu, two options per row, with a home row at the bottom.
pub fn home_keyboard() -> Keyboard {
    let mut rows: Vec<Vec<String>> = FOOD_CATEGORIES
        .chunks(2)
        .map(|pair| pair.iter().map(|(_, label)| label.to_string()).collect())
        .collect();
    rows.push(vec![BTN_HOME.to_string()]);
    Keyboard::Reply(rows)
}

pub fn profile_prompt_keyboard() -> Keyboard {
    Keyboard::Reply(vec![
        vec![BTN_CREATE_PROFILE.to_string()],
        vec![BTN_SKIP.to_string(), BTN_BACK.to_string()],
    ])
}

/// Address-label picker shown after a new address text is captured.
pub fn label_keyboard() -> Keyboard {
    Keyboard::Reply(vec![
        vec![BTN_LABEL_HOME.to_string(), BTN_LABEL_WORK.to_string()],
        vec![BTN_LABEL_OTHER.to_string(), BTN_LABEL_CUSTOM.to_string()],
        vec![BTN_CANCEL.to_string()],
    ])
}

pub fn address_picker_keyboard(profile: &Profile) -> Keyboard {
    let mut rows: Vec<Vec<String>> = profile
        .addresses
        .chunks(2)
        .map(|pair| pair.iter().map(|a| a.label.clone()).collect())
        .collect();
    rows.push(vec![BTN_ADD_ADDRESS.to_string(), BTN_MANAGE.to_string()]);
    rows.push(vec![BTN_BACK.to_string()]);
    Keyboard::Reply(rows)
}

pub fn single_address_keyboard() -> Keyboard {
    Keyboard::Reply(vec![
        vec![BTN_USE_ADDRESS.to_string()],
        vec![BTN_CHOOSE_ANOTHER.to_string(), BTN_ADD_ADDRESS.to_string()],
        vec![BTN_MANAGE.to_string(), BTN_BACK.to_string()],
    ])
}

pub fn subtotal_keyboard() -> Keyboard {
    Keyboard::Reply(vec![
        vec![BTN_CHANGE_ADDRESS.to_string(), BTN_MANAGE.to_string()],
        vec![BTN_BACK.to_string()],
    ])
}

pub fn confirm_keyboard() -> Keyboard {
    Keyboard::Reply(vec![
        vec![BTN_CONTINUE_ORDER.to_string()],
        vec![BTN_BACK.to_string(), BTN_HOME.to_string()],
    ])
}

pub fn manage_list_keyboard(profile: &Profile) -> Keyboard {
    let mut rows: Vec<Vec<String>> = profile
        .addresses
        .iter()
        .map(|a| vec![a.label.clone()])
        .collect();
    rows.push(vec![BTN_ADD_ADDRESS.to_string()]);
    rows.push(vec![BTN_BACK.to_string()]);
    Keyboard::Reply(rows)
}

pub fn manage_card_keyboard() -> Keyboard {
    Keyboard::Reply(vec![
        vec![BTN_SET_DEFAULT.to_string(), BTN_EDIT.to_string()],
        vec![BTN_RENAME.to_string(), BTN_DELETE.to_string()],
        vec![BTN_BACK.to_string()],
    ])
}

pub fn delete_confirm_keyboard() -> Keyboard {
    Keyboard::Reply(vec![vec![
        BTN_DELETE_YES.to_string(),
        BTN_DELETE_NO.to_string(),
    ]])
}

fn address_line(profile: &Profile, id: &str) -> String {
    match profile.address(id) {
        Some(a) => {
            let star = if profile.default_address_id.as_deref() == Some(id) {
                " ⭐"
            } else {
                ""
            };
            format!("{}{star}\n{}", a.label, short_text(&a.text, 120))
        }
        None => "(address removed)".to_string(),
    }
}

fn profile_card(profile: &Profile) -> String {
    let mut lines = vec![
        format!("👤 Name: {}", if profile.name.is_empty() { "-" } else { &profile.name }),
        format!("📞 Phone: {}", if profile.phone.is_empty() { "-" } else { &profile.phone }),
    ];
    if profile.addresses.is_empty() {
        lines.push("📍 No saved addresses yet.".to_string());
    } else {
        lines.push("📍 Addresses:".to_string());
        for a in &profile.addresses {
            let star = if profile.default_address_id.as_deref() == Some(&a.id) {
                " ⭐"
            } else {
                ""
            };
            lines.push(format!("  • {}{star} — {}", a.label, short_text(&a.text, 60)));
        }
    }
    lines.join("\n")
}

/// The finalized order summary shown on the confirm screen.
pub fn order_summary(
    option: &str,
    name: &str,
    phone: &str,
    address: &str,
    subtotal: f64,
) -> String {
    format!(
        "Option: {option}\nName: {name}\nPhone: {phone}\nAddress: {address}\nSubtotal: ${subtotal:.2}"
    )
}

/// Render a screen from persisted state alone. Used both for first display
/// and for "back" re-rendering off the nav stack.
pub fn render_screen(
    screen: &Screen,
    profile: Option<&Profile>,
    session: &SessionRecord,
    band: &OrderConfig,
) -> OutboundMessage {
    let empty = Profile::default();
    let profile = profile.unwrap_or(&empty);
    match screen {
        Screen::Home => OutboundMessage::text(
            "🍔 What are we ordering today? Pick an option below.",
        )
        .with_keyboard(home_keyboard()),
        Screen::ProfilePrompt => OutboundMessage::text(
            "💾 Save a profile to skip these questions next time?",
        )
        .with_keyboard(profile_prompt_keyboard()),
        Screen::ProfileView => {
            OutboundMessage::text(profile_card(profile)).with_keyboard(single_address_keyboard())
        }
        Screen::AddressPicker => OutboundMessage::text("📍 Which address should we use?")
            .with_keyboard(address_picker_keyboard(profile)),
        Screen::SingleAddress => {
            let body = match session
                .selected_address_id
                .as_deref()
                .or(profile.default_address_id.as_deref())
            {
                Some(id) => format!("📍 Deliver to:\n\n{}", address_line(profile, id)),
                None => "📍 No saved address on file.".to_string(),
            };
            OutboundMessage::text(body).with_keyboard(single_address_keyboard())
        }
        Screen::SubtotalPrompt => OutboundMessage::text(format!(
            "💵 What's the subtotal of your cart?\n(between ${:.0} and ${:.0} before fees)",
            band.subtotal_min, band.subtotal_max
        ))
        .with_keyboard(subtotal_keyboard()),
        Screen::Confirm => {
            let option = session.selected_option.as_deref().unwrap_or("-");
            let name = session.temp.name.as_deref().unwrap_or(&profile.name);
            let phone = session.temp.phone.as_deref().unwrap_or(&profile.phone);
            let address = session
                .temp
                .address_text
                .clone()
                .or_else(|| {
                    session
                        .selected_address_id
                        .as_deref()
                        .and_then(|id| profile.address(id))
                        .map(|a| a.text.clone())
                })
                .unwrap_or_else(|| "-".to_string());
            let subtotal = session.temp.subtotal.unwrap_or(0.0);
            OutboundMessage::text(format!(
                "Please confirm your order:\n\n{}",
                order_summary(option, name, phone, &address, subtotal)
            ))
            .with_keyboard(confirm_keyboard())
        }
        Screen::ManageList => {
            let body = if profile.addresses.is_empty() {
                "⚙️ No saved addresses yet. Add one below.".to_string()
            } else {
                "⚙️ Pick an address to manage.".to_string()
            };
            OutboundMessage::text(body).with_keyboard(manage_list_keyboard(profile))
        }
        Screen::ManageCard(id) => OutboundMessage::text(format!(
            "⚙️ {}",
            address_line(profile, id)
        ))
        .with_keyboard(manage_card_keyboard()),
        Screen::TicketPick => OutboundMessage::text(
            "You have more than one open ticket. Reply with the ticket number your message is about.",
        )
        .with_keyboard(Keyboard::Remove),
    }
}
