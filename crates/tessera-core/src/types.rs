// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the transport boundary and the ticket/session core.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a Telegram chat (customer DM, worker chat, or log-provider chat).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the human behind a chat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform-issued message identifier, unique within a chat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MessageId(pub i64);

/// Monotonically increasing ticket number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TicketId(pub u64);

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A `(chat, message)` pair addressing one concrete sent message.
///
/// This is the correlation key for reply threading and for deleting stale
/// ticket-notice copies after assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat: ChatId,
    pub message: MessageId,
}

/// Which product line a bot instance serves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Food,
    Flight,
    Hotel,
}

impl ServiceKind {
    /// Human-facing service name used on tickets and reports.
    pub fn label(self) -> &'static str {
        match self {
            ServiceKind::Food => "Food",
            ServiceKind::Flight => "Flights",
            ServiceKind::Hotel => "Hotels",
        }
    }
}

/// A single inline button: visible label plus the interaction payload sent
/// back when tapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
        }
    }
}

/// Abstract keyboard attached to an outbound message.
///
/// The core never renders these itself; the transport adapter maps them to
/// the platform's markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons under the message; taps arrive as interactions.
    Inline(Vec<Vec<Button>>),
    /// Suggestion keyboard replacing the user's input pad; taps arrive as text.
    Reply(Vec<Vec<String>>),
    /// Clear any previously shown reply keyboard.
    Remove,
}

/// An outbound message to be delivered through the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub reply_to: Option<MessageId>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            reply_to: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn with_reply_to(mut self, message: MessageId) -> Self {
        self.reply_to = Some(message);
        self
    }
}

/// A button tap or other platform interaction needing acknowledgement.
#[derive(Debug, Clone)]
pub struct Interaction {
    /// Opaque id the transport needs to acknowledge the interaction.
    pub id: String,
    /// The action payload of the tapped button.
    pub payload: String,
}

/// One inbound chat event, already normalized away from the platform's
/// update shape.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Which bot instance received the event.
    pub service: ServiceKind,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    /// Message text, if the event carries any.
    pub text: Option<String>,
    /// Message this event replies to, if any.
    pub replied_to: Option<MessageId>,
    /// Button tap payload, if the event is an interaction.
    pub interaction: Option<Interaction>,
    /// Set when the event carries non-text content (photo, sticker, ...).
    pub has_attachment: bool,
}

impl InboundEvent {
    /// The sender's display tag for worker-facing summaries:
    /// `@username` when available, otherwise the numeric id.
    pub fn sender_tag(&self) -> String {
        match &self.username {
            Some(name) => format!("@{name}"),
            None => format!("ID {}", self.user_id),
        }
    }

    /// The sender's first name, falling back to the given default.
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.first_name.as_deref().filter(|n| !n.is_empty()).unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn service_kind_round_trips() {
        for kind in [ServiceKind::Food, ServiceKind::Flight, ServiceKind::Hotel] {
            let s = kind.to_string();
            assert_eq!(ServiceKind::from_str(&s).unwrap(), kind);
        }
    }

    #[test]
    fn ticket_id_displays_with_hash() {
        assert_eq!(TicketId(61).to_string(), "#61");
    }

    #[test]
    fn sender_tag_prefers_username() {
        let event = InboundEvent {
            service: ServiceKind::Food,
            chat_id: ChatId(1),
            user_id: UserId(42),
            username: Some("alice".into()),
            first_name: Some("Alice".into()),
            text: None,
            replied_to: None,
            interaction: None,
            has_attachment: false,
        };
        assert_eq!(event.sender_tag(), "@alice");

        let anon = InboundEvent {
            username: None,
            ..event
        };
        assert_eq!(anon.sender_tag(), "ID 42");
    }

    #[test]
    fn display_name_falls_back_when_empty() {
        let event = InboundEvent {
            service: ServiceKind::Food,
            chat_id: ChatId(1),
            user_id: UserId(42),
            username: None,
            first_name: Some(String::new()),
            text: None,
            replied_to: None,
            interaction: None,
            has_attachment: false,
        };
        assert_eq!(event.display_name("Customer"), "Customer");
    }
}
