// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tessera concierge bot.
//!
//! Provides the shared error type, the normalized inbound/outbound message
//! types, and the [`Transport`] trait implemented by messaging adapters.

pub mod error;
pub mod transport;
pub mod types;

pub use error::TesseraError;
pub use transport::Transport;
pub use types::{
    Button, ChatId, InboundEvent, Interaction, Keyboard, MessageId, MessageRef, OutboundMessage,
    ServiceKind, TicketId, UserId,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = TesseraError::Config("test".into());
        let _storage = TesseraError::storage(std::io::Error::other("test"));
        let _transport = TesseraError::transport("test");
        let _timeout = TesseraError::Timeout {
            duration: std::time::Duration::from_secs(10),
        };
        let _internal = TesseraError::Internal("test".into());
    }

    #[test]
    fn transport_error_message_formats() {
        let err = TesseraError::transport("failed to send message");
        assert_eq!(err.to_string(), "transport error: failed to send message");
    }

    #[test]
    fn outbound_builder_chains() {
        let msg = OutboundMessage::text("hi")
            .with_keyboard(Keyboard::Remove)
            .with_reply_to(MessageId(7));
        assert_eq!(msg.text, "hi");
        assert_eq!(msg.keyboard, Some(Keyboard::Remove));
        assert_eq!(msg.reply_to, Some(MessageId(7)));
    }
}
