// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport trait: the abstract send/edit/delete/answer capability the core
//! consumes from the messaging platform.
//!
//! The core is agnostic to rendering; it only requires stable message-id
//! correlation so reply threading keeps working.

use std::path::Path;

use async_trait::async_trait;

use crate::error::TesseraError;
use crate::types::{ChatId, MessageRef, OutboundMessage};

/// Outbound messaging capability.
///
/// Every call is expected to be bounded by a timeout inside the
/// implementation; a slow platform connection must never stall the event
/// loop indefinitely.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a message and returns the platform reference to the sent copy.
    async fn send(&self, chat: ChatId, msg: OutboundMessage) -> Result<MessageRef, TesseraError>;

    /// Edits a previously sent message in place.
    async fn edit(&self, target: MessageRef, msg: OutboundMessage) -> Result<(), TesseraError>;

    /// Deletes a previously sent message.
    async fn delete(&self, target: MessageRef) -> Result<(), TesseraError>;

    /// Acknowledges a button tap, optionally with a short notice to the tapper.
    async fn answer(&self, interaction_id: &str, text: Option<&str>) -> Result<(), TesseraError>;

    /// Sends a photo with caption. Callers fall back to [`Transport::send`]
    /// with the caption text when this fails.
    async fn send_photo(
        &self,
        chat: ChatId,
        photo: &Path,
        caption: OutboundMessage,
    ) -> Result<MessageRef, TesseraError>;
}
