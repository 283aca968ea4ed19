// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime-mutable operator state: the banned set and worker aliases.
//!
//! Config values only seed this document on first run; afterwards the
//! document is authoritative, so an unban or alias change survives restarts
//! without editing config.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tessera_config::model::AudienceConfig;
use tessera_core::{ChatId, TesseraError};
use tessera_store::SyncDoc;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ControlState {
    /// Chats denied all interaction except from privileged chats.
    #[serde(default)]
    pub banned: BTreeSet<ChatId>,
    /// Worker display aliases keyed by chat-id string.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Synchronously persisted control document.
pub struct ControlDoc {
    doc: SyncDoc<ControlState>,
}

impl ControlDoc {
    /// Open the control document, seeding from config on first run.
    pub fn open(path: impl AsRef<Path>, seed: &AudienceConfig) -> Result<Self, TesseraError> {
        let path = path.as_ref();
        let fresh = !path.exists();
        let doc: SyncDoc<ControlState> = SyncDoc::open(path);
        if fresh {
            doc.update(|state| {
                state.banned = seed.banned_chat_ids.iter().map(|&id| ChatId(id)).collect();
                state.aliases = seed.worker_aliases.clone();
            })?;
        }
        Ok(Self { doc })
    }

    pub fn is_banned(&self, chat: ChatId) -> bool {
        self.doc.read(|state| state.banned.contains(&chat))
    }

    /// Add to the banned set. Returns false if the chat was already banned.
    pub fn ban(&self, chat: ChatId) -> Result<bool, TesseraError> {
        self.doc.update(|state| state.banned.insert(chat))
    }

    /// Remove from the banned set. Returns false if the chat was not banned.
    pub fn unban(&self, chat: ChatId) -> Result<bool, TesseraError> {
        self.doc.update(|state| state.banned.remove(&chat))
    }

    pub fn alias_for(&self, chat: ChatId) -> Option<String> {
        self.doc.read(|state| {
            state
                .aliases
                .get(&chat.0.to_string())
                .filter(|a| !a.trim().is_empty())
                .cloned()
        })
    }

    pub fn set_alias(&self, chat: ChatId, alias: &str) -> Result<(), TesseraError> {
        self.doc.update(|state| {
            state.aliases.insert(chat.0.to_string(), alias.to_string());
        })
    }
}
