// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-customer conversation sessions and the navigation breadcrumb stack.
//!
//! Exactly one session per customer. The nav stack holds visited screen
//! identifiers with the current screen on top; it is bounded to 10 entries
//! with FIFO eviction from the front.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::{TesseraError, UserId};
use tessera_store::DebouncedDoc;

use crate::state::{FlowState, Screen};

/// Nav stack bound.
pub const NAV_MAX: usize = 10;

/// Scratch bag for in-progress multi-field input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TempBag {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address_text: Option<String>,
    /// Set on the "skip profile" path: collected fields are used for this
    /// order only and never saved.
    #[serde(default)]
    pub ephemeral: bool,
    /// Parsed subtotal awaiting confirmation.
    #[serde(default)]
    pub subtotal: Option<f64>,
}

/// One customer's dialogue position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub state: FlowState,
    #[serde(default)]
    pub temp: TempBag,
    /// Carry-over context from a prior screen.
    #[serde(default)]
    pub selected_option: Option<String>,
    #[serde(default)]
    pub selected_address_id: Option<String>,
    #[serde(default = "default_nav")]
    pub nav: Vec<Screen>,
    pub last_active: DateTime<Utc>,
}

fn default_nav() -> Vec<Screen> {
    vec![Screen::Home]
}

impl SessionRecord {
    pub fn new(state: FlowState, now: DateTime<Utc>) -> Self {
        Self {
            state,
            temp: TempBag::default(),
            selected_option: None,
            selected_address_id: None,
            nav: default_nav(),
            last_active: now,
        }
    }

    /// The screen currently shown.
    pub fn current_screen(&self) -> &Screen {
        self.nav.last().unwrap_or(&Screen::Home)
    }

    /// Push a screen onto the nav stack. Pushing the current screen again is
    /// a no-op; overflow evicts the oldest entry from the front.
    pub fn push_screen(&mut self, screen: Screen) {
        if self.nav.last() == Some(&screen) {
            return;
        }
        self.nav.push(screen);
        if self.nav.len() > NAV_MAX {
            let excess = self.nav.len() - NAV_MAX;
            self.nav.drain(..excess);
        }
    }

    /// Pop the current screen and return the one to re-render.
    pub fn pop_screen(&mut self) -> Screen {
        if self.nav.len() > 1 {
            self.nav.pop();
        }
        self.current_screen().clone()
    }

    /// Reset navigation to the root. Idempotent.
    pub fn go_home(&mut self) {
        self.nav = default_nav();
        self.state = FlowState::Idle;
        self.temp = TempBag::default();
        self.selected_address_id = None;
    }
}

/// The persisted session table, keyed by customer user id.
///
/// Sessions expire after an absolute inactivity TTL; the sweep returns the
/// expired users so the caller can notify them.
pub struct SessionTable {
    doc: DebouncedDoc<BTreeMap<String, SessionRecord>>,
    ttl: chrono::Duration,
}

impl SessionTable {
    pub fn open(path: impl AsRef<Path>, debounce: Duration, ttl_minutes: u64) -> Self {
        Self {
            doc: DebouncedDoc::open(path.as_ref(), debounce),
            ttl: chrono::Duration::minutes(ttl_minutes as i64),
        }
    }

    pub fn get(&self, user: UserId) -> Option<SessionRecord> {
        self.doc.read(|t| t.get(&user.to_string()).cloned())
    }

    /// Create or overwrite the customer's session, stamping activity.
    pub fn put(&self, user: UserId, mut session: SessionRecord, now: DateTime<Utc>) {
        session.last_active = now;
        self.doc.update(|t| {
            t.insert(user.to_string(), session);
        });
    }

    pub fn delete(&self, user: UserId) -> bool {
        self.doc.update(|t| t.remove(&user.to_string()).is_some())
    }

    /// Drop sessions idle past the TTL, returning the affected users.
    pub fn expire(&self, now: DateTime<Utc>) -> Vec<UserId> {
        let ttl = self.ttl;
        self.doc.update(|t| {
            let dead: Vec<String> = t
                .iter()
                .filter(|(_, s)| now - s.last_active > ttl)
                .map(|(k, _)| k.clone())
                .collect();
            dead.iter()
                .filter_map(|k| {
                    t.remove(k);
                    k.parse().ok().map(UserId)
                })
                .collect()
        })
    }

    pub fn flush_now(&self) -> Result<(), TesseraError> {
        self.doc.flush_now()
    }

    pub async fn shutdown(self) -> Result<(), TesseraError> {
        self.doc.shutdown().await
    }
}
