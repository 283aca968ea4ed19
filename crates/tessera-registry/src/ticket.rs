// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket records and the persisted ledger document.
//!
//! The ledger is the authoritative record of every ticket across restarts.
//! The per-customer open index is derived and never serialized; it is rebuilt
//! from ledger entries on open.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::{ChatId, MessageRef, ServiceKind, TicketId};

/// Lifecycle status. Closed is terminal; there is no re-opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

/// How a ticket was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseKind {
    /// Worker-entered close with profit and remarks.
    Completed,
    /// Worker closed without financials (no order happened).
    Manual,
    /// Force-closed as part of banning the customer.
    Banned,
}

/// Closure metadata, set exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Closure {
    pub kind: CloseKind,
    #[serde(default)]
    pub closed_by: Option<ChatId>,
    #[serde(default)]
    pub profit: f64,
    /// Share of profit attributed to the log provider, fixed at close time.
    #[serde(default)]
    pub cut: f64,
    #[serde(default)]
    pub remarks: Option<String>,
    pub closed_at: DateTime<Utc>,
}

/// One customer request in the ledger.
///
/// Workflow flags are monotonic: a log request precedes provision, nothing
/// un-requests, and `paid` never reverts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: TicketId,
    pub chat_id: ChatId,
    pub service: ServiceKind,
    /// Sub-category label within the service (e.g. a promotion tier).
    pub category: String,
    /// Service-specific field-key / value pairs, in collection order.
    pub answers: Vec<(String, String)>,
    /// `@username` or `ID n`, shown to workers.
    pub customer_tag: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub assigned_admin: Option<ChatId>,
    #[serde(default)]
    pub assigned_alias: Option<String>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    /// Every notification copy sent for this ticket; the correlation key for
    /// reply threading and post-assignment cleanup.
    #[serde(default)]
    pub admin_messages: Vec<MessageRef>,
    #[serde(default)]
    pub log_requested: bool,
    #[serde(default)]
    pub log_provided_by: Option<String>,
    #[serde(default)]
    pub log_provided_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub closure: Option<Closure>,
}

impl TicketRecord {
    pub fn is_open(&self) -> bool {
        self.status == TicketStatus::Open
    }

    /// Answer value for a field key, if collected.
    pub fn answer(&self, key: &str) -> Option<&str> {
        self.answers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The persisted ticket ledger.
///
/// `counter` is the id high-water mark; it only moves forward, so restarts
/// never reuse an id. `open_index` is derived and skipped on disk.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LedgerFile {
    #[serde(default)]
    pub counter: u64,
    #[serde(default)]
    pub tickets: BTreeMap<u64, TicketRecord>,
    #[serde(skip)]
    pub open_index: HashMap<ChatId, BTreeSet<TicketId>>,
}

impl LedgerFile {
    /// Allocate the next ticket id, respecting the configured floor.
    pub fn next_id(&mut self, floor: u64) -> TicketId {
        self.counter = self.counter.max(floor) + 1;
        TicketId(self.counter)
    }

    /// Rebuild the per-customer open index from ledger entries alone.
    ///
    /// This is the recovery path after a restart and must produce the same
    /// membership continuous operation would have.
    pub fn rebuild_index(&mut self) {
        self.open_index.clear();
        for ticket in self.tickets.values() {
            if ticket.is_open() {
                self.open_index
                    .entry(ticket.chat_id)
                    .or_default()
                    .insert(ticket.id);
            }
        }
    }

    /// Currently open ticket ids for a customer, oldest first.
    pub fn open_for(&self, chat: ChatId) -> Vec<TicketId> {
        self.open_index
            .get(&chat)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, id: TicketId) -> Option<&TicketRecord> {
        self.tickets.get(&id.0)
    }

    pub fn get_mut(&mut self, id: TicketId) -> Option<&mut TicketRecord> {
        self.tickets.get_mut(&id.0)
    }
}

/// Aggregates folded from a full ledger scan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportSummary {
    pub total: usize,
    pub open: usize,
    pub closed_completed: usize,
    pub closed_manual: usize,
    pub closed_banned: usize,
    pub profit_total: f64,
    pub cut_total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(id: u64, chat: i64, status: TicketStatus) -> TicketRecord {
        TicketRecord {
            id: TicketId(id),
            chat_id: ChatId(chat),
            service: ServiceKind::Food,
            category: "55% off".to_string(),
            answers: vec![("name".to_string(), "Alice".to_string())],
            customer_tag: "@alice".to_string(),
            customer_name: Some("Alice".to_string()),
            status,
            created_at: Utc::now(),
            assigned_admin: None,
            assigned_alias: None,
            assigned_at: None,
            admin_messages: Vec::new(),
            log_requested: false,
            log_provided_by: None,
            log_provided_at: None,
            paid: false,
            closure: None,
        }
    }

    #[test]
    fn next_id_starts_above_floor() {
        let mut ledger = LedgerFile::default();
        assert_eq!(ledger.next_id(60), TicketId(61));
        assert_eq!(ledger.next_id(60), TicketId(62));
    }

    #[test]
    fn next_id_respects_higher_stored_counter() {
        let mut ledger = LedgerFile {
            counter: 120,
            ..Default::default()
        };
        assert_eq!(ledger.next_id(60), TicketId(121));
    }

    #[test]
    fn rebuild_index_only_keeps_open_tickets() {
        let mut ledger = LedgerFile::default();
        ledger.tickets.insert(61, ticket(61, 1, TicketStatus::Open));
        ledger
            .tickets
            .insert(62, ticket(62, 1, TicketStatus::Closed));
        ledger.tickets.insert(63, ticket(63, 2, TicketStatus::Open));
        ledger.rebuild_index();

        assert_eq!(ledger.open_for(ChatId(1)), vec![TicketId(61)]);
        assert_eq!(ledger.open_for(ChatId(2)), vec![TicketId(63)]);
        assert!(ledger.open_for(ChatId(3)).is_empty());
    }

    #[test]
    fn answer_lookup_by_key() {
        let t = ticket(61, 1, TicketStatus::Open);
        assert_eq!(t.answer("name"), Some("Alice"));
        assert_eq!(t.answer("phone"), None);
    }
}
