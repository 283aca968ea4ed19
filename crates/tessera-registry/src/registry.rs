// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ticket registry: the single choke point for ticket mutations.
//!
//! All invariants (strictly increasing ids, at-most-one assignment, the
//! per-customer open cap, closure terminality) are enforced here, inside the
//! ledger lock, before any network I/O happens. The ledger itself is
//! persisted synchronously at every mutation so restarts never reuse an id or
//! forget an acknowledged transition.

use std::path::Path;

use chrono::{DateTime, Utc};
use tessera_config::model::{AudienceConfig, TicketConfig};
use tessera_core::{ChatId, MessageRef, ServiceKind, TesseraError, TicketId};
use tessera_store::SyncDoc;
use tracing::info;

use crate::control::ControlDoc;
use crate::error::{AssignError, CloseError, CreateError, WorkflowError};
use crate::ticket::{
    CloseKind, Closure, LedgerFile, ReportSummary, TicketRecord, TicketStatus,
};

/// Input for `create_ticket`.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub chat_id: ChatId,
    pub service: ServiceKind,
    pub category: String,
    pub answers: Vec<(String, String)>,
    pub customer_tag: String,
    pub customer_name: Option<String>,
}

/// Close request details.
#[derive(Debug, Clone)]
pub struct CloseRequest {
    pub kind: CloseKind,
    pub closed_by: Option<ChatId>,
    pub profit: Option<f64>,
    pub remarks: Option<String>,
}

/// Result of a close attempt. Closing an already-closed ticket is a no-op
/// signal, not an error.
#[derive(Debug, Clone)]
pub enum CloseOutcome {
    Closed(TicketRecord),
    AlreadyClosed(TicketRecord),
}

/// Result of an assignment attempt that did not race-lose.
#[derive(Debug, Clone)]
pub struct Assigned {
    pub ticket: TicketRecord,
    /// False when the same worker re-accepted their own ticket.
    pub newly_assigned: bool,
}

pub struct Registry {
    ledger: SyncDoc<LedgerFile>,
    control: ControlDoc,
    open_cap: usize,
    counter_floor: u64,
    cut_rate: f64,
}

impl Registry {
    /// Open the ledger and control documents under `data_dir` and rebuild the
    /// per-customer open index from ledger entries.
    pub fn open(
        data_dir: &Path,
        tickets: &TicketConfig,
        audience: &AudienceConfig,
    ) -> Result<Self, TesseraError> {
        let ledger: SyncDoc<LedgerFile> = SyncDoc::open(data_dir.join("tickets.json"));
        let open = ledger.update(|l| {
            l.rebuild_index();
            l.open_index.values().map(|s| s.len()).sum::<usize>()
        })?;
        info!(open_tickets = open, "ticket ledger loaded");

        let control = ControlDoc::open(data_dir.join("control.json"), audience)?;

        Ok(Self {
            ledger,
            control,
            open_cap: tickets.open_cap,
            counter_floor: tickets.counter_floor,
            cut_rate: tickets.cut_rate,
        })
    }

    // --- Creation ---

    /// Create a ticket, enforcing the ban list and the per-customer open cap
    /// before allocating an id.
    pub fn create_ticket(
        &self,
        new: NewTicket,
        now: DateTime<Utc>,
    ) -> Result<TicketRecord, CreateError> {
        if self.control.is_banned(new.chat_id) {
            return Err(CreateError::Banned(new.chat_id));
        }

        let cap = self.open_cap;
        let floor = self.counter_floor;
        let created = self.ledger.update(|ledger| {
            let open = ledger.open_for(new.chat_id).len();
            if open >= cap {
                return Err(CreateError::OpenCapReached { open, cap });
            }

            let id = ledger.next_id(floor);
            let record = TicketRecord {
                id,
                chat_id: new.chat_id,
                service: new.service,
                category: new.category,
                answers: new.answers,
                customer_tag: new.customer_tag,
                customer_name: new.customer_name,
                status: TicketStatus::Open,
                created_at: now,
                assigned_admin: None,
                assigned_alias: None,
                assigned_at: None,
                admin_messages: Vec::new(),
                log_requested: false,
                log_provided_by: None,
                log_provided_at: None,
                paid: false,
                closure: None,
            };
            ledger.open_index.entry(record.chat_id).or_default().insert(id);
            ledger.tickets.insert(id.0, record.clone());
            Ok(record)
        })??;

        info!(ticket = %created.id, chat_id = %created.chat_id, service = %created.service, "ticket created");
        Ok(created)
    }

    // --- Assignment ---

    /// First accept wins. Re-accepting by the same worker is idempotent-ok;
    /// a different worker is rejected with the current assignee.
    pub fn assign_ticket(
        &self,
        id: TicketId,
        worker: ChatId,
        alias: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Assigned, AssignError> {
        let assigned = self.ledger.update(|ledger| {
            let ticket = ledger.get_mut(id).ok_or(AssignError::NotFound(id))?;
            if !ticket.is_open() {
                return Err(AssignError::Closed(id));
            }
            match ticket.assigned_admin {
                Some(current) if current == worker => Ok(Assigned {
                    ticket: ticket.clone(),
                    newly_assigned: false,
                }),
                Some(current) => Err(AssignError::Assigned {
                    to: current,
                    alias: ticket.assigned_alias.clone(),
                }),
                None => {
                    ticket.assigned_admin = Some(worker);
                    ticket.assigned_alias = alias;
                    ticket.assigned_at = Some(now);
                    Ok(Assigned {
                        ticket: ticket.clone(),
                        newly_assigned: true,
                    })
                }
            }
        })??;

        if assigned.newly_assigned {
            info!(ticket = %id, worker = %worker, "ticket assigned");
        }
        Ok(assigned)
    }

    // --- Notification correlation ---

    /// Record an outbound notification copy against the ticket.
    pub fn record_notice(&self, id: TicketId, sent: MessageRef) -> Result<(), WorkflowError> {
        self.ledger.update(|ledger| {
            let ticket = ledger.get_mut(id).ok_or(WorkflowError::NotFound(id))?;
            ticket.admin_messages.push(sent);
            Ok(())
        })?
    }

    /// Replace the recorded notification copies, e.g. after deleting the
    /// losers' copies post-assignment.
    pub fn replace_notices(
        &self,
        id: TicketId,
        keep: Vec<MessageRef>,
    ) -> Result<(), WorkflowError> {
        self.ledger.update(|ledger| {
            let ticket = ledger.get_mut(id).ok_or(WorkflowError::NotFound(id))?;
            ticket.admin_messages = keep;
            Ok(())
        })?
    }

    /// Resolve a reply to a recorded notification copy back to its ticket.
    pub fn find_by_notice(&self, target: MessageRef) -> Option<TicketRecord> {
        self.ledger.read(|ledger| {
            ledger
                .tickets
                .values()
                .find(|t| t.admin_messages.contains(&target))
                .cloned()
        })
    }

    // --- Closure ---

    /// Close a ticket. Terminal: a second close attempt reports
    /// [`CloseOutcome::AlreadyClosed`] and changes nothing.
    pub fn close_ticket(
        &self,
        id: TicketId,
        request: CloseRequest,
        now: DateTime<Utc>,
    ) -> Result<CloseOutcome, CloseError> {
        let cut_rate = self.cut_rate;
        let outcome = self.ledger.update(|ledger| -> Result<CloseOutcome, CloseError> {
            let ticket = ledger.get_mut(id).ok_or(CloseError::NotFound(id))?;
            if !ticket.is_open() {
                return Ok(CloseOutcome::AlreadyClosed(ticket.clone()));
            }

            let profit = request.profit.unwrap_or(0.0);
            let cut = match request.kind {
                CloseKind::Completed => profit * cut_rate,
                CloseKind::Manual | CloseKind::Banned => 0.0,
            };
            ticket.status = TicketStatus::Closed;
            ticket.closure = Some(Closure {
                kind: request.kind,
                closed_by: request.closed_by,
                profit,
                cut,
                remarks: request.remarks,
                closed_at: now,
            });

            let chat = ticket.chat_id;
            let record = ticket.clone();
            if let Some(set) = ledger.open_index.get_mut(&chat) {
                set.remove(&id);
                if set.is_empty() {
                    ledger.open_index.remove(&chat);
                }
            }
            Ok(CloseOutcome::Closed(record))
        })??;

        if let CloseOutcome::Closed(record) = &outcome {
            info!(ticket = %id, kind = ?record.closure.as_ref().map(|c| c.kind), "ticket closed");
        }
        Ok(outcome)
    }

    // --- Log / payment workflow ---

    /// Mark the log as requested. Only the assigned worker may request.
    pub fn request_log(&self, id: TicketId, worker: ChatId) -> Result<TicketRecord, WorkflowError> {
        self.ledger.update(|ledger| {
            let ticket = ledger.get_mut(id).ok_or(WorkflowError::NotFound(id))?;
            if !ticket.is_open() {
                return Err(WorkflowError::Closed(id));
            }
            match ticket.assigned_admin {
                None => Err(WorkflowError::Unassigned(id)),
                Some(assignee) if assignee != worker => Err(WorkflowError::NotAssignee {
                    ticket: id,
                    chat: worker,
                }),
                Some(_) => {
                    ticket.log_requested = true;
                    Ok(ticket.clone())
                }
            }
        })?
    }

    /// Record log provision. Requires an existing worker assignment; the
    /// caller delivers the text to the assigned worker.
    pub fn provide_log(
        &self,
        id: TicketId,
        provider_name: &str,
        now: DateTime<Utc>,
    ) -> Result<TicketRecord, WorkflowError> {
        self.ledger.update(|ledger| {
            let ticket = ledger.get_mut(id).ok_or(WorkflowError::NotFound(id))?;
            if ticket.assigned_admin.is_none() {
                return Err(WorkflowError::Unassigned(id));
            }
            ticket.log_provided_by = Some(provider_name.to_string());
            ticket.log_provided_at = Some(now);
            Ok(ticket.clone())
        })?
    }

    /// Mark paid. The assigned worker only, or any worker while unassigned.
    pub fn mark_paid(&self, id: TicketId, worker: ChatId) -> Result<TicketRecord, WorkflowError> {
        self.ledger.update(|ledger| {
            let ticket = ledger.get_mut(id).ok_or(WorkflowError::NotFound(id))?;
            if let Some(assignee) = ticket.assigned_admin {
                if assignee != worker {
                    return Err(WorkflowError::NotAssignee {
                        ticket: id,
                        chat: worker,
                    });
                }
            }
            ticket.paid = true;
            Ok(ticket.clone())
        })?
    }

    // --- Ban handling ---

    /// Ban a customer and force-close all their open tickets as a batch.
    /// Returns the tickets that were closed by the cascade.
    pub fn ban(
        &self,
        chat: ChatId,
        by: ChatId,
        now: DateTime<Utc>,
    ) -> Result<Vec<TicketRecord>, TesseraError> {
        self.control.ban(chat)?;

        let open: Vec<TicketId> = self.ledger.read(|l| l.open_for(chat));
        let mut closed = Vec::with_capacity(open.len());
        for id in open {
            let request = CloseRequest {
                kind: CloseKind::Banned,
                closed_by: Some(by),
                profit: None,
                remarks: None,
            };
            match self.close_ticket(id, request, now) {
                Ok(CloseOutcome::Closed(record)) => closed.push(record),
                Ok(CloseOutcome::AlreadyClosed(_)) => {}
                Err(CloseError::NotFound(_)) => {}
                Err(CloseError::Storage(e)) => return Err(e),
            }
        }
        info!(chat_id = %chat, closed = closed.len(), "customer banned");
        Ok(closed)
    }

    pub fn unban(&self, chat: ChatId) -> Result<bool, TesseraError> {
        self.control.unban(chat)
    }

    pub fn is_banned(&self, chat: ChatId) -> bool {
        self.control.is_banned(chat)
    }

    // --- Aliases ---

    pub fn alias_for(&self, chat: ChatId) -> Option<String> {
        self.control.alias_for(chat)
    }

    pub fn set_alias(&self, chat: ChatId, alias: &str) -> Result<(), TesseraError> {
        self.control.set_alias(chat, alias)
    }

    // --- Queries ---

    pub fn get(&self, id: TicketId) -> Option<TicketRecord> {
        self.ledger.read(|l| l.get(id).cloned())
    }

    /// Open tickets for one customer, oldest first.
    pub fn open_for(&self, chat: ChatId) -> Vec<TicketRecord> {
        self.ledger.read(|l| {
            l.open_for(chat)
                .into_iter()
                .filter_map(|id| l.get(id).cloned())
                .collect()
        })
    }

    /// All open tickets, oldest first.
    pub fn all_open(&self) -> Vec<TicketRecord> {
        self.ledger.read(|l| {
            l.tickets
                .values()
                .filter(|t| t.is_open())
                .cloned()
                .collect()
        })
    }

    /// Open tickets nobody has accepted yet, oldest first.
    pub fn unassigned_open(&self) -> Vec<TicketRecord> {
        self.ledger.read(|l| {
            l.tickets
                .values()
                .filter(|t| t.is_open() && t.assigned_admin.is_none())
                .cloned()
                .collect()
        })
    }

    /// The most recently completed closes, newest first, at most `limit`.
    pub fn recent_completed(&self, limit: usize) -> Vec<TicketRecord> {
        self.ledger.read(|l| {
            let mut closed: Vec<TicketRecord> = l
                .tickets
                .values()
                .filter(|t| {
                    t.closure
                        .as_ref()
                        .is_some_and(|c| c.kind == CloseKind::Completed)
                })
                .cloned()
                .collect();
            closed.sort_by_key(|t| {
                std::cmp::Reverse(t.closure.as_ref().map(|c| c.closed_at))
            });
            closed.truncate(limit);
            closed
        })
    }

    /// Fold the whole ledger into report aggregates.
    pub fn summarize(&self) -> ReportSummary {
        self.ledger.read(|l| {
            let mut summary = ReportSummary::default();
            for ticket in l.tickets.values() {
                summary.total += 1;
                match &ticket.closure {
                    None => summary.open += 1,
                    Some(closure) => {
                        match closure.kind {
                            CloseKind::Completed => summary.closed_completed += 1,
                            CloseKind::Manual => summary.closed_manual += 1,
                            CloseKind::Banned => summary.closed_banned += 1,
                        }
                        summary.profit_total += closure.profit;
                        summary.cut_total += closure.cut;
                    }
                }
            }
            summary
        })
    }
}
