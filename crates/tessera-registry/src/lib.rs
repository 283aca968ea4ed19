// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket registry and lifecycle manager for the Tessera concierge bot.
//!
//! Tracks ticket creation, first-accept-wins assignment, log/payment
//! workflow flags, and terminal closure. The synchronously persisted ledger
//! is authoritative across restarts; the per-customer open index is derived
//! from it on open. Also hosts the sliding-window creation rate limiter and
//! the runtime-mutable operator state (bans, aliases).

pub mod control;
pub mod error;
pub mod rate;
pub mod registry;
pub mod ticket;

pub use control::{ControlDoc, ControlState};
pub use error::{AssignError, CloseError, CreateError, WorkflowError};
pub use rate::{RateDecision, RateLimiter};
pub use registry::{Assigned, CloseOutcome, CloseRequest, NewTicket, Registry};
pub use ticket::{CloseKind, Closure, LedgerFile, ReportSummary, TicketRecord, TicketStatus};
