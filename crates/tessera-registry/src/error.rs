// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry rejection reasons.
//!
//! Concurrency races (already assigned, already closed) and resource limits
//! are distinct rejection reasons, not exceptions; callers decide the
//! user-facing wording.

use tessera_core::{ChatId, TesseraError, TicketId};
use thiserror::Error;

/// Why a `create_ticket` call was refused.
#[derive(Debug, Error)]
pub enum CreateError {
    #[error("chat {0} is banned")]
    Banned(ChatId),

    #[error("customer already has {open} open tickets (cap {cap})")]
    OpenCapReached { open: usize, cap: usize },

    #[error(transparent)]
    Storage(#[from] TesseraError),
}

/// Why an `assign_ticket` call was refused.
#[derive(Debug, Error)]
pub enum AssignError {
    #[error("ticket {0} not found")]
    NotFound(TicketId),

    #[error("ticket {0} is closed")]
    Closed(TicketId),

    #[error("ticket already assigned to {to}")]
    Assigned {
        to: ChatId,
        alias: Option<String>,
    },

    #[error(transparent)]
    Storage(#[from] TesseraError),
}

/// Why a log / payment workflow call was refused.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("ticket {0} not found")]
    NotFound(TicketId),

    #[error("ticket {0} is closed")]
    Closed(TicketId),

    #[error("ticket {0} has no assigned worker")]
    Unassigned(TicketId),

    #[error("chat {chat} is not the assigned worker for ticket {ticket}")]
    NotAssignee { ticket: TicketId, chat: ChatId },

    #[error(transparent)]
    Storage(#[from] TesseraError),
}

/// Why a `close_ticket` call was refused. Closing an already-closed ticket is
/// not an error; see [`crate::registry::CloseOutcome`].
#[derive(Debug, Error)]
pub enum CloseError {
    #[error("ticket {0} not found")]
    NotFound(TicketId),

    #[error(transparent)]
    Storage(#[from] TesseraError),
}
