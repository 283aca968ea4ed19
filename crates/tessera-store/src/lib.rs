// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable JSON document storage for the Tessera concierge bot.
//!
//! All state lives in small JSON documents under one data directory. Writes
//! are atomic (temp file + rename) with a day-stamped `.bak` refreshed before
//! the first write of each day. Two persistence modes are provided:
//!
//! - [`SyncDoc`]: every update hits disk before the caller proceeds. Used for
//!   the ticket ledger and operator control state.
//! - [`DebouncedDoc`]: updates are coalesced and flushed by one background
//!   task per document. Used for session and profile tables.

pub mod debounce;
pub mod doc;
pub mod file;

pub use debounce::DebouncedDoc;
pub use doc::SyncDoc;
pub use file::{backup_path, load_tolerant, write_json_atomic};
