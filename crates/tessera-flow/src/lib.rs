// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer-facing order intake: the dialogue state machine, navigation
//! stack, profiles with saved addresses, and per-service question scripts.

pub mod engine;
pub mod input;
pub mod profile;
pub mod screens;
pub mod script;
pub mod session;
pub mod state;

pub use engine::{FlowEngine, FlowOutcome, OrderDraft};
pub use input::{check_subtotal, detect_escape, parse_subtotal, Escape, SubtotalVerdict};
pub use profile::{Address, Profile, ProfileTable, ADDRESS_CAP};
pub use script::{script_for, service_summary, ServiceScript};
pub use session::{SessionRecord, SessionTable, NAV_MAX};
pub use state::{FlowState, Screen};
