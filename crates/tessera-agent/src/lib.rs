// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event routing and operator workflows for the Tessera concierge bot.
//!
//! Ties the order flow, ticket registry, and transports together: customer
//! messages become tickets, tickets fan out to workers, and the worker and
//! log-provider command surfaces run against the ledger.

pub mod agent;
pub mod commands;
pub mod notify;
pub mod relay;
pub mod script_runner;
pub mod transports;
pub mod worker;

pub use agent::Agent;
pub use commands::{
    parse_provider_command, parse_worker_command, ParseError, ProviderCommand, WorkerCommand,
};
pub use script_runner::{ScriptOutcome, ScriptRunner};
pub use transports::TransportMap;
