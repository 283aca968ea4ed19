// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tessera concierge bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_core::ChatId;

/// Top-level Tessera configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values;
/// only the Telegram bot token has no usable default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TesseraConfig {
    /// Bot identity and transport settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Privileged chat audiences (workers, log providers) and seed state.
    #[serde(default)]
    pub audience: AudienceConfig,

    /// On-disk state location and flush tuning.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session and dialogue timeout settings.
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Ticket lifecycle settings.
    #[serde(default)]
    pub tickets: TicketConfig,

    /// Sliding-window ticket-creation rate limit.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Order-flow tuning (promotional subtotal band).
    #[serde(default)]
    pub order: OrderConfig,

    /// Logging settings.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Bot identity and transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Primary (food) bot token. `None` is a fatal startup error for `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Flight bot token. `None` disables the flight bot instance.
    #[serde(default)]
    pub flight_bot_token: Option<String>,

    /// Hotel bot token. `None` disables the hotel bot instance.
    #[serde(default)]
    pub hotel_bot_token: Option<String>,

    /// Public usernames used to render cross-bot quick links.
    #[serde(default)]
    pub food_username: Option<String>,
    #[serde(default)]
    pub flight_username: Option<String>,
    #[serde(default)]
    pub hotel_username: Option<String>,

    /// Logo image attached to the home screen; plain text when unset or unsendable.
    #[serde(default)]
    pub logo_path: Option<String>,

    /// Deadline for every outbound transport call, in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            flight_bot_token: None,
            hotel_bot_token: None,
            food_username: None,
            flight_username: None,
            hotel_username: None,
            logo_path: None,
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

fn default_send_timeout_secs() -> u64 {
    10
}

/// Privileged chat audiences and operator seed state.
///
/// Aliases and the banned set are runtime-mutable; the values here only seed
/// the control state on first run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AudienceConfig {
    /// Worker chats receiving ticket fan-out. Must be non-empty for `serve`.
    #[serde(default)]
    pub worker_chat_ids: Vec<i64>,

    /// Log-provider chats.
    #[serde(default)]
    pub log_chat_ids: Vec<i64>,

    /// Chats denied all interaction (seed value).
    #[serde(default)]
    pub banned_chat_ids: Vec<i64>,

    /// Worker display aliases keyed by chat id (seed value).
    /// TOML requires string keys; ids are parsed at lookup time.
    #[serde(default)]
    pub worker_aliases: BTreeMap<String, String>,
}

impl AudienceConfig {
    pub fn is_worker(&self, chat: ChatId) -> bool {
        self.worker_chat_ids.contains(&chat.0)
    }

    pub fn is_log_provider(&self, chat: ChatId) -> bool {
        self.log_chat_ids.contains(&chat.0)
    }

    /// Seed alias for a worker chat, if configured.
    pub fn alias_for(&self, chat: ChatId) -> Option<&str> {
        self.worker_aliases
            .get(&chat.0.to_string())
            .map(String::as_str)
            .filter(|a| !a.trim().is_empty())
    }
}

/// On-disk state configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding `users.json`, `sessions.json`, `tickets.json`,
    /// `control.json` and their `.bak` siblings.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Debounce window for coalescing table flushes, in milliseconds.
    #[serde(default = "default_flush_debounce_ms")]
    pub flush_debounce_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            flush_debounce_ms: default_flush_debounce_ms(),
        }
    }
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("tessera"))
        .unwrap_or_else(|| std::path::PathBuf::from("data"))
        .to_string_lossy()
        .into_owned()
}

fn default_flush_debounce_ms() -> u64 {
    250
}

/// Session and dialogue timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Absolute inactivity TTL for persisted profile/order sessions, minutes.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,

    /// Inactivity timeout for in-memory service question dialogues, minutes.
    /// Zero disables the dialogue timer.
    #[serde(default = "default_dialog_timeout_minutes")]
    pub dialog_timeout_minutes: f64,

    /// Cadence of the expired-session sweep, seconds.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            dialog_timeout_minutes: default_dialog_timeout_minutes(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

fn default_ttl_minutes() -> u64 {
    30
}

fn default_dialog_timeout_minutes() -> f64 {
    15.0
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

/// Ticket lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TicketConfig {
    /// Maximum concurrently open tickets per customer.
    #[serde(default = "default_open_cap")]
    pub open_cap: usize,

    /// Ticket numbering starts above this floor on a fresh data directory.
    #[serde(default = "default_counter_floor")]
    pub counter_floor: u64,

    /// Share of reported profit attributed to the log provider on close.
    #[serde(default = "default_cut_rate")]
    pub cut_rate: f64,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            open_cap: default_open_cap(),
            counter_floor: default_counter_floor(),
            cut_rate: default_cut_rate(),
        }
    }
}

fn default_open_cap() -> usize {
    4
}

fn default_counter_floor() -> u64 {
    60
}

fn default_cut_rate() -> f64 {
    0.25
}

/// Sliding-window rate limit on ticket creation.
/// Setting either field to zero disables the limiter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_window_minutes")]
    pub window_minutes: f64,

    #[serde(default = "default_rate_max_tickets")]
    pub max_tickets: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_rate_window_minutes(),
            max_tickets: default_rate_max_tickets(),
        }
    }
}

fn default_rate_window_minutes() -> f64 {
    30.0
}

fn default_rate_max_tickets() -> usize {
    2
}

/// Order-flow configuration: the promotional subtotal band.
///
/// The band is global across categories; it mirrors a promotion's
/// minimum/maximum, not general validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrderConfig {
    #[serde(default = "default_subtotal_min")]
    pub subtotal_min: f64,

    #[serde(default = "default_subtotal_max")]
    pub subtotal_max: f64,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            subtotal_min: default_subtotal_min(),
            subtotal_max: default_subtotal_max(),
        }
    }
}

fn default_subtotal_min() -> f64 {
    40.0
}

fn default_subtotal_max() -> f64 {
    100.0
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
