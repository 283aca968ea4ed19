// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tessera.toml` > `~/.config/tessera/tessera.toml` > `/etc/tessera/tessera.toml`
//! with environment variable overrides via `TESSERA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::TesseraConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tessera/tessera.toml` (system-wide)
/// 3. `~/.config/tessera/tessera.toml` (user XDG config)
/// 4. `./tessera.toml` (local directory)
/// 5. `TESSERA_*` environment variables
pub fn load_config() -> Result<TesseraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TesseraConfig::default()))
        .merge(Toml::file("/etc/tessera/tessera.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tessera/tessera.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tessera.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<TesseraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TesseraConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TesseraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TesseraConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `TESSERA_TELEGRAM_BOT_TOKEN` must
/// map to `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("TESSERA_").map(|key| {
        // `key` is the env var name with prefix stripped; figment lowercases it
        // only after mapping, so lowercase here before matching section names.
        // Example: TESSERA_TELEGRAM_BOT_TOKEN -> "telegram_bot_token"
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = key_str
            .replacen("telegram_", "telegram.", 1)
            .replacen("audience_", "audience.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("sessions_", "sessions.", 1)
            .replacen("tickets_", "tickets.", 1)
            .replacen("rate_limit_", "rate_limit.", 1)
            .replacen("order_", "order.", 1)
            .replacen("agent_", "agent.", 1);
        mapped.into()
    })
}
