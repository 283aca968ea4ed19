// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as well-formed chat ids, a sane subtotal band, and a positive cut rate.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::TesseraConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TesseraConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate data_dir is not empty
    if config.storage.data_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.data_dir must not be empty".to_string(),
        });
    }

    // Validate worker alias keys parse as chat ids
    for key in config.audience.worker_aliases.keys() {
        if key.parse::<i64>().is_err() {
            errors.push(ConfigError::Validation {
                message: format!(
                    "audience.worker_aliases key `{key}` is not a valid chat id"
                ),
            });
        }
    }

    // Validate no duplicate worker chat ids
    let mut seen_workers = HashSet::new();
    for id in &config.audience.worker_chat_ids {
        if !seen_workers.insert(id) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate chat id {id} in audience.worker_chat_ids"),
            });
        }
    }

    // Validate the subtotal band is ordered and non-negative
    if config.order.subtotal_min < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "order.subtotal_min must be non-negative, got {}",
                config.order.subtotal_min
            ),
        });
    }
    if config.order.subtotal_max < config.order.subtotal_min {
        errors.push(ConfigError::Validation {
            message: format!(
                "order.subtotal_max ({}) must not be below order.subtotal_min ({})",
                config.order.subtotal_max, config.order.subtotal_min
            ),
        });
    }

    // Validate the cut rate is a sensible fraction
    if !(0.0..=1.0).contains(&config.tickets.cut_rate) {
        errors.push(ConfigError::Validation {
            message: format!(
                "tickets.cut_rate must be between 0.0 and 1.0, got {}",
                config.tickets.cut_rate
            ),
        });
    }

    // Validate open_cap is at least 1
    if config.tickets.open_cap == 0 {
        errors.push(ConfigError::Validation {
            message: "tickets.open_cap must be at least 1".to_string(),
        });
    }

    // Validate the rate-limit window is not negative (zero disables)
    if config.rate_limit.window_minutes < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "rate_limit.window_minutes must be non-negative, got {}",
                config.rate_limit.window_minutes
            ),
        });
    }

    // Validate dialog timeout is not negative (zero disables)
    if config.sessions.dialog_timeout_minutes < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "sessions.dialog_timeout_minutes must be non-negative, got {}",
                config.sessions.dialog_timeout_minutes
            ),
        });
    }

    // Validate the log level parses
    let level = config.agent.log_level.to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level must be one of trace, debug, info, warn, error; got `{}`",
                config.agent.log_level
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = TesseraConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_data_dir_fails_validation() {
        let mut config = TesseraConfig::default();
        config.storage.data_dir = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("data_dir"))));
    }

    #[test]
    fn inverted_subtotal_band_fails_validation() {
        let mut config = TesseraConfig::default();
        config.order.subtotal_min = 100.0;
        config.order.subtotal_max = 40.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("subtotal_max"))));
    }

    #[test]
    fn cut_rate_above_one_fails_validation() {
        let mut config = TesseraConfig::default();
        config.tickets.cut_rate = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("cut_rate"))));
    }

    #[test]
    fn zero_open_cap_fails_validation() {
        let mut config = TesseraConfig::default();
        config.tickets.open_cap = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("open_cap"))));
    }

    #[test]
    fn non_numeric_alias_key_fails_validation() {
        let mut config = TesseraConfig::default();
        config
            .audience
            .worker_aliases
            .insert("not-a-number".to_string(), "Ace".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("worker_aliases"))));
    }

    #[test]
    fn duplicate_worker_ids_fail_validation() {
        let mut config = TesseraConfig::default();
        config.audience.worker_chat_ids = vec![100, 200, 100];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("duplicate chat id"))));
    }

    #[test]
    fn bogus_log_level_fails_validation() {
        let mut config = TesseraConfig::default();
        config.agent.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("log_level"))));
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = TesseraConfig::default();
        config.storage.data_dir = " ".to_string();
        config.tickets.open_cap = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
