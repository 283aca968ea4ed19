// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tessera concierge bot.

use thiserror::Error;

/// The primary error type used across all Tessera crates.
#[derive(Debug, Error)]
pub enum TesseraError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence errors (file read/write failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging transport errors (send/edit/delete failure, malformed update).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An outbound call exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TesseraError {
    /// Wraps an arbitrary error as a storage error.
    pub fn storage<E: std::error::Error + Send + Sync + 'static>(source: E) -> Self {
        TesseraError::Storage {
            source: Box::new(source),
        }
    }

    /// Builds a transport error from a message alone.
    pub fn transport(message: impl Into<String>) -> Self {
        TesseraError::Transport {
            message: message.into(),
            source: None,
        }
    }
}
