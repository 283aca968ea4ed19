// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup diagnostics for configuration failures.
//!
//! Tessera's config is a flat set of known sections, so figment errors fold
//! into a small set of [`ConfigError`] shapes: an unrecognized key inside a
//! section (with a typo suggestion and a span onto the offending TOML line),
//! a wrongly typed value, or a semantic validation failure. Rendering goes
//! through miette's graphical handler.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler floor below which a lookalike key is not worth suggesting.
/// 0.75 catches one-letter slips like `opn_cap` or `bot_tken` without
/// surfacing unrelated keys.
const LOOKALIKE_FLOOR: f64 = 0.75;

/// A configuration failure ready for miette rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key the section's model does not define.
    #[error("unrecognized configuration key `{key}` in {}", section_label(section.as_deref()))]
    #[diagnostic(
        code(tessera::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), known_keys))
    )]
    UnknownKey {
        key: String,
        /// The TOML section the key appeared under, if any.
        section: Option<String>,
        /// Lookalike correction, when one clears the similarity floor.
        suggestion: Option<String>,
        /// Comma-separated keys the section accepts.
        known_keys: String,
        #[label("no such key here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value whose TOML type does not match the model.
    #[error("`{key}` has the wrong type: expected {expected}, found {found}")]
    #[diagnostic(
        code(tessera::config::invalid_value),
        help("change the value of `{key}` in your tessera.toml")
    )]
    InvalidValue {
        key: String,
        expected: String,
        found: String,
    },

    /// A semantic constraint the deserialized values violate.
    #[error("validation error: {message}")]
    #[diagnostic(code(tessera::config::validation))]
    Validation { message: String },

    /// Anything figment reports that has no richer shape here.
    #[error("configuration error: {0}")]
    #[diagnostic(code(tessera::config::other))]
    Other(String),
}

fn section_label(section: Option<&str>) -> String {
    match section {
        Some(name) => format!("[{name}]"),
        None => "the top level".to_string(),
    }
}

fn unknown_key_help(suggestion: Option<&str>, known_keys: &str) -> String {
    match suggestion {
        Some(fix) => format!("did you mean `{fix}`? This section accepts: {known_keys}"),
        None => format!("this section accepts: {known_keys}"),
    }
}

/// Fold a figment error (which may bundle several failures) into renderable
/// [`ConfigError`]s, resolving source spans against the given TOML sources.
pub fn errors_from_figment(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, accepted) => {
                let section = error.path.first().map(|p| p.to_string());
                let known: Vec<&str> = accepted.to_vec();
                let (span, src) =
                    locate_in_sources(toml_sources, &error, section.as_deref(), field);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: closest_key(field, &known),
                    known_keys: known.join(", "),
                    section,
                    span,
                    src,
                }
            }
            Kind::InvalidType(found, expected) => ConfigError::InvalidValue {
                key: error
                    .path
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join("."),
                expected: expected.to_string(),
                found: found.to_string(),
            },
            // Every tessera field has a compiled default, so MissingField and
            // the rest only appear for malformed TOML; the plain message is
            // enough there.
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Resolve a span for `key` in whichever source the error came from, or in
/// any loaded source when figment carries no file metadata (inline TOML).
fn locate_in_sources(
    sources: &[(String, String)],
    error: &figment::Error,
    section: Option<&str>,
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let from_file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    for (path, content) in sources {
        if from_file.as_ref().is_some_and(|f| f != path) {
            continue;
        }
        if let Some(offset) = key_offset(content, section, key) {
            return (
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(path, content.clone())),
            );
        }
    }
    (None, None)
}

/// Byte offset of `key` within its TOML section.
///
/// The scan tracks section headers line by line, so a key sitting under a
/// different `[header]` never matches; `section = None` matches only keys
/// before the first header.
pub fn key_offset(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut in_section = section.is_none();
    let mut pos = 0;
    for line in content.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix('[') {
            let header = rest.split(']').next().unwrap_or(rest).trim();
            in_section = section == Some(header);
        } else if in_section {
            if let Some(after) = trimmed.strip_prefix(key) {
                if after.trim_start().starts_with('=') {
                    return Some(pos + (line.len() - trimmed.len()));
                }
            }
        }
        pos += line.len() + 1;
    }
    None
}

/// The accepted key most similar to `unknown`, if any clears the floor.
pub fn closest_key(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|candidate| (strsim::jaro_winkler(unknown, candidate), *candidate))
        .filter(|(score, _)| *score > LOOKALIKE_FLOOR)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

fn render_one(error: &ConfigError) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    if handler.render_report(&mut out, error).is_err() {
        out = format!("Error: {error}\n");
    }
    out
}

/// Print every error to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprint!("{}", render_one(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookalike_keys_are_suggested() {
        let known = &["open_cap", "counter_floor", "cut_rate"];
        assert_eq!(closest_key("opn_cap", known), Some("open_cap".to_string()));
        assert_eq!(closest_key("cut_rte", known), Some("cut_rate".to_string()));
        assert_eq!(closest_key("zzzzzz", known), None);
    }

    #[test]
    fn key_offset_respects_section_boundaries() {
        let content = "[storage]\nflush_debounce_ms = 10\n\n[tickets]\nopen_cap = 4\n";

        let offset = key_offset(content, Some("tickets"), "open_cap").unwrap();
        assert_eq!(&content[offset..offset + 8], "open_cap");

        // The key exists in the file but not under [storage].
        assert_eq!(key_offset(content, Some("storage"), "open_cap"), None);
        assert_eq!(key_offset(content, Some("tickets"), "flush_debounce_ms"), None);
    }

    #[test]
    fn top_level_keys_only_match_before_the_first_header() {
        let content = "stray = 1\n[tickets]\nopen_cap = 4\n";
        assert!(key_offset(content, None, "stray").is_some());
        assert_eq!(key_offset(content, None, "open_cap"), None);
    }

    #[test]
    fn key_prefixes_do_not_match() {
        let content = "[tickets]\nopen_cap_extra = 4\n";
        assert_eq!(key_offset(content, Some("tickets"), "open_cap"), None);
    }

    #[test]
    fn rendered_unknown_key_carries_the_suggestion() {
        let error = ConfigError::UnknownKey {
            key: "opn_cap".to_string(),
            section: Some("tickets".to_string()),
            suggestion: Some("open_cap".to_string()),
            known_keys: "open_cap, counter_floor, cut_rate".to_string(),
            span: None,
            src: None,
        };
        let report = render_one(&error);
        assert!(report.contains("opn_cap"));
        assert!(report.contains("did you mean `open_cap`?"));
    }
}
