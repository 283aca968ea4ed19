// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Free-text input normalization: escapes, trimming, and subtotal parsing.

use std::sync::OnceLock;

use regex::Regex;
use tessera_config::model::OrderConfig;

/// Universal escape inputs every state handler checks before its own input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// Clear the session and render the root screen.
    Home,
    /// Pop the nav stack and re-render the previous screen.
    Back,
    /// Context-specific abort; default behavior clears the session.
    Cancel,
}

/// Strip a leading pictograph from a button label, e.g. `"🏠 Home"` -> `"Home"`.
pub fn strip_button_label(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.split_once(' ') {
        Some((first, rest)) if first.chars().all(|c| !c.is_ascii()) && !rest.is_empty() => {
            rest.trim()
        }
        _ => trimmed,
    }
}

/// Detect a universal escape, tolerant of button pictographs and case.
pub fn detect_escape(text: &str) -> Option<Escape> {
    match strip_button_label(text).to_lowercase().as_str() {
        "home" => Some(Escape::Home),
        "back" => Some(Escape::Back),
        "cancel" => Some(Escape::Cancel),
        _ => None,
    }
}

/// Trim free text; `None` means the state must re-prompt, never advance.
pub fn clean_text(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// Shorten display text, ellipsizing past `max_len`.
pub fn short_text(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        return value.to_string();
    }
    let cut: String = value.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

fn subtotal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(\.\d+)?)").expect("static regex"))
}

/// Extract the first decimal number from the text, stripping thousands
/// separators first. `"$1,234.50 please"` parses as `1234.50`.
pub fn parse_subtotal(text: &str) -> Option<f64> {
    let stripped = text.replace(',', "");
    let captures = subtotal_regex().captures(&stripped)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Verdict of checking a parsed subtotal against the promotional band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubtotalVerdict {
    Ok(f64),
    BelowMin { value: f64, min: f64 },
    AboveMax { value: f64, max: f64 },
    Unparseable,
}

/// Parse and band-check a subtotal message.
pub fn check_subtotal(text: &str, band: &OrderConfig) -> SubtotalVerdict {
    let Some(value) = parse_subtotal(text) else {
        return SubtotalVerdict::Unparseable;
    };
    if value < band.subtotal_min {
        return SubtotalVerdict::BelowMin {
            value,
            min: band.subtotal_min,
        };
    }
    if value > band.subtotal_max {
        return SubtotalVerdict::AboveMax {
            value,
            max: band.subtotal_max,
        };
    }
    SubtotalVerdict::Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_detection_handles_buttons_and_case() {
        assert_eq!(detect_escape("⬅️ Back"), Some(Escape::Back));
        assert_eq!(detect_escape("back"), Some(Escape::Back));
        assert_eq!(detect_escape("HOME"), Some(Escape::Home));
        assert_eq!(detect_escape("⬅️ Cancel"), Some(Escape::Cancel));
        assert_eq!(detect_escape("❌ Cancel"), Some(Escape::Cancel));
        assert_eq!(detect_escape("backspace"), None);
        assert_eq!(detect_escape("55"), None);
    }

    #[test]
    fn strip_button_label_keeps_plain_text() {
        assert_eq!(strip_button_label("🏠 Home"), "Home");
        assert_eq!(strip_button_label("📍 Other 2"), "Other 2");
        assert_eq!(strip_button_label("Work"), "Work");
        assert_eq!(strip_button_label("  plain words here  "), "plain words here");
    }

    #[test]
    fn clean_text_rejects_blank() {
        assert_eq!(clean_text("  hi  "), Some("hi"));
        assert_eq!(clean_text("   "), None);
        assert_eq!(clean_text(""), None);
    }

    #[test]
    fn subtotal_parses_first_number() {
        assert_eq!(parse_subtotal("55"), Some(55.0));
        assert_eq!(parse_subtotal("$55"), Some(55.0));
        assert_eq!(parse_subtotal("around 62.50 I think"), Some(62.5));
        assert_eq!(parse_subtotal("$1,234.50"), Some(1234.5));
        assert_eq!(parse_subtotal("no numbers"), None);
        assert_eq!(parse_subtotal(""), None);
    }

    #[test]
    fn band_check_matches_promotion() {
        let band = OrderConfig::default(); // 40..=100
        assert_eq!(check_subtotal("65", &band), SubtotalVerdict::Ok(65.0));
        assert_eq!(
            check_subtotal("35", &band),
            SubtotalVerdict::BelowMin { value: 35.0, min: 40.0 }
        );
        assert_eq!(
            check_subtotal("150", &band),
            SubtotalVerdict::AboveMax { value: 150.0, max: 100.0 }
        );
        assert_eq!(check_subtotal("hmm", &band), SubtotalVerdict::Unparseable);
    }

    #[test]
    fn band_boundaries_are_inclusive() {
        let band = OrderConfig::default();
        assert_eq!(check_subtotal("40", &band), SubtotalVerdict::Ok(40.0));
        assert_eq!(check_subtotal("100", &band), SubtotalVerdict::Ok(100.0));
    }

    #[test]
    fn short_text_ellipsizes() {
        assert_eq!(short_text("short", 40), "short");
        let long = "a".repeat(50);
        let shortened = short_text(&long, 40);
        assert!(shortened.ends_with("..."));
        assert!(shortened.chars().count() <= 40);
    }
}
