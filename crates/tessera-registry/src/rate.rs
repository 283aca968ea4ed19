// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window rate limiter for ticket creation.
//!
//! In-memory only; history does not survive a restart. Timestamps are pruned
//! lazily to the window on each check.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tessera_core::ChatId;
use tessera_config::model::RateLimitConfig;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Rejected; `retry_after` is the time until the oldest entry leaves the
    /// window.
    Limited { retry_after: Duration },
}

/// Per-customer sliding window over ticket-creation timestamps.
pub struct RateLimiter {
    window: chrono::Duration,
    max: usize,
    history: Mutex<HashMap<ChatId, VecDeque<DateTime<Utc>>>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let window_secs = (config.window_minutes * 60.0).max(0.0) as i64;
        Self {
            window: chrono::Duration::seconds(window_secs),
            max: config.max_tickets,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// True when either knob is zero, which disables the limiter entirely.
    fn disabled(&self) -> bool {
        self.max == 0 || self.window.is_zero()
    }

    /// Check the window for `chat` at `now`, recording the attempt if allowed.
    pub fn check_and_record(&self, chat: ChatId, now: DateTime<Utc>) -> RateDecision {
        if self.disabled() {
            return RateDecision::Allowed;
        }

        let mut history = self.history.lock().expect("rate history lock poisoned");
        let stamps = history.entry(chat).or_default();

        let cutoff = now - self.window;
        while stamps.front().is_some_and(|&t| t <= cutoff) {
            stamps.pop_front();
        }

        if stamps.len() >= self.max {
            // Oldest surviving stamp expires first.
            let oldest = *stamps.front().expect("non-empty window");
            let retry_after = (oldest + self.window - now)
                .to_std()
                .unwrap_or(Duration::ZERO);
            return RateDecision::Limited { retry_after };
        }

        stamps.push_back(now);
        RateDecision::Allowed
    }

    /// Drop a customer's history, e.g. on unban.
    pub fn forget(&self, chat: ChatId) {
        self.history
            .lock()
            .expect("rate history lock poisoned")
            .remove(&chat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn limiter(window_minutes: f64, max_tickets: usize) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            window_minutes,
            max_tickets,
        })
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn two_allowed_third_limited_within_window() {
        let rate = limiter(30.0, 2);
        let chat = ChatId(7);

        assert_eq!(rate.check_and_record(chat, at(0)), RateDecision::Allowed);
        assert_eq!(rate.check_and_record(chat, at(5)), RateDecision::Allowed);

        match rate.check_and_record(chat, at(10)) {
            RateDecision::Limited { retry_after } => {
                // Oldest stamp (12:00) leaves the window at 12:30.
                assert_eq!(retry_after, Duration::from_secs(20 * 60));
            }
            other => panic!("expected Limited, got {other:?}"),
        }
    }

    #[test]
    fn allowed_again_after_window_elapses() {
        let rate = limiter(30.0, 2);
        let chat = ChatId(7);

        assert_eq!(rate.check_and_record(chat, at(0)), RateDecision::Allowed);
        assert_eq!(rate.check_and_record(chat, at(1)), RateDecision::Allowed);
        assert!(matches!(
            rate.check_and_record(chat, at(2)),
            RateDecision::Limited { .. }
        ));

        // 12:31 is past both stamps' windows.
        assert_eq!(rate.check_and_record(chat, at(31)), RateDecision::Allowed);
    }

    #[test]
    fn customers_are_independent() {
        let rate = limiter(30.0, 1);
        assert_eq!(
            rate.check_and_record(ChatId(1), at(0)),
            RateDecision::Allowed
        );
        assert_eq!(
            rate.check_and_record(ChatId(2), at(0)),
            RateDecision::Allowed
        );
        assert!(matches!(
            rate.check_and_record(ChatId(1), at(1)),
            RateDecision::Limited { .. }
        ));
    }

    #[test]
    fn zero_window_disables_limiter() {
        let rate = limiter(0.0, 2);
        for minute in 0..10 {
            assert_eq!(
                rate.check_and_record(ChatId(1), at(minute)),
                RateDecision::Allowed
            );
        }
    }

    #[test]
    fn zero_max_disables_limiter() {
        let rate = limiter(30.0, 0);
        assert_eq!(
            rate.check_and_record(ChatId(1), at(0)),
            RateDecision::Allowed
        );
    }

    #[test]
    fn forget_clears_history() {
        let rate = limiter(30.0, 1);
        assert_eq!(
            rate.check_and_record(ChatId(1), at(0)),
            RateDecision::Allowed
        );
        rate.forget(ChatId(1));
        assert_eq!(
            rate.check_and_record(ChatId(1), at(1)),
            RateDecision::Allowed
        );
    }
}
