// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential question dialogues for the flight and hotel services.
//!
//! Unlike the food order flow these are straight-line forms: ask each
//! scripted question in order, collect the answers, hand the finished set
//! back for ticket creation. Dialogue timeouts are generation-stamped: a
//! timer only kills the dialogue it was scheduled against, never one the
//! customer has since refreshed.

use std::collections::HashMap;
use std::sync::Mutex;

use tessera_core::{ChatId, OutboundMessage, ServiceKind};
use tessera_flow::script::script_for;
use tracing::debug;

struct ScriptDialog {
    service: ServiceKind,
    index: usize,
    answers: Vec<(String, String)>,
    generation: u64,
}

/// Result of feeding one customer message to the runner.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    /// Send this and wait for the next answer.
    Prompt(OutboundMessage),
    /// All questions answered; create the ticket from these.
    Complete {
        service: ServiceKind,
        answers: Vec<(String, String)>,
    },
    /// No dialogue in progress for this chat.
    NotActive,
}

#[derive(Default)]
pub struct ScriptRunner {
    dialogs: Mutex<HashMap<ChatId, ScriptDialog>>,
    next_generation: Mutex<u64>,
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_generation(&self) -> u64 {
        let mut next = self.next_generation.lock().expect("generation lock poisoned");
        *next += 1;
        *next
    }

    /// Begin (or restart) the dialogue, returning the first question and the
    /// generation stamp for the caller's timeout timer.
    pub fn start(&self, chat: ChatId, service: ServiceKind) -> (OutboundMessage, u64) {
        let generation = self.bump_generation();
        let script = script_for(service);
        self.dialogs.lock().expect("dialog lock poisoned").insert(
            chat,
            ScriptDialog {
                service,
                index: 0,
                answers: Vec::new(),
                generation,
            },
        );
        (OutboundMessage::text(script.questions[0].prompt), generation)
    }

    pub fn is_active(&self, chat: ChatId) -> bool {
        self.dialogs
            .lock()
            .expect("dialog lock poisoned")
            .contains_key(&chat)
    }

    pub fn cancel(&self, chat: ChatId) {
        self.dialogs
            .lock()
            .expect("dialog lock poisoned")
            .remove(&chat);
    }

    /// Record one answer. Blank input re-prompts the same question. Each
    /// accepted answer refreshes the generation, invalidating older timers;
    /// the new stamp is returned alongside the prompt.
    pub fn handle_text(&self, chat: ChatId, text: &str) -> (ScriptOutcome, Option<u64>) {
        let mut dialogs = self.dialogs.lock().expect("dialog lock poisoned");
        let Some(dialog) = dialogs.get_mut(&chat) else {
            return (ScriptOutcome::NotActive, None);
        };
        let script = script_for(dialog.service);

        let answer = text.trim();
        if answer.is_empty() {
            let prompt = script.questions[dialog.index].prompt;
            return (
                ScriptOutcome::Prompt(OutboundMessage::text(prompt)),
                Some(dialog.generation),
            );
        }

        let question = &script.questions[dialog.index];
        dialog
            .answers
            .push((question.key.to_string(), answer.to_string()));
        dialog.index += 1;

        if dialog.index >= script.questions.len() {
            let done = dialogs.remove(&chat).expect("dialog present");
            return (
                ScriptOutcome::Complete {
                    service: done.service,
                    answers: done.answers,
                },
                None,
            );
        }

        drop(dialogs);
        let generation = self.bump_generation();
        let mut dialogs = self.dialogs.lock().expect("dialog lock poisoned");
        if let Some(dialog) = dialogs.get_mut(&chat) {
            dialog.generation = generation;
            let prompt = script.questions[dialog.index].prompt;
            (
                ScriptOutcome::Prompt(OutboundMessage::text(prompt)),
                Some(generation),
            )
        } else {
            (ScriptOutcome::NotActive, None)
        }
    }

    /// Drop the dialogue only if `generation` still matches; a stale timer
    /// racing fresh activity is a no-op.
    pub fn expire_if_stale(&self, chat: ChatId, generation: u64) -> bool {
        let mut dialogs = self.dialogs.lock().expect("dialog lock poisoned");
        match dialogs.get(&chat) {
            Some(dialog) if dialog.generation == generation => {
                dialogs.remove(&chat);
                debug!(chat = %chat, "script dialogue expired");
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_through_all_flight_questions() {
        let runner = ScriptRunner::new();
        let chat = ChatId(5);
        let (first, _) = runner.start(chat, ServiceKind::Flight);
        assert!(first.text.contains("Trip Dates"));

        let answers = ["Jun 1-8", "Alice Jones, 1990-01-01", "TX", "450", "Delta"];
        let mut outcome = (ScriptOutcome::NotActive, None);
        for answer in answers {
            outcome = runner.handle_text(chat, answer);
        }
        let ScriptOutcome::Complete { service, answers } = outcome.0 else {
            panic!("expected completion, got {:?}", outcome.0);
        };
        assert_eq!(service, ServiceKind::Flight);
        assert_eq!(answers.len(), 5);
        assert_eq!(answers[0], ("trip_dates".to_string(), "Jun 1-8".to_string()));
        assert!(!runner.is_active(chat));
    }

    #[test]
    fn blank_answer_reprompts_same_question() {
        let runner = ScriptRunner::new();
        let chat = ChatId(5);
        runner.start(chat, ServiceKind::Hotel);
        let (outcome, _) = runner.handle_text(chat, "   ");
        let ScriptOutcome::Prompt(prompt) = outcome else {
            panic!("expected prompt");
        };
        assert!(prompt.text.contains("Destination"));
    }

    #[test]
    fn stale_timer_does_not_kill_refreshed_dialog() {
        let runner = ScriptRunner::new();
        let chat = ChatId(5);
        let (_, stale_generation) = runner.start(chat, ServiceKind::Hotel);

        // Fresh activity bumps the generation.
        let (_, fresh_generation) = runner.handle_text(chat, "Miami");
        assert_ne!(Some(stale_generation), fresh_generation);

        assert!(!runner.expire_if_stale(chat, stale_generation));
        assert!(runner.is_active(chat));

        assert!(runner.expire_if_stale(chat, fresh_generation.unwrap()));
        assert!(!runner.is_active(chat));
    }

    #[test]
    fn restart_resets_progress() {
        let runner = ScriptRunner::new();
        let chat = ChatId(5);
        runner.start(chat, ServiceKind::Hotel);
        runner.handle_text(chat, "Miami");
        let (first, _) = runner.start(chat, ServiceKind::Hotel);
        assert!(first.text.contains("Destination"));
    }
}
