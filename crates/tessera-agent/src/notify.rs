// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker notification fan-out and assignment presentation.
//!
//! Every worker receives an independent copy of a new ticket's notice; the
//! outbound message ids are recorded on the ticket as the correlation keys
//! for reply threading. Once someone accepts, the losers' copies are deleted
//! and the winner's copy trades its Accept control for the post-assignment
//! controls (close, ban, log request). All sends here are best-effort: one
//! unreachable worker never blocks the rest.

use std::collections::HashMap;
use std::sync::Mutex;

use tessera_core::{
    Button, ChatId, Keyboard, MessageRef, OutboundMessage, Transport,
};
use tessera_flow::script::service_summary;
use tessera_registry::{Registry, TicketRecord};
use tracing::{debug, warn};

/// The worker-facing notice body for one ticket.
pub fn ticket_notice_text(ticket: &TicketRecord) -> String {
    let mut text = format!(
        "🎫 Ticket {} — {}\nFrom: {}",
        ticket.id,
        ticket.service.label(),
        ticket.customer_tag,
    );
    if let Some(name) = &ticket.customer_name {
        text.push_str(&format!(" ({name})"));
    }
    text.push_str("\n\n");
    text.push_str(&service_summary(ticket.service, &ticket.category, &ticket.answers));
    if ticket.paid {
        text.push_str("\n\n💰 Paid");
    }
    text
}

fn accept_keyboard(ticket: &TicketRecord) -> Keyboard {
    Keyboard::Inline(vec![vec![Button::new(
        format!("✅ Accept {}", ticket.id),
        format!("accept:{}", ticket.id.0),
    )]])
}

/// Controls shown on the winner's copy once the ticket is assigned.
fn assigned_keyboard(ticket: &TicketRecord) -> Keyboard {
    let id = ticket.id.0;
    Keyboard::Inline(vec![
        vec![
            Button::new("🛑 Close ticket", format!("drop:{id}")),
            Button::new("🚫 Ban customer", format!("ban:{id}")),
        ],
        vec![Button::new("📒 Request log", format!("logreq:{id}"))],
    ])
}

/// Send every worker an independent copy of the ticket notice and record
/// each copy against the ticket. Returns how many copies were delivered.
pub async fn fan_out_ticket(
    transport: &dyn Transport,
    registry: &Registry,
    workers: &[ChatId],
    ticket: &TicketRecord,
) -> usize {
    let notice =
        OutboundMessage::text(ticket_notice_text(ticket)).with_keyboard(accept_keyboard(ticket));
    let mut delivered = 0;
    for &worker in workers {
        match transport.send(worker, notice.clone()).await {
            Ok(sent) => {
                delivered += 1;
                if let Err(e) = registry.record_notice(ticket.id, sent) {
                    warn!(ticket = %ticket.id, error = %e, "failed to record notice");
                }
            }
            Err(e) => {
                warn!(ticket = %ticket.id, worker = %worker, error = %e, "notice delivery failed");
            }
        }
    }
    delivered
}

/// After a worker wins the accept race: delete every other copy, swap the
/// winner's Accept control for close/ban/log-request controls, and keep only
/// the winner's refs as correlation keys.
pub async fn cleanup_after_accept(
    transport: &dyn Transport,
    registry: &Registry,
    ticket: &TicketRecord,
    winner: ChatId,
) {
    let mut keep = Vec::new();
    let accepted_by = ticket
        .assigned_alias
        .clone()
        .unwrap_or_else(|| winner.to_string());
    for &copy in &ticket.admin_messages {
        if copy.chat == winner {
            let updated = OutboundMessage::text(format!(
                "{}\n\n👤 Accepted by {accepted_by}",
                ticket_notice_text(ticket)
            ))
            .with_keyboard(assigned_keyboard(ticket));
            if let Err(e) = transport.edit(copy, updated).await {
                warn!(ticket = %ticket.id, error = %e, "failed to swap accept control");
            }
            keep.push(copy);
        } else if let Err(e) = transport.delete(copy).await {
            warn!(ticket = %ticket.id, chat = %copy.chat, error = %e, "failed to delete stale notice");
        }
    }
    if let Err(e) = registry.replace_notices(ticket.id, keep) {
        warn!(ticket = %ticket.id, error = %e, "failed to prune notice refs");
    }
}

/// Render the unassigned-ticket list shown by the worker panel.
pub fn render_open_list(unassigned: &[TicketRecord]) -> OutboundMessage {
    if unassigned.is_empty() {
        return OutboundMessage::text("📋 No unclaimed tickets right now.");
    }
    let mut lines = vec![format!("📋 Unclaimed tickets: {}", unassigned.len())];
    let mut rows = Vec::new();
    for ticket in unassigned {
        lines.push(format!(
            "{} — {} · {}",
            ticket.id,
            ticket.service.label(),
            ticket.customer_tag
        ));
        rows.push(vec![
            Button::new(
                format!("✅ Accept {}", ticket.id),
                format!("accept:{}", ticket.id.0),
            ),
            Button::new(format!("👁 {}", ticket.id), format!("view:{}", ticket.id.0)),
            Button::new(format!("🗑 {}", ticket.id), format!("drop:{}", ticket.id.0)),
        ]);
    }
    OutboundMessage::text(lines.join("\n")).with_keyboard(Keyboard::Inline(rows))
}

/// Chats currently displaying the live unclaimed-ticket list.
///
/// Push-style invalidation: whenever the ticket set or assignment state
/// changes, every registered view is re-rendered in place. A view that can
/// no longer be edited is dropped.
#[derive(Default)]
pub struct ListViews {
    views: Mutex<HashMap<ChatId, MessageRef>>,
}

impl ListViews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `message` as chat's live list view, replacing any previous one.
    pub fn register(&self, message: MessageRef) {
        self.views
            .lock()
            .expect("list view lock poisoned")
            .insert(message.chat, message);
    }

    /// Stop tracking a chat's view, e.g. once the worker accepts a ticket.
    pub fn remove(&self, chat: ChatId) {
        self.views
            .lock()
            .expect("list view lock poisoned")
            .remove(&chat);
    }

    /// Re-render all registered views against the current unassigned set.
    pub async fn refresh(&self, transport: &dyn Transport, registry: &Registry) {
        let targets: Vec<MessageRef> = self
            .views
            .lock()
            .expect("list view lock poisoned")
            .values()
            .copied()
            .collect();
        if targets.is_empty() {
            return;
        }
        let rendered = render_open_list(&registry.unassigned_open());
        for target in targets {
            if let Err(e) = transport.edit(target, rendered.clone()).await {
                debug!(chat = %target.chat, error = %e, "dropping stale list view");
                self.remove(target.chat);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::Path;
    use tessera_config::model::{AudienceConfig, TicketConfig};
    use tessera_core::ServiceKind;
    use tessera_registry::NewTicket;
    use tessera_test_utils::MockTransport;

    fn registry(dir: &Path) -> Registry {
        Registry::open(dir, &TicketConfig::default(), &AudienceConfig::default()).unwrap()
    }

    fn new_ticket(chat: i64) -> NewTicket {
        NewTicket {
            chat_id: ChatId(chat),
            service: ServiceKind::Food,
            category: "🍕 Pizza".to_string(),
            answers: vec![("name".to_string(), "Alice".to_string())],
            customer_tag: "@alice".to_string(),
            customer_name: Some("Alice".to_string()),
        }
    }

    #[tokio::test]
    async fn fan_out_records_one_notice_per_worker() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        let transport = MockTransport::new();
        let workers = [ChatId(901), ChatId(902), ChatId(903)];

        let ticket = registry.create_ticket(new_ticket(100), Utc::now()).unwrap();
        let delivered = fan_out_ticket(&transport, &registry, &workers, &ticket).await;

        assert_eq!(delivered, 3);
        let stored = registry.get(ticket.id).unwrap();
        assert_eq!(stored.admin_messages.len(), 3);
        for worker in workers {
            let copies = transport.sent_to(worker);
            assert_eq!(copies.len(), 1);
            assert!(copies[0].msg.text.contains("Ticket #61"));
            assert!(matches!(copies[0].msg.keyboard, Some(Keyboard::Inline(_))));
        }
    }

    #[tokio::test]
    async fn fan_out_is_best_effort_per_worker() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        let transport = MockTransport::new();
        transport.fail_chat(ChatId(902));
        let workers = [ChatId(901), ChatId(902), ChatId(903)];

        let ticket = registry.create_ticket(new_ticket(100), Utc::now()).unwrap();
        let delivered = fan_out_ticket(&transport, &registry, &workers, &ticket).await;

        // The unreachable worker is skipped, the rest still get copies.
        assert_eq!(delivered, 2);
        assert_eq!(registry.get(ticket.id).unwrap().admin_messages.len(), 2);
    }

    #[tokio::test]
    async fn accept_cleanup_deletes_losers_and_rekeys_winner() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        let transport = MockTransport::new();
        let workers = [ChatId(901), ChatId(902)];
        let now = Utc::now();

        let ticket = registry.create_ticket(new_ticket(100), now).unwrap();
        fan_out_ticket(&transport, &registry, &workers, &ticket).await;

        let assigned = registry
            .assign_ticket(ticket.id, ChatId(901), Some("W1".to_string()), now)
            .unwrap();
        cleanup_after_accept(&transport, &registry, &assigned.ticket, ChatId(901)).await;

        // Loser's copy deleted, winner's edited in place.
        assert_eq!(transport.deleted().len(), 1);
        assert_eq!(transport.deleted()[0].chat, ChatId(902));
        let edits = transport.edited();
        assert_eq!(edits.len(), 1);
        assert!(edits[0].1.text.contains("Accepted by W1"));

        // The Accept button gives way to the post-assignment controls.
        let Some(Keyboard::Inline(rows)) = &edits[0].1.keyboard else {
            panic!("winner's copy lost its keyboard");
        };
        let payloads: Vec<&str> = rows
            .iter()
            .flatten()
            .map(|b| b.action.as_str())
            .collect();
        assert_eq!(payloads, vec!["drop:61", "ban:61", "logreq:61"]);
        assert!(!payloads.iter().any(|p| p.starts_with("accept:")));

        // Only the winner's ref survives as a correlation key.
        let stored = registry.get(ticket.id).unwrap();
        assert_eq!(stored.admin_messages.len(), 1);
        assert_eq!(stored.admin_messages[0].chat, ChatId(901));
    }

    #[tokio::test]
    async fn list_views_refresh_in_place_and_drop_dead_chats() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        let transport = MockTransport::new();
        let views = ListViews::new();
        let now = Utc::now();

        registry.create_ticket(new_ticket(100), now).unwrap();
        let panel = transport
            .send(ChatId(901), render_open_list(&registry.unassigned_open()))
            .await
            .unwrap();
        views.register(panel);

        registry.create_ticket(new_ticket(101), now).unwrap();
        views.refresh(&transport, &registry).await;

        let edits = transport.edited();
        assert_eq!(edits.len(), 1);
        assert!(edits[0].1.text.contains("Unclaimed tickets: 2"));

        // A view that can no longer be edited is dropped on refresh.
        transport.fail_chat(ChatId(901));
        views.refresh(&transport, &registry).await;
        transport.clear();
        views.refresh(&transport, &registry).await;
        assert!(transport.edited().is_empty());
    }
}
