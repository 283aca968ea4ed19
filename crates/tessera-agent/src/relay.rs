// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correspondence relay between customers and workers.
//!
//! Routing runs on the `(chat, message id)` refs recorded at fan-out time:
//! a worker replying to a recorded copy addresses that ticket's customer,
//! and customer messages land as fresh replies to the recorded copies so
//! platform-level threading stays intact.

use tessera_core::{ChatId, MessageRef, OutboundMessage, Transport};
use tessera_registry::TicketRecord;
use tracing::warn;

/// The recorded notice copy living in `chat`, if any.
pub fn notice_in_chat(ticket: &TicketRecord, chat: ChatId) -> Option<MessageRef> {
    ticket
        .admin_messages
        .iter()
        .find(|m| m.chat == chat)
        .copied()
}

fn customer_relay_body(ticket: &TicketRecord, text: &str) -> String {
    format!("💬 {} on ticket {}:\n{}", ticket.customer_tag, ticket.id, text)
}

/// Deliver a customer message into the worker side of the ticket.
///
/// Assigned tickets go only to the assignee, threaded onto their copy;
/// unassigned tickets go to every chat holding a copy. Best-effort per
/// recipient. Returns the delivered count.
pub async fn relay_customer_text(
    transport: &dyn Transport,
    ticket: &TicketRecord,
    text: &str,
) -> usize {
    let body = customer_relay_body(ticket, text);
    let targets: Vec<MessageRef> = match ticket.assigned_admin {
        Some(assignee) => notice_in_chat(ticket, assignee).into_iter().collect(),
        None => ticket.admin_messages.clone(),
    };
    let mut delivered = 0;
    for target in targets {
        let mut msg = OutboundMessage::text(body.clone());
        msg.reply_to = Some(target.message);
        match transport.send(target.chat, msg).await {
            Ok(_) => delivered += 1,
            Err(e) => {
                // The threaded copy may be gone; fall back to a plain send.
                warn!(ticket = %ticket.id, chat = %target.chat, error = %e, "threaded relay failed, retrying plain");
                match transport.send(target.chat, OutboundMessage::text(body.clone())).await {
                    Ok(_) => delivered += 1,
                    Err(e) => {
                        warn!(ticket = %ticket.id, chat = %target.chat, error = %e, "customer relay failed");
                    }
                }
            }
        }
    }
    delivered
}

/// Deliver a worker's reply to the ticket's customer. The worker's identity
/// is deliberately not exposed beyond an alias.
pub async fn relay_worker_reply(
    transport: &dyn Transport,
    ticket: &TicketRecord,
    alias: Option<&str>,
    text: &str,
) -> bool {
    let who = alias.unwrap_or("Support");
    let body = format!("💬 {who} (ticket {}):\n{text}", ticket.id);
    match transport.send(ticket.chat_id, OutboundMessage::text(body)).await {
        Ok(_) => true,
        Err(e) => {
            warn!(ticket = %ticket.id, error = %e, "worker reply relay failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tessera_config::model::{AudienceConfig, TicketConfig};
    use tessera_core::ServiceKind;
    use tessera_registry::{NewTicket, Registry};
    use tessera_test_utils::MockTransport;

    async fn ticket_with_notices(
        registry: &Registry,
        transport: &MockTransport,
        workers: &[ChatId],
    ) -> TicketRecord {
        let ticket = registry
            .create_ticket(
                NewTicket {
                    chat_id: ChatId(100),
                    service: ServiceKind::Food,
                    category: "🍕 Pizza".to_string(),
                    answers: vec![],
                    customer_tag: "@alice".to_string(),
                    customer_name: Some("Alice".to_string()),
                },
                Utc::now(),
            )
            .unwrap();
        crate::notify::fan_out_ticket(transport, registry, workers, &ticket).await;
        registry.get(ticket.id).unwrap()
    }

    #[tokio::test]
    async fn unassigned_relay_threads_to_every_copy() {
        let dir = tempfile::tempdir().unwrap();
        let registry =
            Registry::open(dir.path(), &TicketConfig::default(), &AudienceConfig::default())
                .unwrap();
        let transport = MockTransport::new();
        let workers = [ChatId(901), ChatId(902)];

        let ticket = ticket_with_notices(&registry, &transport, &workers).await;
        transport.clear();

        let delivered = relay_customer_text(&transport, &ticket, "any update?").await;
        assert_eq!(delivered, 2);
        for worker in workers {
            let sent = transport.sent_to(worker);
            assert_eq!(sent.len(), 1);
            assert!(sent[0].msg.text.contains("@alice on ticket #61"));
            // Threaded onto that worker's own copy.
            assert_eq!(
                sent[0].msg.reply_to,
                Some(notice_in_chat(&ticket, worker).unwrap().message)
            );
        }
    }

    #[tokio::test]
    async fn assigned_relay_goes_only_to_the_assignee() {
        let dir = tempfile::tempdir().unwrap();
        let registry =
            Registry::open(dir.path(), &TicketConfig::default(), &AudienceConfig::default())
                .unwrap();
        let transport = MockTransport::new();
        let workers = [ChatId(901), ChatId(902)];
        let now = Utc::now();

        let ticket = ticket_with_notices(&registry, &transport, &workers).await;
        registry
            .assign_ticket(ticket.id, ChatId(902), None, now)
            .unwrap();
        let ticket = registry.get(ticket.id).unwrap();
        transport.clear();

        let delivered = relay_customer_text(&transport, &ticket, "hello").await;
        assert_eq!(delivered, 1);
        assert!(transport.sent_to(ChatId(901)).is_empty());
        assert_eq!(transport.sent_to(ChatId(902)).len(), 1);
    }

    #[tokio::test]
    async fn worker_reply_reaches_customer_with_alias() {
        let dir = tempfile::tempdir().unwrap();
        let registry =
            Registry::open(dir.path(), &TicketConfig::default(), &AudienceConfig::default())
                .unwrap();
        let transport = MockTransport::new();

        let ticket = ticket_with_notices(&registry, &transport, &[ChatId(901)]).await;
        transport.clear();

        assert!(relay_worker_reply(&transport, &ticket, Some("W1"), "on the way").await);
        let text = transport.last_text_to(ChatId(100)).unwrap();
        assert!(text.contains("W1"));
        assert!(text.contains("on the way"));
    }
}
