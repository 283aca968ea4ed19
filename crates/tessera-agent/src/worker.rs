// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution of the worker and log-provider command surfaces against the
//! registry. Callers have already verified the issuing chat's audience.

use chrono::{DateTime, Utc};
use tessera_core::{ChatId, OutboundMessage, TicketId, Transport};
use tessera_registry::{
    AssignError, CloseKind, CloseOutcome, CloseRequest, Registry, ReportSummary, WorkflowError,
};
use tracing::warn;

use crate::notify::{self, ListViews};
use crate::transports::TransportMap;

/// Shared handles the command executors work against.
pub struct Io<'a> {
    pub transports: &'a TransportMap,
    pub registry: &'a Registry,
    pub views: &'a ListViews,
    pub log_chats: &'a [ChatId],
}

impl Io<'_> {
    /// The bot workers and log providers talk to.
    fn worker_bot(&self) -> &dyn Transport {
        self.transports.primary()
    }

    pub(crate) async fn tell(&self, chat: ChatId, text: impl Into<String>) {
        if let Err(e) = self
            .worker_bot()
            .send(chat, OutboundMessage::text(text.into()))
            .await
        {
            warn!(chat = %chat, error = %e, "operator reply failed");
        }
    }

    /// Best-effort note to a ticket's customer through that service's bot.
    async fn tell_customer(&self, ticket_service: tessera_core::ServiceKind, chat: ChatId, text: String) {
        let bot = self.transports.for_service(ticket_service);
        if let Err(e) = bot.send(chat, OutboundMessage::text(text)).await {
            warn!(chat = %chat, error = %e, "customer notice failed");
        }
    }
}

/// `/accept`: claim the ticket, clean up the losers' copies, and tell the
/// customer someone is on it.
pub async fn accept(io: &Io<'_>, worker: ChatId, ticket_id: TicketId, now: DateTime<Utc>) {
    let alias = io.registry.alias_for(worker);
    match io.registry.assign_ticket(ticket_id, worker, alias, now) {
        Ok(assigned) if assigned.newly_assigned => {
            notify::cleanup_after_accept(io.worker_bot(), io.registry, &assigned.ticket, worker)
                .await;
            io.views.remove(worker);
            io.views.refresh(io.worker_bot(), io.registry).await;
            io.tell(worker, format!("✅ You took ticket {ticket_id}.")).await;
            io.tell_customer(
                assigned.ticket.service,
                assigned.ticket.chat_id,
                format!("✅ Ticket {ticket_id} has been accepted. A worker is on it!"),
            )
            .await;
        }
        Ok(_) => {
            io.tell(worker, format!("You already hold ticket {ticket_id}.")).await;
        }
        Err(AssignError::Assigned { to, alias }) => {
            let holder = alias.unwrap_or_else(|| to.to_string());
            io.tell(
                worker,
                format!("❌ Ticket {ticket_id} was already accepted by {holder}."),
            )
            .await;
        }
        Err(AssignError::Closed(_)) => {
            io.tell(worker, format!("❌ Ticket {ticket_id} is already closed.")).await;
        }
        Err(AssignError::NotFound(_)) => {
            io.tell(worker, format!("❌ No ticket {ticket_id}.")).await;
        }
        Err(AssignError::Storage(e)) => {
            warn!(ticket = %ticket_id, error = %e, "accept failed");
            io.tell(worker, "❌ Something went wrong, try again.").await;
        }
    }
}

/// `/close` and `/drop`: terminal closure with or without profit.
pub async fn close(
    io: &Io<'_>,
    worker: ChatId,
    ticket_id: TicketId,
    kind: CloseKind,
    profit: Option<f64>,
    remarks: Option<String>,
    now: DateTime<Utc>,
) {
    let request = CloseRequest {
        kind,
        closed_by: Some(worker),
        profit,
        remarks,
    };
    match io.registry.close_ticket(ticket_id, request, now) {
        Ok(CloseOutcome::Closed(record)) => {
            io.views.refresh(io.worker_bot(), io.registry).await;
            let (profit_out, cut) = record
                .closure
                .as_ref()
                .map(|c| (c.profit, c.cut))
                .unwrap_or_default();
            match kind {
                CloseKind::Completed => {
                    io.tell(
                        worker,
                        format!("✅ Closed {ticket_id}. Profit ${profit_out:.2}, cut ${cut:.2}."),
                    )
                    .await;
                    io.tell_customer(
                        record.service,
                        record.chat_id,
                        format!("✅ Ticket {ticket_id} is complete. Thanks for ordering!"),
                    )
                    .await;
                }
                CloseKind::Manual => {
                    io.tell(worker, format!("🗑 Dropped {ticket_id}.")).await;
                    io.tell_customer(
                        record.service,
                        record.chat_id,
                        format!("Ticket {ticket_id} was closed by our team."),
                    )
                    .await;
                }
                CloseKind::Banned => {}
            }
        }
        Ok(CloseOutcome::AlreadyClosed(_)) => {
            io.tell(worker, format!("Ticket {ticket_id} is already closed.")).await;
        }
        Err(e) => {
            warn!(ticket = %ticket_id, error = %e, "close failed");
            io.tell(worker, format!("❌ Could not close {ticket_id}.")).await;
        }
    }
}

/// Panel view control: the full notice body for one ticket.
pub async fn view(io: &Io<'_>, worker: ChatId, ticket_id: TicketId) {
    match io.registry.get(ticket_id) {
        Some(record) => io.tell(worker, notify::ticket_notice_text(&record)).await,
        None => io.tell(worker, format!("❌ No ticket {ticket_id}.")).await,
    }
}

/// `/paid`: mark payment received.
pub async fn paid(io: &Io<'_>, worker: ChatId, ticket_id: TicketId) {
    match io.registry.mark_paid(ticket_id, worker) {
        Ok(_) => io.tell(worker, format!("💰 Marked {ticket_id} paid.")).await,
        Err(e) => io.tell(worker, workflow_rejection(ticket_id, &e)).await,
    }
}

/// `/log`: flag the ticket and ping every log-provider chat. Each ping is
/// recorded in the correlation index so a provider can reply to it directly
/// instead of typing the ticket number.
pub async fn request_log(io: &Io<'_>, worker: ChatId, ticket_id: TicketId) {
    match io.registry.request_log(ticket_id, worker) {
        Ok(record) => {
            let who = record
                .assigned_alias
                .clone()
                .unwrap_or_else(|| worker.to_string());
            let ping = OutboundMessage::text(format!(
                "📒 Log requested for ticket {ticket_id} by {who}."
            ));
            for &chat in io.log_chats {
                match io.worker_bot().send(chat, ping.clone()).await {
                    Ok(sent) => {
                        if let Err(e) = io.registry.record_notice(ticket_id, sent) {
                            warn!(ticket = %ticket_id, error = %e, "failed to record log ping");
                        }
                    }
                    Err(e) => {
                        warn!(ticket = %ticket_id, chat = %chat, error = %e, "log ping failed");
                    }
                }
            }
            io.tell(worker, format!("📒 Log providers pinged for {ticket_id}.")).await;
        }
        Err(e) => io.tell(worker, workflow_rejection(ticket_id, &e)).await,
    }
}

/// `/ban`: cascade-close the customer's open tickets and drop their notices.
pub async fn ban(io: &Io<'_>, worker: ChatId, target: ChatId, now: DateTime<Utc>) {
    match io.registry.ban(target, worker, now) {
        Ok(closed) => {
            // Stale notice copies would otherwise keep dead Accept buttons.
            for record in &closed {
                for &copy in &record.admin_messages {
                    if let Err(e) = io.worker_bot().delete(copy).await {
                        warn!(ticket = %record.id, error = %e, "failed to delete banned notice");
                    }
                }
            }
            io.views.refresh(io.worker_bot(), io.registry).await;
            io.tell(
                worker,
                format!("🔨 Banned chat {target}, closed {} ticket(s).", closed.len()),
            )
            .await;
        }
        Err(e) => {
            warn!(chat = %target, error = %e, "ban failed");
            io.tell(worker, "❌ Ban failed, try again.").await;
        }
    }
}

/// `/unban`.
pub async fn unban(io: &Io<'_>, worker: ChatId, target: ChatId) {
    match io.registry.unban(target) {
        Ok(true) => io.tell(worker, format!("♻️ Unbanned chat {target}.")).await,
        Ok(false) => io.tell(worker, format!("Chat {target} was not banned.")).await,
        Err(e) => {
            warn!(chat = %target, error = %e, "unban failed");
            io.tell(worker, "❌ Unban failed, try again.").await;
        }
    }
}

/// `/setname`: alias shown to other workers and on accepted notices.
pub async fn set_name(io: &Io<'_>, worker: ChatId, alias: &str) {
    match io.registry.set_alias(worker, alias) {
        Ok(()) => io.tell(worker, format!("👤 You are now \"{alias}\".")).await,
        Err(e) => {
            warn!(chat = %worker, error = %e, "setname failed");
            io.tell(worker, "❌ Could not save the alias.").await;
        }
    }
}

pub fn format_report(summary: &ReportSummary) -> String {
    format!(
        "📊 Ticket report\n\
         Total: {} (open {})\n\
         ✅ Completed: {}\n\
         🗑 Dropped: {}\n\
         🔨 Banned: {}\n\
         💵 Profit: ${:.2}\n\
         ✂️ Cut: ${:.2}",
        summary.total,
        summary.open,
        summary.closed_completed,
        summary.closed_manual,
        summary.closed_banned,
        summary.profit_total,
        summary.cut_total,
    )
}

/// `/report`: ledger totals.
pub async fn report(io: &Io<'_>, worker: ChatId) {
    io.tell(worker, format_report(&io.registry.summarize())).await;
}

/// `/work`: send the live unclaimed-ticket list and track it for refresh.
pub async fn panel(io: &Io<'_>, worker: ChatId) {
    let rendered = notify::render_open_list(&io.registry.unassigned_open());
    match io.worker_bot().send(worker, rendered).await {
        Ok(sent) => io.views.register(sent),
        Err(e) => warn!(chat = %worker, error = %e, "panel send failed"),
    }
}

/// Log-provider `/provide`: record provision and hand the content to the
/// assigned worker.
pub async fn provide_log(
    io: &Io<'_>,
    provider: ChatId,
    provider_name: &str,
    ticket_id: TicketId,
    content: &str,
    now: DateTime<Utc>,
) {
    match io.registry.provide_log(ticket_id, provider_name, now) {
        Ok(record) => {
            if let Some(assignee) = record.assigned_admin {
                io.tell(
                    assignee,
                    format!("📒 Log for ticket {ticket_id} from {provider_name}:\n{content}"),
                )
                .await;
            }
            io.tell(provider, format!("✅ Log delivered for {ticket_id}.")).await;
        }
        Err(e) => io.tell(provider, workflow_rejection(ticket_id, &e)).await,
    }
}

/// Log-provider `/panel`: pending log requests, the open set, and totals.
pub async fn provider_panel(io: &Io<'_>, provider: ChatId) {
    let open = io.registry.all_open();
    let waiting: Vec<String> = open
        .iter()
        .filter(|t| t.log_requested && t.log_provided_at.is_none())
        .map(|t| format!("{} — {} · {}", t.id, t.service.label(), t.customer_tag))
        .collect();
    let summary = io.registry.summarize();

    let mut text = String::from("📒 Provider panel\n\n");
    if waiting.is_empty() {
        text.push_str("Nothing is waiting on a log.\n");
    } else {
        text.push_str("Waiting on logs:\n");
        text.push_str(&waiting.join("\n"));
        text.push('\n');
    }
    let recent = io.registry.recent_completed(5);
    if !recent.is_empty() {
        text.push_str("\nRecent closes:\n");
        for ticket in &recent {
            let profit = ticket.closure.as_ref().map(|c| c.profit).unwrap_or(0.0);
            text.push_str(&format!(
                "{} — {} · ${profit:.2}\n",
                ticket.id,
                ticket.service.label()
            ));
        }
    }
    text.push_str(&format!(
        "\nOpen tickets: {}\nCompleted: {}\nProfit ${:.2} · Cut ${:.2}",
        open.len(),
        summary.closed_completed,
        summary.profit_total,
        summary.cut_total,
    ));
    io.tell(provider, text).await;
}

fn workflow_rejection(ticket: TicketId, error: &WorkflowError) -> String {
    match error {
        WorkflowError::NotFound(_) => format!("❌ No ticket {ticket}."),
        WorkflowError::Closed(_) => format!("❌ Ticket {ticket} is already closed."),
        WorkflowError::Unassigned(_) => {
            format!("❌ Ticket {ticket} has no assigned worker yet.")
        }
        WorkflowError::NotAssignee { .. } => {
            format!("❌ Ticket {ticket} is held by another worker.")
        }
        WorkflowError::Storage(_) => "❌ Something went wrong, try again.".to_string(),
    }
}
