// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level event routing.
//!
//! Every inbound event is classified by its chat's audience: workers get the
//! command surface and the accept race, log providers get the provision
//! surface, everyone else is a customer. Customer text goes through the
//! order flow first; whatever the flow does not consume is relayed onto the
//! customer's open tickets.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tessera_config::model::{AudienceConfig, TesseraConfig};
use tessera_core::{
    ChatId, InboundEvent, MessageRef, OutboundMessage, ServiceKind, TesseraError, TicketId,
};
use tessera_flow::screens::{home_keyboard, BTN_HOME};
use tessera_flow::script::{script_for, FOOD_CATEGORIES};
use tessera_flow::{FlowEngine, FlowOutcome, OrderDraft};
use tessera_registry::{
    CloseKind, CreateError, NewTicket, RateDecision, RateLimiter, Registry,
};
use tracing::{info, warn};

use crate::commands::{
    parse_provider_command, parse_worker_command, ParseError, ProviderCommand, WorkerCommand,
};
use crate::notify::{self, ListViews};
use crate::relay;
use crate::script_runner::{ScriptOutcome, ScriptRunner};
use crate::transports::TransportMap;
use crate::worker::{self, Io};

const CUSTOMER_HELP: &str = "ℹ️ Commands:\n\
    /start — show the menu\n\
    /profile — manage saved addresses\n\
    /profile delete — remove your saved profile\n\
    /cancel — abandon the current dialogue\n\
    /help — this message";

pub struct Agent {
    transports: TransportMap,
    registry: Registry,
    flow: FlowEngine,
    scripts: ScriptRunner,
    rate: RateLimiter,
    views: ListViews,
    audience: AudienceConfig,
    worker_chats: Vec<ChatId>,
    log_chats: Vec<ChatId>,
    logo_path: Option<PathBuf>,
    dialog_timeout: Option<Duration>,
    /// Which open ticket a multi-ticket customer's messages refer to.
    /// Advisory only; the ledger stays authoritative.
    chosen_tickets: Mutex<HashMap<ChatId, TicketId>>,
}

impl Agent {
    pub fn new(config: &TesseraConfig, transports: TransportMap) -> Result<Self, TesseraError> {
        let data_dir = PathBuf::from(&config.storage.data_dir);
        let registry = Registry::open(&data_dir, &config.tickets, &config.audience)?;
        let flow = FlowEngine::open(
            &data_dir,
            &config.storage,
            &config.sessions,
            config.order.clone(),
        );

        let minutes = config.sessions.dialog_timeout_minutes;
        let dialog_timeout =
            (minutes > 0.0).then(|| Duration::from_secs_f64(minutes * 60.0));

        Ok(Self {
            transports,
            registry,
            flow,
            scripts: ScriptRunner::new(),
            rate: RateLimiter::new(&config.rate_limit),
            views: ListViews::new(),
            audience: config.audience.clone(),
            worker_chats: config.audience.worker_chat_ids.iter().copied().map(ChatId).collect(),
            log_chats: config.audience.log_chat_ids.iter().copied().map(ChatId).collect(),
            logo_path: config.telegram.logo_path.as_ref().map(PathBuf::from),
            dialog_timeout,
            chosen_tickets: Mutex::new(HashMap::new()),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn io(&self) -> Io<'_> {
        Io {
            transports: &self.transports,
            registry: &self.registry,
            views: &self.views,
            log_chats: &self.log_chats,
        }
    }

    async fn send_all(&self, service: ServiceKind, chat: ChatId, replies: Vec<OutboundMessage>) {
        let bot = self.transports.for_service(service);
        for reply in replies {
            if let Err(e) = bot.send(chat, reply).await {
                warn!(chat = %chat, error = %e, "customer send failed");
            }
        }
    }

    async fn send_one(&self, service: ServiceKind, chat: ChatId, reply: OutboundMessage) {
        self.send_all(service, chat, vec![reply]).await;
    }

    pub async fn handle_event(self: &Arc<Self>, event: InboundEvent) {
        let chat = event.chat_id;
        if self.audience.is_worker(chat) {
            self.handle_worker(event).await;
        } else if self.audience.is_log_provider(chat) {
            self.handle_provider(event).await;
        } else {
            self.handle_customer(event).await;
        }
    }

    // --- Workers ---

    async fn handle_worker(&self, event: InboundEvent) {
        let chat = event.chat_id;
        let now = Utc::now();
        let io = self.io();

        if let Some(interaction) = &event.interaction {
            if let Err(e) = self.transports.primary().answer(&interaction.id, None).await {
                warn!(chat = %chat, error = %e, "interaction ack failed");
            }
            if let Some((action, raw)) = interaction.payload.split_once(':') {
                let Some(id) = raw.parse::<u64>().ok().map(TicketId) else {
                    return;
                };
                match action {
                    "accept" => worker::accept(&io, chat, id, now).await,
                    "view" => worker::view(&io, chat, id).await,
                    "drop" => {
                        worker::close(&io, chat, id, CloseKind::Manual, None, None, now).await
                    }
                    // The ban control carries the ticket id; the target chat
                    // comes off the ticket record.
                    "ban" => match io.registry.get(id) {
                        Some(record) => worker::ban(&io, chat, record.chat_id, now).await,
                        None => io.tell(chat, format!("❌ No ticket {id}.")).await,
                    },
                    "logreq" => worker::request_log(&io, chat, id).await,
                    _ => {}
                }
            }
            return;
        }

        let Some(text) = &event.text else { return };
        match parse_worker_command(text) {
            Ok(command) => self.run_worker_command(chat, command, now).await,
            Err(ParseError::NotACommand) => {
                // Plain text from a worker is a reply relay when it answers a
                // recorded notice copy; anything else is ignored.
                let Some(replied) = event.replied_to else { return };
                let target = MessageRef {
                    chat,
                    message: replied,
                };
                if let Some(ticket) = self.registry.find_by_notice(target) {
                    let alias = self.registry.alias_for(chat);
                    relay::relay_worker_reply(
                        self.transports.for_service(ticket.service),
                        &ticket,
                        alias.as_deref(),
                        text,
                    )
                    .await;
                }
            }
            Err(ParseError::Unknown(name)) => {
                self.send_one(
                    ServiceKind::Food,
                    chat,
                    OutboundMessage::text(format!("Unknown command /{name}.")),
                )
                .await;
            }
            Err(ParseError::Usage(usage)) => {
                self.send_one(
                    ServiceKind::Food,
                    chat,
                    OutboundMessage::text(format!("Usage: {usage}")),
                )
                .await;
            }
        }
    }

    async fn run_worker_command(
        &self,
        chat: ChatId,
        command: WorkerCommand,
        now: chrono::DateTime<Utc>,
    ) {
        let io = self.io();
        match command {
            WorkerCommand::Accept(ticket) => worker::accept(&io, chat, ticket, now).await,
            WorkerCommand::Close {
                ticket,
                profit,
                remarks,
            } => {
                worker::close(
                    &io,
                    chat,
                    ticket,
                    CloseKind::Completed,
                    Some(profit),
                    remarks,
                    now,
                )
                .await
            }
            WorkerCommand::Drop { ticket, remarks } => {
                worker::close(&io, chat, ticket, CloseKind::Manual, None, remarks, now).await
            }
            WorkerCommand::Paid(ticket) => worker::paid(&io, chat, ticket).await,
            WorkerCommand::RequestLog(ticket) => worker::request_log(&io, chat, ticket).await,
            WorkerCommand::Ban(target) => worker::ban(&io, chat, target, now).await,
            WorkerCommand::Unban(target) => worker::unban(&io, chat, target).await,
            WorkerCommand::SetName(alias) => worker::set_name(&io, chat, &alias).await,
            WorkerCommand::Report => worker::report(&io, chat).await,
            WorkerCommand::Panel => worker::panel(&io, chat).await,
        }
    }

    // --- Log providers ---

    async fn handle_provider(&self, event: InboundEvent) {
        let chat = event.chat_id;
        let Some(text) = &event.text else { return };
        match parse_provider_command(text) {
            Ok(ProviderCommand::Provide { ticket, content }) => {
                worker::provide_log(
                    &self.io(),
                    chat,
                    &event.sender_tag(),
                    ticket,
                    &content,
                    Utc::now(),
                )
                .await;
            }
            Ok(ProviderCommand::Panel) => worker::provider_panel(&self.io(), chat).await,
            Err(ParseError::NotACommand) => {
                // A reply to a recorded log-request ping delivers the log
                // without naming the ticket.
                let Some(replied) = event.replied_to else { return };
                let target = MessageRef {
                    chat,
                    message: replied,
                };
                if let Some(ticket) = self.registry.find_by_notice(target) {
                    worker::provide_log(
                        &self.io(),
                        chat,
                        &event.sender_tag(),
                        ticket.id,
                        text,
                        Utc::now(),
                    )
                    .await;
                }
            }
            Err(ParseError::Unknown(name)) => {
                self.send_one(
                    ServiceKind::Food,
                    chat,
                    OutboundMessage::text(format!("Unknown command /{name}.")),
                )
                .await;
            }
            Err(ParseError::Usage(usage)) => {
                self.send_one(
                    ServiceKind::Food,
                    chat,
                    OutboundMessage::text(format!("Usage: {usage}")),
                )
                .await;
            }
        }
    }

    // --- Customers ---

    async fn handle_customer(self: &Arc<Self>, event: InboundEvent) {
        let chat = event.chat_id;
        if self.registry.is_banned(chat) {
            return;
        }

        if let Some(interaction) = &event.interaction {
            // Customers have no inline controls; ack so the client's spinner
            // clears and move on.
            let _ = self
                .transports
                .for_service(event.service)
                .answer(&interaction.id, None)
                .await;
            return;
        }

        let text = match &event.text {
            Some(text) => text.clone(),
            None if event.has_attachment => "📎 (attachment)".to_string(),
            None => return,
        };

        let trimmed = text.trim();
        if trimmed.starts_with("/start") {
            self.scripts.cancel(chat);
            self.flow.reset(event.user_id);
            self.send_welcome(event.service, chat).await;
            return;
        }
        if trimmed.starts_with("/cancel") {
            self.scripts.cancel(chat);
            self.flow.reset(event.user_id);
            self.send_one(
                event.service,
                chat,
                OutboundMessage::text("❌ Cancelled. Send /start to begin again."),
            )
            .await;
            return;
        }
        if trimmed.starts_with("/help") {
            self.send_one(event.service, chat, OutboundMessage::text(CUSTOMER_HELP))
                .await;
            return;
        }
        if trimmed == "/profile delete" {
            let reply = if self.flow.delete_profile(event.user_id) {
                "🗑 Your profile has been deleted."
            } else {
                "You have no saved profile."
            };
            self.send_one(event.service, chat, OutboundMessage::text(reply))
                .await;
            return;
        }
        if trimmed.starts_with("/profile") {
            let prompt = self.flow.open_profile(event.user_id, Utc::now());
            self.send_one(event.service, chat, prompt).await;
            return;
        }

        match event.service {
            ServiceKind::Food => self.handle_food_text(&event, &text).await,
            ServiceKind::Flight | ServiceKind::Hotel => {
                self.handle_scripted_text(&event, &text).await
            }
        }
    }

    async fn send_welcome(self: &Arc<Self>, service: ServiceKind, chat: ChatId) {
        let script = script_for(service);
        match service {
            ServiceKind::Food => {
                let welcome =
                    OutboundMessage::text(script.start_prompt).with_keyboard(home_keyboard());
                let bot = self.transports.for_service(service);
                let sent = match &self.logo_path {
                    Some(path) => bot.send_photo(chat, path, welcome.clone()).await,
                    None => bot.send(chat, welcome.clone()).await,
                };
                if sent.is_err() {
                    // Logo may be missing or unsendable; the menu still goes out.
                    if let Err(e) = bot.send(chat, welcome).await {
                        warn!(chat = %chat, error = %e, "welcome send failed");
                    }
                }
            }
            ServiceKind::Flight | ServiceKind::Hotel => {
                self.send_one(service, chat, OutboundMessage::text(script.start_prompt))
                    .await;
                let (prompt, generation) = self.scripts.start(chat, service);
                self.send_one(service, chat, prompt).await;
                self.schedule_script_timer(service, chat, generation);
            }
        }
    }

    async fn handle_food_text(self: &Arc<Self>, event: &InboundEvent, text: &str) {
        let chat = event.chat_id;
        let user = event.user_id;
        let now = Utc::now();

        match self.flow.handle_text(user, text, now) {
            FlowOutcome::Replies(replies) => {
                self.send_all(ServiceKind::Food, chat, replies).await;
            }
            FlowOutcome::Submit { draft, replies } => {
                self.send_all(ServiceKind::Food, chat, replies).await;
                self.submit_food_order(event, draft).await;
            }
            FlowOutcome::TicketChosen { ticket, replies } => {
                self.send_all(ServiceKind::Food, chat, replies).await;
                self.chosen_tickets
                    .lock()
                    .expect("chosen ticket lock poisoned")
                    .insert(chat, TicketId(ticket));
            }
            FlowOutcome::PassThrough => {
                let trimmed = text.trim();
                if let Some((_, label)) =
                    FOOD_CATEGORIES.iter().find(|(_, label)| *label == trimmed)
                {
                    if let FlowOutcome::Replies(replies) = self.flow.begin_order(user, label, now) {
                        self.send_all(ServiceKind::Food, chat, replies).await;
                    }
                } else if trimmed == BTN_HOME {
                    self.send_welcome(ServiceKind::Food, chat).await;
                } else {
                    self.relay_to_tickets(event, text).await;
                }
            }
        }
    }

    async fn handle_scripted_text(self: &Arc<Self>, event: &InboundEvent, text: &str) {
        let chat = event.chat_id;
        match self.scripts.handle_text(chat, text) {
            (ScriptOutcome::Prompt(prompt), generation) => {
                self.send_one(event.service, chat, prompt).await;
                if let Some(generation) = generation {
                    self.schedule_script_timer(event.service, chat, generation);
                }
            }
            (ScriptOutcome::Complete { service, answers }, _) => {
                self.submit_order(event, service, service.label().to_string(), answers)
                    .await;
            }
            (ScriptOutcome::NotActive, _) => {
                self.relay_to_tickets(event, text).await;
            }
        }
    }

    async fn submit_food_order(self: &Arc<Self>, event: &InboundEvent, draft: OrderDraft) {
        let answers = vec![
            ("name".to_string(), draft.name),
            ("address".to_string(), draft.address),
            ("phone".to_string(), draft.phone),
            ("subtotal".to_string(), format!("{:.2}", draft.subtotal)),
        ];
        self.submit_order(event, ServiceKind::Food, draft.option, answers)
            .await;
    }

    async fn submit_order(
        self: &Arc<Self>,
        event: &InboundEvent,
        service: ServiceKind,
        category: String,
        answers: Vec<(String, String)>,
    ) {
        let chat = event.chat_id;
        let now = Utc::now();

        if let RateDecision::Limited { retry_after } = self.rate.check_and_record(chat, now) {
            let minutes = (retry_after.as_secs().max(1)).div_ceil(60).max(1);
            self.send_one(
                service,
                chat,
                OutboundMessage::text(format!(
                    "🕒 You're placing orders too quickly. Try again in {minutes} minute(s)."
                )),
            )
            .await;
            return;
        }

        let new = NewTicket {
            chat_id: chat,
            service,
            category,
            answers,
            customer_tag: event.sender_tag(),
            customer_name: event.first_name.clone(),
        };
        match self.registry.create_ticket(new, now) {
            Ok(ticket) => {
                self.send_one(
                    service,
                    chat,
                    OutboundMessage::text("🕘 You're being connected over to our workers!"),
                )
                .await;
                self.send_one(
                    service,
                    chat,
                    OutboundMessage::text(format!(
                        "✅ Your {} request is in. This is ticket {}.",
                        script_for(service).ticket_label,
                        ticket.id
                    )),
                )
                .await;
                notify::fan_out_ticket(
                    self.transports.primary(),
                    &self.registry,
                    &self.worker_chats,
                    &ticket,
                )
                .await;
                self.views
                    .refresh(self.transports.primary(), &self.registry)
                    .await;
            }
            Err(CreateError::OpenCapReached { open, cap }) => {
                self.send_one(
                    service,
                    chat,
                    OutboundMessage::text(format!(
                        "❌ You already have {open} open tickets (limit {cap}). Wait for them to be handled first."
                    )),
                )
                .await;
            }
            Err(CreateError::Banned(_)) => {}
            Err(CreateError::Storage(e)) => {
                warn!(chat = %chat, error = %e, "ticket creation failed");
                self.send_one(
                    service,
                    chat,
                    OutboundMessage::text("❌ Something went wrong, please try again."),
                )
                .await;
            }
        }
    }

    /// Route loose customer text onto their open tickets.
    async fn relay_to_tickets(self: &Arc<Self>, event: &InboundEvent, text: &str) {
        let chat = event.chat_id;
        let open = self.registry.open_for(chat);
        match open.len() {
            0 => {
                self.send_one(
                    event.service,
                    chat,
                    OutboundMessage::text("ℹ️ You have no open tickets. Send /start to place an order."),
                )
                .await;
            }
            1 => {
                relay::relay_customer_text(self.transports.primary(), &open[0], text).await;
            }
            _ => {
                let chosen = self
                    .chosen_tickets
                    .lock()
                    .expect("chosen ticket lock poisoned")
                    .get(&chat)
                    .copied();
                if let Some(ticket) =
                    chosen.and_then(|id| open.iter().find(|t| t.id == id))
                {
                    relay::relay_customer_text(self.transports.primary(), ticket, text).await;
                } else {
                    let prompt = self.flow.request_ticket_pick(event.user_id, Utc::now());
                    self.send_one(event.service, chat, prompt).await;
                }
            }
        }
    }

    fn schedule_script_timer(self: &Arc<Self>, service: ServiceKind, chat: ChatId, generation: u64) {
        let Some(timeout) = self.dialog_timeout else {
            return;
        };
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if agent.scripts.expire_if_stale(chat, generation) {
                info!(chat = %chat, "dialogue timed out");
                let _ = agent
                    .transports
                    .for_service(service)
                    .send(
                        chat,
                        OutboundMessage::text("⌛ Session timed out. Send /start to begin again."),
                    )
                    .await;
            }
        });
    }

    /// Drop idle persisted sessions and tell the affected customers.
    pub async fn sweep_sessions(&self) {
        for user in self.flow.expire_idle(Utc::now()) {
            // Customers only talk to the bot in private chats, where the
            // chat id equals the user id.
            let chat = ChatId(user.0);
            let _ = self
                .transports
                .for_service(ServiceKind::Food)
                .send(
                    chat,
                    OutboundMessage::text("⌛ Session expired. Send /start to begin again."),
                )
                .await;
        }
    }

    /// Force pending table writes to disk.
    pub fn flush(&self) -> Result<(), TesseraError> {
        self.flow.flush_now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tessera_config::model::{
        AgentConfig, OrderConfig, RateLimitConfig, SessionConfig, StorageConfig, TelegramConfig,
        TicketConfig,
    };
    use tessera_core::{Interaction, Keyboard, UserId};
    use tessera_flow::screens::BTN_SKIP;
    use tessera_test_utils::MockTransport;

    const WORKER_A: i64 = 901;
    const WORKER_B: i64 = 902;
    const PROVIDER: i64 = 801;
    const CUSTOMER: i64 = 100;

    fn config(dir: &Path) -> TesseraConfig {
        TesseraConfig {
            telegram: TelegramConfig::default(),
            audience: AudienceConfig {
                worker_chat_ids: vec![WORKER_A, WORKER_B],
                log_chat_ids: vec![PROVIDER],
                banned_chat_ids: vec![],
                worker_aliases: Default::default(),
            },
            storage: StorageConfig {
                data_dir: dir.display().to_string(),
                flush_debounce_ms: 0,
            },
            sessions: SessionConfig::default(),
            tickets: TicketConfig::default(),
            rate_limit: RateLimitConfig::default(),
            order: OrderConfig::default(),
            agent: AgentConfig::default(),
        }
    }

    fn agent(dir: &Path) -> (Arc<Agent>, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new());
        let agent = Agent::new(&config(dir), TransportMap::single(mock.clone())).unwrap();
        (Arc::new(agent), mock)
    }

    fn text_event(chat: i64, text: &str) -> InboundEvent {
        InboundEvent {
            service: ServiceKind::Food,
            chat_id: ChatId(chat),
            user_id: UserId(chat),
            username: Some(format!("user{chat}")),
            first_name: Some("Alice".to_string()),
            text: Some(text.to_string()),
            replied_to: None,
            interaction: None,
            has_attachment: false,
        }
    }

    fn tap_event(chat: i64, payload: &str) -> InboundEvent {
        InboundEvent {
            interaction: Some(Interaction {
                id: "cb1".to_string(),
                payload: payload.to_string(),
            }),
            text: None,
            ..text_event(chat, "")
        }
    }

    async fn place_order(agent: &Arc<Agent>, chat: i64) {
        for line in [
            "🍕 Pizza",
            BTN_SKIP,
            "Bob",
            "555-0102",
            "9 Elm Ave",
            "50",
            "yes",
        ] {
            agent.handle_event(text_event(chat, line)).await;
        }
    }

    #[tokio::test]
    async fn order_fans_out_and_first_accept_wins() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, mock) = agent(dir.path());

        place_order(&agent, CUSTOMER).await;

        // Both workers got a copy; the customer got the ticket number.
        assert!(mock
            .last_text_to(ChatId(CUSTOMER))
            .unwrap()
            .contains("ticket #61"));
        for worker in [WORKER_A, WORKER_B] {
            let copies = mock.sent_to(ChatId(worker));
            assert_eq!(copies.len(), 1);
            assert!(copies[0].msg.text.contains("Ticket #61"));
        }
        mock.clear();

        agent.handle_event(tap_event(WORKER_A, "accept:61")).await;
        assert_eq!(mock.answered().len(), 1);
        // Loser's copy deleted, winner told, customer told.
        assert_eq!(mock.deleted().len(), 1);
        assert_eq!(mock.deleted()[0].chat, ChatId(WORKER_B));
        assert!(mock
            .last_text_to(ChatId(WORKER_A))
            .unwrap()
            .contains("You took ticket #61"));
        assert!(mock
            .last_text_to(ChatId(CUSTOMER))
            .unwrap()
            .contains("accepted"));

        // The race loser is rejected with the current holder.
        agent.handle_event(text_event(WORKER_B, "/accept 61")).await;
        assert!(mock
            .last_text_to(ChatId(WORKER_B))
            .unwrap()
            .contains("already accepted"));
    }

    #[tokio::test]
    async fn third_order_in_window_is_rate_limited() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, mock) = agent(dir.path());

        place_order(&agent, CUSTOMER).await;
        place_order(&agent, CUSTOMER).await;
        place_order(&agent, CUSTOMER).await;

        assert!(mock
            .last_text_to(ChatId(CUSTOMER))
            .unwrap()
            .contains("Try again in"));
        // Only the first two became tickets.
        assert_eq!(agent.registry().open_for(ChatId(CUSTOMER)).len(), 2);
    }

    #[tokio::test]
    async fn loose_text_is_relayed_onto_the_open_ticket() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, mock) = agent(dir.path());

        place_order(&agent, CUSTOMER).await;
        mock.clear();

        agent
            .handle_event(text_event(CUSTOMER, "please make it extra spicy"))
            .await;
        for worker in [WORKER_A, WORKER_B] {
            let relayed = mock.last_text_to(ChatId(worker)).unwrap();
            assert!(relayed.contains("extra spicy"));
            assert!(relayed.contains("#61"));
        }
    }

    #[tokio::test]
    async fn worker_reply_to_notice_reaches_the_customer() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, mock) = agent(dir.path());

        place_order(&agent, CUSTOMER).await;
        let notice = mock.sent_to(ChatId(WORKER_A))[0].sent_as;
        mock.clear();

        let mut reply = text_event(WORKER_A, "on the way");
        reply.replied_to = Some(notice.message);
        agent.handle_event(reply).await;

        let text = mock.last_text_to(ChatId(CUSTOMER)).unwrap();
        assert!(text.contains("on the way"));
        assert!(text.contains("#61"));
    }

    #[tokio::test]
    async fn ban_cascades_and_silences_the_customer() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, mock) = agent(dir.path());

        place_order(&agent, CUSTOMER).await;
        agent
            .handle_event(text_event(WORKER_A, &format!("/ban {CUSTOMER}")))
            .await;
        assert!(mock
            .last_text_to(ChatId(WORKER_A))
            .unwrap()
            .contains("closed 1 ticket(s)"));
        assert!(agent.registry().open_for(ChatId(CUSTOMER)).is_empty());

        mock.clear();
        agent.handle_event(text_event(CUSTOMER, "/start")).await;
        agent.handle_event(text_event(CUSTOMER, "hello?")).await;
        assert!(mock.sent_to(ChatId(CUSTOMER)).is_empty());
    }

    #[tokio::test]
    async fn close_reports_profit_and_cut_to_the_worker() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, mock) = agent(dir.path());

        place_order(&agent, CUSTOMER).await;
        agent.handle_event(text_event(WORKER_A, "/accept 61")).await;
        mock.clear();

        agent
            .handle_event(text_event(WORKER_A, "/close 61 100 smooth"))
            .await;
        let text = mock.last_text_to(ChatId(WORKER_A)).unwrap();
        assert!(text.contains("Profit $100.00"));
        assert!(text.contains("cut $25.00"));
        assert!(mock
            .last_text_to(ChatId(CUSTOMER))
            .unwrap()
            .contains("complete"));
    }

    #[tokio::test]
    async fn log_request_pings_providers_and_provision_returns_to_assignee() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, mock) = agent(dir.path());

        place_order(&agent, CUSTOMER).await;
        agent.handle_event(text_event(WORKER_A, "/accept 61")).await;
        mock.clear();

        agent.handle_event(text_event(WORKER_A, "/log 61")).await;
        assert!(mock
            .last_text_to(ChatId(PROVIDER))
            .unwrap()
            .contains("Log requested for ticket #61"));

        agent
            .handle_event(text_event(PROVIDER, "/provide 61 the account log"))
            .await;
        assert!(mock
            .last_text_to(ChatId(WORKER_A))
            .unwrap()
            .contains("the account log"));
    }

    #[tokio::test]
    async fn provider_reply_to_ping_delivers_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, mock) = agent(dir.path());

        place_order(&agent, CUSTOMER).await;
        agent.handle_event(text_event(WORKER_A, "/accept 61")).await;
        agent.handle_event(text_event(WORKER_A, "/log 61")).await;
        let ping = mock.sent_to(ChatId(PROVIDER))[0].sent_as;
        mock.clear();

        let mut reply = text_event(PROVIDER, "account: alice / hunter2");
        reply.replied_to = Some(ping.message);
        agent.handle_event(reply).await;

        assert!(mock
            .last_text_to(ChatId(WORKER_A))
            .unwrap()
            .contains("account: alice / hunter2"));
        assert!(mock
            .last_text_to(ChatId(PROVIDER))
            .unwrap()
            .contains("Log delivered"));
    }

    #[tokio::test]
    async fn panel_view_and_drop_callbacks_work() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, mock) = agent(dir.path());

        place_order(&agent, CUSTOMER).await;
        mock.clear();

        agent.handle_event(tap_event(WORKER_A, "view:61")).await;
        let viewed = mock.last_text_to(ChatId(WORKER_A)).unwrap();
        assert!(viewed.contains("Ticket #61"));
        assert!(viewed.contains("9 Elm Ave"));

        agent.handle_event(tap_event(WORKER_A, "drop:61")).await;
        assert!(agent.registry().open_for(ChatId(CUSTOMER)).is_empty());
        assert!(mock
            .last_text_to(ChatId(CUSTOMER))
            .unwrap()
            .contains("closed by our team"));
    }

    #[tokio::test]
    async fn accepted_notice_offers_close_ban_and_log_controls() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, mock) = agent(dir.path());

        place_order(&agent, CUSTOMER).await;
        agent.handle_event(tap_event(WORKER_A, "accept:61")).await;

        // The winner's edited copy swaps Accept for the assignment controls.
        let edits = mock.edited();
        let (target, copy) = edits.last().unwrap();
        assert_eq!(target.chat, ChatId(WORKER_A));
        assert!(copy.text.contains("Accepted by"));
        let Some(Keyboard::Inline(rows)) = &copy.keyboard else {
            panic!("accepted notice lost its keyboard");
        };
        let payloads: Vec<&str> = rows.iter().flatten().map(|b| b.action.as_str()).collect();
        assert_eq!(payloads, vec!["drop:61", "ban:61", "logreq:61"]);
        mock.clear();

        // The log control pings the provider audience.
        agent.handle_event(tap_event(WORKER_A, "logreq:61")).await;
        assert!(mock
            .last_text_to(ChatId(PROVIDER))
            .unwrap()
            .contains("Log requested for ticket #61"));

        // The ban control resolves the customer chat off the ticket.
        agent.handle_event(tap_event(WORKER_A, "ban:61")).await;
        assert!(mock
            .last_text_to(ChatId(WORKER_A))
            .unwrap()
            .contains("closed 1 ticket(s)"));
        assert!(agent.registry().open_for(ChatId(CUSTOMER)).is_empty());

        mock.clear();
        agent.handle_event(text_event(CUSTOMER, "hello?")).await;
        assert!(mock.sent_to(ChatId(CUSTOMER)).is_empty());
    }

    #[tokio::test]
    async fn scripted_service_collects_answers_into_a_ticket() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, mock) = agent(dir.path());

        let flight = |text: &str| InboundEvent {
            service: ServiceKind::Flight,
            ..text_event(CUSTOMER, text)
        };

        agent.handle_event(flight("/start")).await;
        for answer in ["Jun 1-8", "Alice Jones, 1990-01-01", "TX", "450", "Delta"] {
            agent.handle_event(flight(answer)).await;
        }

        assert!(mock
            .last_text_to(ChatId(CUSTOMER))
            .unwrap()
            .contains("ticket #61"));
        let copy = mock.last_text_to(ChatId(WORKER_A)).unwrap();
        assert!(copy.contains("Flights"));
        assert!(copy.contains("Jun 1-8"));
    }
}
