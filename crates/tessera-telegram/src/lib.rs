// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport adapter for the Tessera concierge bot.
//!
//! Implements [`Transport`] over the Telegram Bot API via teloxide: long
//! polling per bot instance, abstract keyboards mapped to Telegram markup,
//! and every outbound call bounded by the configured send timeout.

pub mod inbound;
pub mod markup;

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::requests::Request;
use teloxide::types::{InputFile, ParseMode, Recipient, ReplyParameters};
use tessera_config::model::TelegramConfig;
use tessera_core::{
    ChatId, InboundEvent, MessageRef, OutboundMessage, ServiceKind, TesseraError, Transport,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One Telegram bot connection serving a single service.
///
/// Inbound updates are normalized into [`InboundEvent`]s and drained through
/// [`TelegramChannel::recv`]; outbound traffic goes through the [`Transport`]
/// impl.
pub struct TelegramChannel {
    bot: Bot,
    service: ServiceKind,
    timeout: Duration,
    inbound_tx: mpsc::Sender<InboundEvent>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a channel for `service` with the given bot token.
    pub fn new(
        service: ServiceKind,
        token: &str,
        config: &TelegramConfig,
    ) -> Result<Self, TesseraError> {
        if token.is_empty() {
            return Err(TesseraError::Config(format!(
                "telegram token for the {service} bot cannot be empty"
            )));
        }
        let (inbound_tx, inbound_rx) = mpsc::channel(100);
        Ok(Self {
            bot: Bot::new(token),
            service,
            timeout: Duration::from_secs(config.send_timeout_secs),
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            polling_handle: None,
        })
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    /// Starts long polling. Idempotent.
    pub fn connect(&mut self) {
        if self.polling_handle.is_some() {
            return;
        }
        let bot = self.bot.clone();
        let service = self.service;
        let inbound_tx = self.inbound_tx.clone();

        info!(service = %service, "starting Telegram long polling");

        let handle = tokio::spawn(async move {
            loop {
                let message_tx = inbound_tx.clone();
                let callback_tx = inbound_tx.clone();
                let handler = dptree::entry()
                    .branch(Update::filter_message().endpoint(move |msg: Message| {
                        let tx = message_tx.clone();
                        async move {
                            match inbound::message_event(service, &msg) {
                                Some(event) => {
                                    if tx.send(event).await.is_err() {
                                        warn!("inbound channel closed, dropping message");
                                    }
                                }
                                None => {
                                    debug!(msg_id = msg.id.0, "ignoring senderless message");
                                }
                            }
                            respond(())
                        }
                    }))
                    .branch(
                        Update::filter_callback_query().endpoint(move |query: CallbackQuery| {
                            let tx = callback_tx.clone();
                            async move {
                                if let Some(event) = inbound::callback_event(service, &query) {
                                    if tx.send(event).await.is_err() {
                                        warn!("inbound channel closed, dropping interaction");
                                    }
                                }
                                respond(())
                            }
                        }),
                    );

                Dispatcher::builder(bot.clone(), handler)
                    .default_handler(|_| async {})
                    .build()
                    .dispatch()
                    .await;

                warn!(service = %service, "polling stopped, reconnecting in 5s");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        });
        self.polling_handle = Some(handle);
    }

    /// Next inbound event, or `None` once the polling task is gone.
    pub async fn recv(&self) -> Option<InboundEvent> {
        self.inbound_rx.lock().await.recv().await
    }

    /// Wrap an outbound call with the configured deadline.
    async fn bounded<T, E, F>(&self, call: F) -> Result<T, TesseraError>
    where
        E: std::error::Error + Send + Sync + 'static,
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TesseraError::Transport {
                message: e.to_string(),
                source: Some(Box::new(e)),
            }),
            Err(_) => Err(TesseraError::Timeout {
                duration: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl Transport for TelegramChannel {
    async fn send(
        &self,
        chat: ChatId,
        msg: OutboundMessage,
    ) -> Result<MessageRef, TesseraError> {
        let recipient = Recipient::Id(teloxide::types::ChatId(chat.0));
        let build = |html: bool| {
            let mut request = self
                .bot
                .send_message(recipient.clone(), msg.text.clone());
            if html {
                request = request.parse_mode(ParseMode::Html);
            }
            if let Some(keyboard) = msg.keyboard.clone() {
                request = request.reply_markup(markup::to_reply_markup(keyboard));
            }
            if let Some(reply_to) = msg.reply_to {
                request = request.reply_parameters(ReplyParameters::new(
                    teloxide::types::MessageId(reply_to.0 as i32),
                ));
            }
            request
        };
        let sent = match self.bounded(build(true).send()).await {
            Ok(sent) => sent,
            // Customer text can break HTML entity parsing; deliver it plain.
            Err(TesseraError::Transport { message, .. })
                if message.contains("can't parse entities") =>
            {
                self.bounded(build(false).send()).await?
            }
            Err(e) => return Err(e),
        };
        Ok(MessageRef {
            chat,
            message: tessera_core::MessageId(sent.id.0 as i64),
        })
    }

    async fn edit(&self, target: MessageRef, msg: OutboundMessage) -> Result<(), TesseraError> {
        let chat = teloxide::types::ChatId(target.chat.0);
        let message_id = teloxide::types::MessageId(target.message.0 as i32);
        let build = |html: bool| {
            let mut request = self
                .bot
                .edit_message_text(chat, message_id, msg.text.clone());
            if html {
                request = request.parse_mode(ParseMode::Html);
            }
            if let Some(tessera_core::Keyboard::Inline(rows)) = msg.keyboard.clone() {
                request = request.reply_markup(markup::to_inline_markup(rows));
            }
            request
        };
        match self.bounded(build(true).send()).await {
            Ok(_) => Ok(()),
            // Re-rendering identical content is not an error worth surfacing.
            Err(TesseraError::Transport { message, .. })
                if message.contains("message is not modified") =>
            {
                Ok(())
            }
            Err(TesseraError::Transport { message, .. })
                if message.contains("can't parse entities") =>
            {
                self.bounded(build(false).send()).await.map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, target: MessageRef) -> Result<(), TesseraError> {
        let chat = teloxide::types::ChatId(target.chat.0);
        let message_id = teloxide::types::MessageId(target.message.0 as i32);
        self.bounded(self.bot.delete_message(chat, message_id).send())
            .await?;
        Ok(())
    }

    async fn answer(&self, interaction_id: &str, text: Option<&str>) -> Result<(), TesseraError> {
        let mut request = self.bot.answer_callback_query(teloxide::types::CallbackQueryId(interaction_id.to_owned()));
        if let Some(text) = text {
            request = request.text(text);
        }
        self.bounded(request.send()).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        photo: &Path,
        caption: OutboundMessage,
    ) -> Result<MessageRef, TesseraError> {
        let recipient = Recipient::Id(teloxide::types::ChatId(chat.0));
        let mut request = self
            .bot
            .send_photo(recipient, InputFile::file(photo.to_path_buf()))
            .caption(caption.text);
        if let Some(keyboard) = caption.keyboard {
            request = request.reply_markup(markup::to_reply_markup(keyboard));
        }
        let sent = self.bounded(request.send()).await?;
        Ok(MessageRef {
            chat,
            message: tessera_core::MessageId(sent.id.0 as i64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_empty_token() {
        let config = TelegramConfig::default();
        assert!(TelegramChannel::new(ServiceKind::Food, "", &config).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        let config = TelegramConfig::default();
        let channel = TelegramChannel::new(
            ServiceKind::Flight,
            "123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11",
            &config,
        )
        .unwrap();
        assert_eq!(channel.service(), ServiceKind::Flight);
    }

    #[test]
    fn timeout_comes_from_config() {
        let config = TelegramConfig {
            send_timeout_secs: 3,
            ..TelegramConfig::default()
        };
        let channel = TelegramChannel::new(ServiceKind::Food, "test:token", &config).unwrap();
        assert_eq!(channel.timeout, Duration::from_secs(3));
    }
}
