// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements `Transport` by recording every outbound call
//! and handing out sequential message ids, so tests can assert on exactly
//! what was sent, edited, and deleted per chat.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tessera_core::{
    ChatId, MessageId, MessageRef, OutboundMessage, TesseraError, Transport,
};

/// One recorded `send` call.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat: ChatId,
    pub msg: OutboundMessage,
    pub sent_as: MessageRef,
}

#[derive(Default)]
struct Recorded {
    sent: Vec<SentMessage>,
    edited: Vec<(MessageRef, OutboundMessage)>,
    deleted: Vec<MessageRef>,
    answered: Vec<(String, Option<String>)>,
    fail_chats: HashSet<ChatId>,
}

/// A recording transport. Message ids are handed out sequentially starting
/// at 1 across all chats.
#[derive(Default)]
pub struct MockTransport {
    next_id: AtomicI64,
    recorded: Mutex<Recorded>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Make every call targeting `chat` fail, for best-effort fan-out tests.
    pub fn fail_chat(&self, chat: ChatId) {
        self.recorded.lock().unwrap().fail_chats.insert(chat);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.recorded.lock().unwrap().sent.clone()
    }

    /// Messages sent to one chat, in order.
    pub fn sent_to(&self, chat: ChatId) -> Vec<SentMessage> {
        self.recorded
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|s| s.chat == chat)
            .cloned()
            .collect()
    }

    /// Text of the last message sent to `chat`, if any.
    pub fn last_text_to(&self, chat: ChatId) -> Option<String> {
        self.sent_to(chat).last().map(|s| s.msg.text.clone())
    }

    pub fn edited(&self) -> Vec<(MessageRef, OutboundMessage)> {
        self.recorded.lock().unwrap().edited.clone()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.recorded.lock().unwrap().deleted.clone()
    }

    pub fn answered(&self) -> Vec<(String, Option<String>)> {
        self.recorded.lock().unwrap().answered.clone()
    }

    pub fn clear(&self) {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.sent.clear();
        recorded.edited.clear();
        recorded.deleted.clear();
        recorded.answered.clear();
    }

    fn fails(&self, chat: ChatId) -> bool {
        self.recorded.lock().unwrap().fail_chats.contains(&chat)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        chat: ChatId,
        msg: OutboundMessage,
    ) -> Result<MessageRef, TesseraError> {
        if self.fails(chat) {
            return Err(TesseraError::transport("mock send failure"));
        }
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let sent_as = MessageRef { chat, message: id };
        self.recorded.lock().unwrap().sent.push(SentMessage {
            chat,
            msg,
            sent_as,
        });
        Ok(sent_as)
    }

    async fn edit(&self, target: MessageRef, msg: OutboundMessage) -> Result<(), TesseraError> {
        if self.fails(target.chat) {
            return Err(TesseraError::transport("mock edit failure"));
        }
        self.recorded.lock().unwrap().edited.push((target, msg));
        Ok(())
    }

    async fn delete(&self, target: MessageRef) -> Result<(), TesseraError> {
        if self.fails(target.chat) {
            return Err(TesseraError::transport("mock delete failure"));
        }
        self.recorded.lock().unwrap().deleted.push(target);
        Ok(())
    }

    async fn answer(&self, interaction_id: &str, text: Option<&str>) -> Result<(), TesseraError> {
        self.recorded
            .lock()
            .unwrap()
            .answered
            .push((interaction_id.to_string(), text.map(str::to_string)));
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        _photo: &Path,
        caption: OutboundMessage,
    ) -> Result<MessageRef, TesseraError> {
        // Photos degrade to text in the mock; callers already fall back.
        self.send(chat, caption).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_assigns_sequential_ids() {
        let transport = MockTransport::new();
        let a = transport
            .send(ChatId(1), OutboundMessage::text("one"))
            .await
            .unwrap();
        let b = transport
            .send(ChatId(2), OutboundMessage::text("two"))
            .await
            .unwrap();
        assert_eq!(a.message, MessageId(1));
        assert_eq!(b.message, MessageId(2));
        assert_eq!(transport.sent().len(), 2);
        assert_eq!(transport.last_text_to(ChatId(2)).as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn fail_chat_rejects_calls_to_that_chat_only() {
        let transport = MockTransport::new();
        transport.fail_chat(ChatId(9));
        assert!(transport
            .send(ChatId(9), OutboundMessage::text("x"))
            .await
            .is_err());
        assert!(transport
            .send(ChatId(1), OutboundMessage::text("y"))
            .await
            .is_ok());
        assert_eq!(transport.sent_to(ChatId(9)).len(), 0);
        assert_eq!(transport.sent_to(ChatId(1)).len(), 1);
    }

    #[tokio::test]
    async fn edits_and_deletes_are_recorded() {
        let transport = MockTransport::new();
        let sent = transport
            .send(ChatId(1), OutboundMessage::text("v1"))
            .await
            .unwrap();
        transport
            .edit(sent, OutboundMessage::text("v2"))
            .await
            .unwrap();
        transport.delete(sent).await.unwrap();
        assert_eq!(transport.edited().len(), 1);
        assert_eq!(transport.deleted(), vec![sent]);
    }
}
