// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalization of raw Telegram updates into [`InboundEvent`]s.

use teloxide::types::{CallbackQuery, Message};
use tessera_core::{ChatId, InboundEvent, Interaction, MessageId, ServiceKind, UserId};

/// Map a chat message to an inbound event. Messages without a sender
/// (channel posts, service messages) are dropped.
pub fn message_event(service: ServiceKind, msg: &Message) -> Option<InboundEvent> {
    let from = msg.from.as_ref()?;
    let text = msg.text().map(str::to_string);
    let has_attachment = text.is_none()
        && (msg.photo().is_some()
            || msg.document().is_some()
            || msg.sticker().is_some()
            || msg.video().is_some()
            || msg.voice().is_some());
    Some(InboundEvent {
        service,
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId(from.id.0 as i64),
        username: from.username.clone(),
        first_name: Some(from.first_name.clone()),
        text,
        replied_to: msg
            .reply_to_message()
            .map(|replied| MessageId(replied.id.0 as i64)),
        interaction: None,
        has_attachment,
    })
}

/// Map a button tap to an inbound event. Taps without a payload carry no
/// meaning here and are dropped.
pub fn callback_event(service: ServiceKind, query: &CallbackQuery) -> Option<InboundEvent> {
    let payload = query.data.clone()?;
    let message = query.message.as_ref();
    Some(InboundEvent {
        service,
        chat_id: message
            .map(|m| ChatId(m.chat().id.0))
            .unwrap_or(ChatId(query.from.id.0 as i64)),
        user_id: UserId(query.from.id.0 as i64),
        username: query.from.username.clone(),
        first_name: Some(query.from.first_name.clone()),
        text: None,
        replied_to: message.map(|m| MessageId(m.id().0 as i64)),
        interaction: Some(Interaction {
            id: query.id.to_string(),
            payload,
        }),
        has_attachment: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(json: &str) -> Message {
        serde_json::from_str(json).expect("valid message json")
    }

    #[test]
    fn text_message_maps_sender_and_text() {
        let msg = message(
            r#"{
                "message_id": 5,
                "date": 1700000000,
                "chat": {"id": 100, "type": "private", "first_name": "Alice"},
                "from": {"id": 42, "is_bot": false, "first_name": "Alice", "username": "alice"},
                "text": "hello"
            }"#,
        );
        let event = message_event(ServiceKind::Food, &msg).unwrap();
        assert_eq!(event.chat_id, ChatId(100));
        assert_eq!(event.user_id, UserId(42));
        assert_eq!(event.text.as_deref(), Some("hello"));
        assert_eq!(event.sender_tag(), "@alice");
        assert!(!event.has_attachment);
        assert!(event.interaction.is_none());
    }

    #[test]
    fn reply_message_carries_replied_to_id() {
        let msg = message(
            r#"{
                "message_id": 9,
                "date": 1700000000,
                "chat": {"id": 100, "type": "private", "first_name": "Alice"},
                "from": {"id": 42, "is_bot": false, "first_name": "Alice"},
                "text": "got it",
                "reply_to_message": {
                    "message_id": 7,
                    "date": 1700000000,
                    "chat": {"id": 100, "type": "private", "first_name": "Alice"},
                    "from": {"id": 1, "is_bot": true, "first_name": "Bot"},
                    "text": "ticket notice"
                }
            }"#,
        );
        let event = message_event(ServiceKind::Food, &msg).unwrap();
        assert_eq!(event.replied_to, Some(MessageId(7)));
    }

    #[test]
    fn photo_message_flags_attachment() {
        let msg = message(
            r#"{
                "message_id": 6,
                "date": 1700000000,
                "chat": {"id": 100, "type": "private", "first_name": "Alice"},
                "from": {"id": 42, "is_bot": false, "first_name": "Alice"},
                "photo": [{"file_id": "f", "file_unique_id": "u", "width": 1, "height": 1}]
            }"#,
        );
        let event = message_event(ServiceKind::Food, &msg).unwrap();
        assert!(event.has_attachment);
        assert!(event.text.is_none());
    }

    #[test]
    fn callback_maps_payload_and_interaction_id() {
        let query: CallbackQuery = serde_json::from_str(
            r#"{
                "id": "cbq-1",
                "from": {"id": 42, "is_bot": false, "first_name": "Worker"},
                "chat_instance": "ci",
                "data": "accept:61"
            }"#,
        )
        .expect("valid callback json");
        let event = callback_event(ServiceKind::Food, &query).unwrap();
        let interaction = event.interaction.unwrap();
        assert_eq!(interaction.payload, "accept:61");
        assert_eq!(interaction.id, "cbq-1");
        // Without an attached message the chat falls back to the tapper.
        assert_eq!(event.chat_id, ChatId(42));
    }
}
