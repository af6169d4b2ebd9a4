use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Name of the channel this message arrived on (e.g. "whatsapp").
    pub channel: String,
    /// Platform-native message ID (used to quote this message in a reply).
    pub message_id: String,
    /// Platform-specific user ID (e.g. the WhatsApp phone number).
    pub sender_id: String,
    /// Full sender JID, needed when quoting this message.
    pub sender_jid: String,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    /// Message text content. May be empty; empty messages produce no reply.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Whether the message was sent by the bot's own account.
    /// Self-originated messages are always ignored.
    #[serde(default)]
    pub from_me: bool,
    /// Platform-specific target for routing the reply (e.g. the chat JID).
    #[serde(default)]
    pub reply_target: Option<String>,
}

/// Reference to a message being quoted by a reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotedMessage {
    pub message_id: String,
    pub sender_jid: String,
    pub text: String,
}

/// An outgoing reply to send back through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    /// Platform-specific routing target.
    #[serde(default)]
    pub reply_target: Option<String>,
    /// When set, the reply is threaded as a quote of this message.
    #[serde(default)]
    pub quote: Option<QuotedMessage>,
}

impl OutgoingMessage {
    /// Build a reply to an incoming message, quoting it.
    pub fn reply_to(incoming: &IncomingMessage, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_target: incoming.reply_target.clone(),
            quote: Some(QuotedMessage {
                message_id: incoming.message_id.clone(),
                sender_jid: incoming.sender_jid.clone(),
                text: incoming.text.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(text: &str) -> IncomingMessage {
        IncomingMessage {
            id: Uuid::new_v4(),
            channel: "whatsapp".into(),
            message_id: "3EB0C431".into(),
            sender_id: "5511999887766".into(),
            sender_jid: "5511999887766@s.whatsapp.net".into(),
            sender_name: Some("Alice".into()),
            text: text.into(),
            timestamp: Utc::now(),
            from_me: false,
            reply_target: Some("5511999887766@s.whatsapp.net".into()),
        }
    }

    #[test]
    fn test_reply_quotes_original() {
        let msg = incoming("hello there");
        let reply = OutgoingMessage::reply_to(&msg, "hi!");
        assert_eq!(reply.text, "hi!");
        assert_eq!(reply.reply_target.as_deref(), msg.reply_target.as_deref());
        let quote = reply.quote.expect("reply should carry a quote");
        assert_eq!(quote.message_id, "3EB0C431");
        assert_eq!(quote.text, "hello there");
    }
}
