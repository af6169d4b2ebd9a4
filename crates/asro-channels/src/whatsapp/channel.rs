//! Channel trait implementation for WhatsApp.

use super::send::{retry_send, sanitize_for_whatsapp, split_message, MAX_MESSAGE_CHARS};
use super::WhatsAppChannel;
use async_trait::async_trait;
use asro_core::{
    error::AsroError,
    message::{IncomingMessage, OutgoingMessage, QuotedMessage},
    traits::Channel,
};
use tokio::sync::mpsc;
use tracing::info;
use wacore_binary::jid::Jid;

/// Build a reply that quotes the original message, WhatsApp-style.
fn quoted_text_message(text: &str, quote: &QuotedMessage) -> waproto::whatsapp::Message {
    waproto::whatsapp::Message {
        extended_text_message: Some(Box::new(waproto::whatsapp::message::ExtendedTextMessage {
            text: Some(text.to_string()),
            context_info: Some(Box::new(waproto::whatsapp::ContextInfo {
                stanza_id: Some(quote.message_id.clone()),
                participant: Some(quote.sender_jid.clone()),
                quoted_message: Some(Box::new(waproto::whatsapp::Message {
                    conversation: Some(quote.text.clone()),
                    ..Default::default()
                })),
                ..Default::default()
            })),
            ..Default::default()
        })),
        ..Default::default()
    }
}

impl WhatsAppChannel {
    /// Send a text message to a JID string (phone@s.whatsapp.net).
    ///
    /// The first chunk quotes the original message when the outgoing
    /// message carries a quote; overflow chunks go out plain.
    async fn send_text(
        &self,
        jid_str: &str,
        text: &str,
        quote: Option<&QuotedMessage>,
    ) -> Result<(), AsroError> {
        let client_guard = self.client.lock().await;
        let client = client_guard
            .as_ref()
            .ok_or_else(|| AsroError::Channel("whatsapp client not connected".into()))?;

        let jid: Jid = jid_str
            .parse()
            .map_err(|e| AsroError::Channel(format!("invalid whatsapp JID '{jid_str}': {e}")))?;

        let sanitized = sanitize_for_whatsapp(text);
        let chunks = split_message(&sanitized, MAX_MESSAGE_CHARS);
        for (i, chunk) in chunks.iter().enumerate() {
            let msg = match (i, quote) {
                (0, Some(q)) => quoted_text_message(chunk, q),
                _ => waproto::whatsapp::Message {
                    conversation: Some(chunk.to_string()),
                    ..Default::default()
                },
            };
            retry_send(client, &jid, msg).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, AsroError> {
        let (tx, rx) = mpsc::channel(64);
        self.build_and_run_bot(tx).await?;
        info!("WhatsApp channel started");
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), AsroError> {
        let target = message
            .reply_target
            .as_deref()
            .ok_or_else(|| AsroError::Channel("no reply_target on outgoing message".into()))?;

        self.send_text(target, &message.text, message.quote.as_ref())
            .await
    }

    async fn stop(&self) -> Result<(), AsroError> {
        info!("WhatsApp channel stopped");
        *self.client.lock().await = None;
        Ok(())
    }
}
