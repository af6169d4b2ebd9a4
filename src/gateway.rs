//! Gateway — the main event loop connecting channels to the provider.
//!
//! Messages from all channels are fanned into one queue and handled
//! strictly one at a time, in arrival order. A failure while handling one
//! message never takes the loop down.

mod mode;
mod responder;

pub use mode::ModeController;
pub use responder::Responder;

use asro_core::{
    config::Config,
    message::{IncomingMessage, OutgoingMessage},
    traits::{Channel, Provider},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// The central gateway that routes messages between channels and the provider.
pub struct Gateway {
    channels: HashMap<String, Arc<dyn Channel>>,
    mode: ModeController,
    responder: Responder,
    provider_name: String,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        provider: Arc<dyn Provider>,
        channels: HashMap<String, Arc<dyn Channel>>,
        config: &Config,
    ) -> Self {
        Self {
            channels,
            mode: ModeController::new(&config.commands, &config.persona),
            responder: Responder::new(provider.clone(), config.persona.clone()),
            provider_name: provider.name().to_string(),
        }
    }

    /// Run the main event loop until shutdown.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!(
            "Asro gateway running | provider: {} | channels: {}",
            self.provider_name,
            self.channels.keys().cloned().collect::<Vec<_>>().join(", "),
        );

        let (tx, mut rx) = mpsc::channel::<IncomingMessage>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(msg) = channel_rx.recv().await {
                    if tx.send(msg).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        loop {
            tokio::select! {
                Some(incoming) = rx.recv() => {
                    self.handle_message(incoming).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                error!("failed to stop channel {name}: {e}");
            }
        }
        Ok(())
    }

    /// Handle one incoming message end to end.
    ///
    /// Reply send failures are logged and swallowed so one bad message
    /// cannot stop the loop.
    async fn handle_message(&mut self, incoming: IncomingMessage) {
        let channel_name = incoming.channel.clone();
        let Some(reply) = self.dispatch(incoming).await else {
            return;
        };

        let Some(channel) = self.channels.get(&channel_name) else {
            error!("no channel '{channel_name}' to send reply on");
            return;
        };
        if let Err(e) = channel.send(reply).await {
            error!("failed to send reply on {channel_name}: {e}");
        }
    }

    /// Decide what, if anything, to reply to a message.
    ///
    /// Order matters: own messages and empty text are dropped first, then
    /// toggle commands are handled (in both modes), then the mode gate,
    /// then generation.
    async fn dispatch(&mut self, incoming: IncomingMessage) -> Option<OutgoingMessage> {
        if incoming.from_me {
            debug!("ignoring own message {}", incoming.message_id);
            return None;
        }

        let text = incoming.text.trim();
        if text.is_empty() {
            return None;
        }

        info!(
            "[{}] message from {} ({} chars)",
            incoming.channel,
            incoming.sender_id,
            text.len()
        );

        if let Some(confirmation) = self.mode.handle_command(text) {
            info!(
                "AI mode now {} (command from {})",
                if self.mode.is_enabled() { "enabled" } else { "disabled" },
                incoming.sender_id
            );
            return Some(OutgoingMessage::reply_to(&incoming, confirmation));
        }

        if !self.mode.is_enabled() {
            debug!("AI disabled, staying silent for {}", incoming.sender_id);
            return None;
        }

        let reply = self.responder.respond(&incoming.sender_id, text).await;
        Some(OutgoingMessage::reply_to(&incoming, reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use asro_core::error::GenerateError;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Provider that always answers with a fixed reply, or a fixed error.
    struct FixedProvider {
        reply: Result<String, GenerateError>,
        calls: Mutex<usize>,
    }

    impl FixedProvider {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: Mutex::new(0),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(GenerateError::from_status(status, "scripted failure")),
                calls: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn requires_api_key(&self) -> bool {
            false
        }

        async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
            *self.calls.lock().unwrap() += 1;
            self.reply.clone()
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    fn gateway(provider: Arc<dyn Provider>) -> Gateway {
        Gateway::new(provider, HashMap::new(), &Config::default())
    }

    fn incoming(text: &str) -> IncomingMessage {
        IncomingMessage {
            id: Uuid::new_v4(),
            channel: "whatsapp".into(),
            message_id: "3EB0C431".into(),
            sender_id: "628123456789".into(),
            sender_jid: "628123456789@s.whatsapp.net".into(),
            sender_name: Some("Budi".into()),
            text: text.into(),
            timestamp: Utc::now(),
            from_me: false,
            reply_target: Some("628123456789@s.whatsapp.net".into()),
        }
    }

    #[tokio::test]
    async fn test_normal_message_gets_generated_reply() {
        let provider = FixedProvider::ok("Halo, saya Asro!");
        let mut gw = gateway(provider.clone());
        let reply = gw.dispatch(incoming("hai")).await.expect("should reply");
        assert_eq!(reply.text, "Halo, saya Asro!");
        assert!(reply.quote.is_some(), "reply should quote the original");
        assert_eq!(*provider.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_own_messages_ignored() {
        let provider = FixedProvider::ok("x");
        let mut gw = gateway(provider.clone());
        let mut msg = incoming("hai");
        msg.from_me = true;
        assert!(gw.dispatch(msg).await.is_none());
        assert_eq!(*provider.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_text_ignored() {
        let provider = FixedProvider::ok("x");
        let mut gw = gateway(provider.clone());
        assert!(gw.dispatch(incoming("   ")).await.is_none());
        assert_eq!(*provider.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_disable_silences_until_reenabled() {
        let provider = FixedProvider::ok("Jawaban AI");
        let mut gw = gateway(provider.clone());

        let off = gw.dispatch(incoming("stopai")).await.expect("confirmation");
        assert!(off.text.contains("berhenti"));

        // While disabled, ordinary messages get no reply and no provider call.
        assert!(gw.dispatch(incoming("halo?")).await.is_none());
        assert_eq!(*provider.calls.lock().unwrap(), 0);

        let on = gw.dispatch(incoming("onai")).await.expect("confirmation");
        assert!(on.text.contains("aktif kembali"));

        let reply = gw.dispatch(incoming("halo?")).await.expect("reply");
        assert_eq!(reply.text, "Jawaban AI");
        assert_eq!(*provider.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_command_never_reaches_provider() {
        let provider = FixedProvider::ok("x");
        let mut gw = gateway(provider.clone());
        gw.dispatch(incoming("stopai")).await;
        gw.dispatch(incoming("onai")).await;
        assert_eq!(*provider.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_apology() {
        let provider = FixedProvider::failing(500);
        let mut gw = gateway(provider);
        let reply = gw.dispatch(incoming("hai")).await.expect("apology");
        assert!(reply.text.starts_with("Maaf"));
    }

    #[tokio::test]
    async fn test_quota_failure_gets_quota_apology() {
        let provider = FixedProvider::failing(429);
        let mut gw = gateway(provider.clone());
        let reply = gw.dispatch(incoming("hai")).await.expect("apology");
        assert!(reply.text.contains("kuota"));
        assert_eq!(*provider.calls.lock().unwrap(), 1, "429 is never retried");
    }
}
