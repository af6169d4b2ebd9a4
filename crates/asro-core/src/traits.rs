use crate::{
    error::{AsroError, GenerateError},
    message::{IncomingMessage, OutgoingMessage},
};
use async_trait::async_trait;

/// Generative-language provider trait — the brain.
///
/// The dispatch layer only sees `generate(prompt) -> text or a classified
/// failure`; everything else about the API is the provider's business.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Whether this provider requires an API key to function.
    fn requires_api_key(&self) -> bool;

    /// Send a prompt to the provider and get the generated text.
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;

    /// Check if the provider is reachable and ready.
    async fn is_available(&self) -> bool;
}

/// Messaging channel trait — the transport.
///
/// Every messaging platform implements this to deliver incoming message
/// events and send replies.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    /// Returns a receiver that yields incoming messages in arrival order.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, AsroError>;

    /// Send a reply back through this channel.
    async fn send(&self, message: OutgoingMessage) -> Result<(), AsroError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), AsroError>;
}
