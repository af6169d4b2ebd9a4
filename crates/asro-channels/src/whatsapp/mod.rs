//! WhatsApp channel — pure Rust implementation via `whatsapp-rust`.
//!
//! Uses the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Pairing is done by scanning a QR code, like WhatsApp Web. The QR is
//! rendered straight to the terminal on startup when no session exists.
//! Session is persisted to `{data_dir}/whatsapp_session/session.db`.

mod bot;
mod channel;
mod events;
mod qr;
mod send;


pub use qr::generate_qr_terminal;

use asro_core::config::WhatsAppConfig;
use std::sync::Arc;
use tokio::sync::Mutex;

/// WhatsApp channel using the WhatsApp Web protocol.
pub struct WhatsAppChannel {
    pub(super) config: WhatsAppConfig,
    pub(super) data_dir: String,
    /// Device name shown in the phone's linked-devices list.
    pub(super) device_name: String,
    /// Client handle for sending messages — set once connected.
    pub(super) client: Arc<Mutex<Option<Arc<whatsapp_rust::client::Client>>>>,
}

impl WhatsAppChannel {
    /// Create a new WhatsApp channel from config.
    pub fn new(config: WhatsAppConfig, data_dir: &str, device_name: &str) -> Self {
        Self {
            config,
            data_dir: data_dir.to_string(),
            device_name: device_name.to_string(),
            client: Arc::new(Mutex::new(None)),
        }
    }

    /// Check if the WhatsApp client is currently connected.
    pub async fn is_connected(&self) -> bool {
        self.client.lock().await.is_some()
    }

    /// Get the session database path, creating the directory if needed.
    pub(super) fn session_db_path(&self) -> String {
        let dir = asro_core::config::shellexpand(&self.data_dir);
        let session_dir = format!("{dir}/whatsapp_session");
        let _ = std::fs::create_dir_all(&session_dir);
        format!("{session_dir}/session.db")
    }
}
