//! Bot lifecycle — building the WhatsApp bot and running it in the background.

use super::events::handle_message;
use super::qr::generate_qr_terminal;
use super::WhatsAppChannel;
use crate::session_store::SqliteSessionStore;
use asro_core::{error::AsroError, message::IncomingMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

impl WhatsAppChannel {
    /// Build a WhatsApp bot with the event handler and run it in the background.
    ///
    /// When no valid session exists the library emits QR codes; they are
    /// rendered to the terminal so the owner can scan from the phone.
    pub(super) async fn build_and_run_bot(
        &self,
        tx: mpsc::Sender<IncomingMessage>,
    ) -> Result<(), AsroError> {
        let db_path = self.session_db_path();
        let allowed_users = self.config.allowed_users.clone();
        let client_handle = self.client.clone();

        info!("WhatsApp bot building (session: {db_path})...");

        let backend = Arc::new(
            SqliteSessionStore::new(&db_path)
                .await
                .map_err(|e| AsroError::Channel(format!("whatsapp store init failed: {e}")))?,
        );

        let client_for_event = client_handle.clone();

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_os_info(Some(self.device_name.to_uppercase()), None)
            .on_event(move |event, client| {
                let tx = tx.clone();
                let allowed = allowed_users.clone();
                let client_store = client_for_event.clone();
                async move {
                    match event {
                        Event::PairingQrCode { code, .. } => {
                            match generate_qr_terminal(&code) {
                                Ok(rendered) => {
                                    println!("\nScan this QR code with WhatsApp on your phone");
                                    println!("(Linked Devices > Link a Device):\n");
                                    println!("{rendered}");
                                }
                                Err(e) => warn!("QR render failed: {e}"),
                            }
                        }
                        Event::PairSuccess(_) => {
                            info!("WhatsApp pairing successful!");
                        }
                        Event::Connected(_) => {
                            info!("WhatsApp connected");
                            *client_store.lock().await = Some(client);
                        }
                        Event::Disconnected(_) => {
                            warn!("WhatsApp disconnected");
                            *client_store.lock().await = None;
                        }
                        Event::LoggedOut(_) => {
                            warn!("WhatsApp logged out — session invalidated");
                            *client_store.lock().await = None;
                        }
                        Event::Message(msg, info) => {
                            handle_message(*msg, info, &tx, &allowed).await;
                        }
                        _ => {}
                    }
                }
            })
            .build()
            .await
            .map_err(|e| AsroError::Channel(format!("whatsapp bot build failed: {e}")))?;

        // Store client reference immediately if already connected.
        *client_handle.lock().await = Some(bot.client());

        let _handle = bot
            .run()
            .await
            .map_err(|e| AsroError::Channel(format!("whatsapp bot run failed: {e}")))?;

        info!("WhatsApp bot started");
        Ok(())
    }
}
