//! # asro-channels
//!
//! Messaging platform integrations for Asro. Currently WhatsApp only.

mod session_store;
pub mod whatsapp;

pub use whatsapp::WhatsAppChannel;
