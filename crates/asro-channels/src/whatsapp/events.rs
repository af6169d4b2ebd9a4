//! Incoming WhatsApp message handling — filtering, unwrapping, forwarding.

use asro_core::message::IncomingMessage;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Process an incoming WhatsApp message event.
///
/// Group messages and our own outgoing messages are dropped here, before
/// anything reaches the dispatch loop. Nested wrappers (device_sent,
/// ephemeral, view_once) are unwrapped to get at the text payload.
pub(super) async fn handle_message(
    msg: waproto::whatsapp::Message,
    info: wacore::types::message::MessageInfo,
    tx: &mpsc::Sender<IncomingMessage>,
    allowed: &[String],
) {
    debug!(
        "WA msg: is_group={}, is_from_me={}, sender={}, chat={}",
        info.source.is_group, info.source.is_from_me, info.source.sender.user, info.source.chat.user,
    );

    if info.source.is_group {
        debug!("WA filtered: ignoring group message");
        return;
    }
    if info.source.is_from_me {
        debug!("WA filtered: ignoring own message");
        return;
    }

    let phone = info.source.sender.user.clone();
    if !allowed.is_empty() && !allowed.contains(&phone) {
        warn!("ignoring whatsapp message from unauthorized {phone}");
        return;
    }

    // Unwrap nested wrappers (device_sent, ephemeral, view_once).
    let inner = msg
        .device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| {
            msg.ephemeral_message
                .as_ref()
                .and_then(|e| e.message.as_deref())
        })
        .or_else(|| {
            msg.view_once_message
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
        .unwrap_or(&msg);

    let text = inner
        .conversation
        .as_deref()
        .or_else(|| {
            inner
                .extended_text_message
                .as_ref()
                .and_then(|e| e.text.as_deref())
        })
        .unwrap_or("")
        .to_string();

    // Media, reactions, protocol messages — nothing to answer.
    if text.is_empty() {
        debug!("WA filtered: no text content");
        return;
    }

    let sender_name = if info.push_name.is_empty() {
        None
    } else {
        Some(info.push_name.clone())
    };

    let incoming = IncomingMessage {
        id: Uuid::new_v4(),
        channel: "whatsapp".to_string(),
        message_id: info.id.clone(),
        sender_id: phone,
        sender_jid: info.source.sender.to_string(),
        sender_name,
        text,
        timestamp: chrono::Utc::now(),
        from_me: false,
        reply_target: Some(info.source.chat.to_string()),
    };

    if tx.send(incoming).await.is_err() {
        info!("whatsapp channel receiver dropped");
    }
}
