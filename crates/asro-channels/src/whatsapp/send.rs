//! Message sending utilities — sanitization, chunking, and retry logic.

use asro_core::error::AsroError;
use tracing::{error, warn};
use wacore_binary::jid::Jid;
use whatsapp_rust::client::Client;

/// Retry delays for transport-level send failures: 500ms, 1s, 2s.
pub(super) const SEND_RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 2000];

/// WhatsApp rejects text messages beyond this length.
pub(super) const MAX_MESSAGE_CHARS: usize = 4096;

/// Send a WhatsApp message with retry and backoff.
///
/// Attempts up to 3 times with delays of 500ms, 1s, 2s between retries.
pub(super) async fn retry_send(
    client: &Client,
    jid: &Jid,
    msg: waproto::whatsapp::Message,
) -> Result<String, AsroError> {
    let mut last_err = None;

    for (attempt, delay_ms) in SEND_RETRY_DELAYS_MS.iter().enumerate() {
        match client.send_message(jid.clone(), msg.clone()).await {
            Ok(msg_id) => return Ok(msg_id),
            Err(e) => {
                let attempt_num = attempt + 1;
                if attempt_num < SEND_RETRY_DELAYS_MS.len() {
                    warn!(
                        "whatsapp send attempt {attempt_num}/{} failed: {e}, retrying in {delay_ms}ms",
                        SEND_RETRY_DELAYS_MS.len()
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
                } else {
                    error!(
                        "whatsapp send attempt {attempt_num}/{} failed: {e}, giving up",
                        SEND_RETRY_DELAYS_MS.len()
                    );
                }
                last_err = Some(e);
            }
        }
    }

    Err(AsroError::Channel(format!(
        "whatsapp send failed after {} attempts: {}",
        SEND_RETRY_DELAYS_MS.len(),
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Convert Markdown formatting to WhatsApp-native formatting.
///
/// - `## Header` -> `*HEADER*` (bold uppercase)
/// - `**bold**` -> `*bold*`
/// - `[text](url)` -> `text (url)`
/// - `---` horizontal rules -> removed
pub(super) fn sanitize_for_whatsapp(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim();

        // Remove horizontal rules.
        if trimmed.chars().all(|c| c == '-' || c == ' ') && trimmed.matches('-').count() >= 3 {
            continue;
        }

        // Convert markdown headers to bold uppercase.
        if let Some(header) = trimmed
            .strip_prefix("### ")
            .or_else(|| trimmed.strip_prefix("## "))
            .or_else(|| trimmed.strip_prefix("# "))
        {
            out.push_str(&format!("*{}*", header.trim().to_uppercase()));
            out.push('\n');
            continue;
        }

        let mut result = line.to_string();

        // Convert markdown links: [text](url) -> text (url)
        while let Some(start_bracket) = result.find('[') {
            if let Some(end_bracket) = result[start_bracket..].find("](") {
                let abs_end_bracket = start_bracket + end_bracket;
                if let Some(end_paren) = result[abs_end_bracket + 2..].find(')') {
                    let abs_end_paren = abs_end_bracket + 2 + end_paren;
                    let link_text = &result[start_bracket + 1..abs_end_bracket];
                    let url = &result[abs_end_bracket + 2..abs_end_paren];
                    let replacement = format!("{link_text} ({url})");
                    result.replace_range(start_bracket..=abs_end_paren, &replacement);
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        // Convert **bold** to *bold* (WhatsApp native).
        while let Some(start_pos) = result.find("**") {
            if let Some(end_pos) = result[start_pos + 2..].find("**") {
                let abs_end = start_pos + 2 + end_pos;
                let inner_text = result[start_pos + 2..abs_end].to_string();
                result.replace_range(start_pos..abs_end + 2, &format!("*{inner_text}*"));
            } else {
                break;
            }
        }

        out.push_str(&result);
        out.push('\n');
    }

    // Remove trailing newline if the original didn't have one.
    if !text.ends_with('\n') && out.ends_with('\n') {
        out.pop();
    }

    out
}

/// Split a message into chunks of at most `max_chars` characters.
///
/// Prefers breaking at a newline, then at a space, so words are not cut
/// mid-way. Always splits on char boundaries.
pub(super) fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.chars().count() <= max_chars {
            chunks.push(remaining.to_string());
            break;
        }

        let hard_limit: usize = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let window = &remaining[..hard_limit];

        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(hard_limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start_matches(['\n', ' ']);
    }

    chunks
}
