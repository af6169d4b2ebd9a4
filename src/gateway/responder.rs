//! Response generation — prompt building, bounded retry, apologies.
//!
//! Every message that reaches the responder gets a reply: either the
//! generated text or an apology matched to the failure kind. Overload
//! failures are retried with linear backoff; quota and unknown failures
//! are answered immediately.

use asro_core::{
    config::PersonaConfig,
    error::FailureKind,
    traits::Provider,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

/// Backoff before each retry after an overloaded (503) failure: 1s, 2s.
pub(crate) const GENERATE_RETRY_DELAYS_MS: [u64; 2] = [1000, 2000];

/// Sent when the provider stays overloaded after all retries.
pub(crate) const BUSY_APOLOGY: &str =
    "Maaf, layanan AI sedang sibuk. Mohon tunggu beberapa saat dan coba lagi.";

/// Sent when the provider reports quota exhaustion.
pub(crate) const QUOTA_APOLOGY: &str =
    "Maaf, kuota AI sudah mencapai batas. Mohon coba lagi besok.";

/// Sent for any other generation failure.
pub(crate) const GENERIC_APOLOGY: &str =
    "Maaf, saya mengalami kendala teknis. Mohon coba lagi dalam beberapa saat.";

/// Generates replies by wrapping user messages in the persona prompt.
pub struct Responder {
    provider: Arc<dyn Provider>,
    persona: PersonaConfig,
    /// Completed exchanges per sender, used to phrase the greeting rule.
    turns: Mutex<HashMap<String, u64>>,
}

impl Responder {
    pub fn new(provider: Arc<dyn Provider>, persona: PersonaConfig) -> Self {
        Self {
            provider,
            persona,
            turns: Mutex::new(HashMap::new()),
        }
    }

    /// Generate a reply for a message. Always returns something to send.
    pub async fn respond(&self, sender_id: &str, text: &str) -> String {
        let turn = {
            let turns = self.turns.lock().unwrap_or_else(|p| p.into_inner());
            turns.get(sender_id).copied().unwrap_or(0)
        };
        let prompt = self.build_prompt(text, turn);

        let mut retries = 0;
        loop {
            match self.provider.generate(&prompt).await {
                Ok(reply) => {
                    let mut turns = self.turns.lock().unwrap_or_else(|p| p.into_inner());
                    *turns.entry(sender_id.to_string()).or_insert(0) += 1;
                    return reply;
                }
                Err(e) => match e.kind {
                    FailureKind::Overloaded if retries < GENERATE_RETRY_DELAYS_MS.len() => {
                        let delay_ms = GENERATE_RETRY_DELAYS_MS[retries];
                        retries += 1;
                        warn!(
                            "provider overloaded, retry {retries}/{} in {delay_ms}ms: {e}",
                            GENERATE_RETRY_DELAYS_MS.len()
                        );
                        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    }
                    FailureKind::Overloaded => {
                        error!("provider still overloaded after {retries} retries: {e}");
                        return BUSY_APOLOGY.to_string();
                    }
                    FailureKind::QuotaExhausted => {
                        warn!("provider quota exhausted: {e}");
                        return QUOTA_APOLOGY.to_string();
                    }
                    FailureKind::Other => {
                        error!("generation failed: {e}");
                        return GENERIC_APOLOGY.to_string();
                    }
                },
            }
        }
    }

    /// Wrap the user message in the persona prompt.
    ///
    /// The greeting rule depends on whether this sender already completed
    /// an exchange: first contact asks for an introduction, later turns
    /// ask not to repeat it.
    fn build_prompt(&self, text: &str, turn: u64) -> String {
        let assistant = &self.persona.assistant_name;
        let owner = &self.persona.owner_name;
        let greeting_rule = if turn == 0 {
            format!("2. Perkenalkan diri sebagai {assistant} karena ini awal percakapan")
        } else {
            "2. Jangan mengulang perkenalan diri, langsung jawab pesannya".to_string()
        };
        debug!("building prompt (turn {turn})");
        format!(
            "Kamu adalah {assistant} (Asisten {owner}), asisten virtual milik {owner}. \
             Kamu harus menjawab dengan sopan, ramah, dan membantu.\n\
             Berikut beberapa aturan untuk menjawab:\n\
             1. Gunakan bahasa yang sopan dan formal\n\
             {greeting_rule}\n\
             3. Berikan jawaban yang informatif tapi ringkas\n\
             4. Jika ada yang bertanya tentang pemilikmu, jelaskan bahwa kamu adalah \
             asisten virtual milik {owner}\n\
             \n\
             Pesan dari pengguna: \"{text}\""
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use asro_core::error::GenerateError;
    use std::collections::VecDeque;

    /// Provider that replays a scripted sequence of results.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String, GenerateError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<String, GenerateError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn requires_api_key(&self) -> bool {
            false
        }

        async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
            self.calls.lock().unwrap().push(prompt.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GenerateError::other("script exhausted")))
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    fn overloaded() -> Result<String, GenerateError> {
        Err(GenerateError::from_status(503, "model overloaded"))
    }

    fn responder(script: Vec<Result<String, GenerateError>>) -> (Responder, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(script));
        (
            Responder::new(provider.clone(), PersonaConfig::default()),
            provider,
        )
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let (r, p) = responder(vec![Ok("Halo!".into())]);
        assert_eq!(r.respond("628123", "hai").await, "Halo!");
        assert_eq!(p.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overloaded_recovers_with_backoff() {
        let (r, p) = responder(vec![overloaded(), overloaded(), Ok("Sudah lega".into())]);
        let start = tokio::time::Instant::now();
        let reply = r.respond("628123", "hai").await;
        assert_eq!(reply, "Sudah lega");
        assert_eq!(p.calls.lock().unwrap().len(), 3);
        // Linear backoff: 1s after the first failure, 2s after the second.
        assert_eq!(start.elapsed(), std::time::Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overloaded_gives_up_after_two_retries() {
        let (r, p) = responder(vec![overloaded(), overloaded(), overloaded(), overloaded()]);
        let reply = r.respond("628123", "hai").await;
        assert_eq!(reply, BUSY_APOLOGY);
        // Initial attempt + 2 retries, never a fourth call.
        assert_eq!(p.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_quota_exhausted_not_retried() {
        let (r, p) = responder(vec![Err(GenerateError::from_status(429, "quota"))]);
        let reply = r.respond("628123", "hai").await;
        assert_eq!(reply, QUOTA_APOLOGY);
        assert_eq!(p.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_failure_not_retried() {
        let (r, p) = responder(vec![Err(GenerateError::from_status(500, "boom"))]);
        let reply = r.respond("628123", "hai").await;
        assert_eq!(reply, GENERIC_APOLOGY);
        assert_eq!(p.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_prompt_greeting_rule_changes_after_first_turn() {
        let (r, p) = responder(vec![Ok("Halo, saya Asro".into()), Ok("Tentu".into())]);
        r.respond("628123", "hai").await;
        r.respond("628123", "apa kabar?").await;

        let calls = p.calls.lock().unwrap();
        assert!(calls[0].contains("Perkenalkan diri sebagai Asro"));
        assert!(calls[1].contains("Jangan mengulang perkenalan"));
        // Persona framing and the user message are always present.
        for call in calls.iter() {
            assert!(call.contains("asisten virtual milik Abdul Rojak"));
        }
        assert!(calls[1].contains("Pesan dari pengguna: \"apa kabar?\""));
    }

    #[tokio::test]
    async fn test_turn_counts_are_per_sender() {
        let (r, p) = responder(vec![Ok("a".into()), Ok("b".into())]);
        r.respond("628111", "hai").await;
        r.respond("628222", "halo").await;

        let calls = p.calls.lock().unwrap();
        // A different sender is still on their first turn.
        assert!(calls[1].contains("Perkenalkan diri"));
    }

    #[tokio::test]
    async fn test_failed_exchange_does_not_advance_turn() {
        let (r, p) = responder(vec![
            Err(GenerateError::from_status(500, "boom")),
            Ok("Halo".into()),
        ]);
        r.respond("628123", "hai").await;
        r.respond("628123", "hai lagi").await;

        let calls = p.calls.lock().unwrap();
        assert!(calls[1].contains("Perkenalkan diri"));
    }
}
