//! Runtime AI on/off toggle.
//!
//! Two literal commands flip the mode. Matching is exact against the whole
//! message text, trimmed and lowercased — a command inside a longer
//! sentence is just an ordinary message.

use asro_core::config::{CommandsConfig, PersonaConfig};

/// Whether the bot currently answers with AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiMode {
    Enabled,
    Disabled,
}

/// Owns the current [`AiMode`] and the command matching.
///
/// Commands are recognized in both modes, so the enable command always
/// works while the bot is silent. Repeating a command is harmless: the
/// mode is simply set again and the confirmation re-sent.
pub struct ModeController {
    mode: AiMode,
    disable_command: String,
    enable_command: String,
    disable_reply: String,
    enable_reply: String,
}

impl ModeController {
    /// Build from config. The bot starts with AI enabled.
    pub fn new(commands: &CommandsConfig, persona: &PersonaConfig) -> Self {
        let enable_command = commands.enable.trim().to_lowercase();
        Self {
            mode: AiMode::Enabled,
            disable_command: commands.disable.trim().to_lowercase(),
            disable_reply: format!(
                "Baik, saya akan berhenti menjawab menggunakan AI. \
                 Gunakan \"{enable_command}\" untuk mengaktifkan saya kembali."
            ),
            enable_reply: format!(
                "Halo! Saya {}, asisten virtual {}. \
                 Saya sudah aktif kembali dan siap membantu Anda!",
                persona.assistant_name, persona.owner_name
            ),
            enable_command,
        }
    }

    /// If the text is one of the toggle commands, flip the mode and return
    /// the confirmation reply. Returns `None` for ordinary messages.
    pub fn handle_command(&mut self, text: &str) -> Option<String> {
        let normalized = text.trim().to_lowercase();
        if normalized == self.disable_command {
            self.mode = AiMode::Disabled;
            Some(self.disable_reply.clone())
        } else if normalized == self.enable_command {
            self.mode = AiMode::Enabled;
            Some(self.enable_reply.clone())
        } else {
            None
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode == AiMode::Enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ModeController {
        ModeController::new(&CommandsConfig::default(), &PersonaConfig::default())
    }

    #[test]
    fn test_starts_enabled() {
        assert!(controller().is_enabled());
    }

    #[test]
    fn test_disable_then_enable() {
        let mut mc = controller();
        let reply = mc.handle_command("stopai").expect("should confirm");
        assert!(!mc.is_enabled());
        assert!(reply.contains("berhenti"));
        assert!(reply.contains("onai"), "should name the enable command");

        let reply = mc.handle_command("onai").expect("should confirm");
        assert!(mc.is_enabled());
        assert!(reply.contains("aktif kembali"));
        assert!(reply.contains("Asro"));
    }

    #[test]
    fn test_commands_recognized_while_disabled() {
        let mut mc = controller();
        mc.handle_command("stopai");
        // Disable again — idempotent, still confirmed.
        assert!(mc.handle_command("stopai").is_some());
        assert!(!mc.is_enabled());
        assert!(mc.handle_command("onai").is_some());
        assert!(mc.is_enabled());
    }

    #[test]
    fn test_case_insensitive_and_trimmed() {
        let mut mc = controller();
        assert!(mc.handle_command("  StopAI  ").is_some());
        assert!(!mc.is_enabled());
        assert!(mc.handle_command("ONAI").is_some());
        assert!(mc.is_enabled());
    }

    #[test]
    fn test_exact_match_only() {
        let mut mc = controller();
        assert!(mc.handle_command("please stopai now").is_none());
        assert!(mc.handle_command("stopai?").is_none());
        assert!(mc.is_enabled());
    }

    #[test]
    fn test_configured_commands() {
        let commands = CommandsConfig {
            disable: "/ai off".into(),
            enable: "/ai on".into(),
        };
        let mut mc = ModeController::new(&commands, &PersonaConfig::default());
        assert!(mc.handle_command("/AI OFF").is_some());
        assert!(!mc.is_enabled());
        // The default literals mean nothing now.
        assert!(mc.handle_command("stopai").is_none());
        assert!(mc.handle_command("/ai on").is_some());
        assert!(mc.is_enabled());
    }
}
