mod gateway;

use asro_channels::WhatsAppChannel;
use asro_core::{
    config,
    traits::{Channel, Provider},
};
use asro_providers::GeminiProvider;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "asro",
    version,
    about = "Asro — WhatsApp assistant bot backed by Gemini"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "asro.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Check configuration and provider availability.
    Status,
    /// Send a one-shot prompt to the provider.
    Ask {
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cfg.bot.log_level.clone())),
        )
        .init();

    match cli.command {
        Commands::Start => {
            cfg.validate()?;

            let provider = build_provider(&cfg);

            if !provider.is_available().await {
                // Transient API outages shouldn't stop startup; sends will
                // surface their own errors.
                warn!("provider '{}' is not reachable right now", provider.name());
            }

            let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();

            if cfg.whatsapp.enabled {
                let channel =
                    WhatsAppChannel::new(cfg.whatsapp.clone(), &cfg.bot.data_dir, &cfg.bot.name);
                channels.insert("whatsapp".to_string(), Arc::new(channel));
            }

            if channels.is_empty() {
                anyhow::bail!("No channels enabled. Enable at least one channel in asro.toml.");
            }

            println!("Asro — starting bot...");
            let mut gw = gateway::Gateway::new(provider, channels, &cfg);
            gw.run().await?;
        }
        Commands::Status => {
            println!("Asro — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Model: {}", cfg.gemini.model);
            println!();

            let provider = build_provider(&cfg);
            println!(
                "  gemini: {}",
                if cfg.gemini.api_key.is_empty() {
                    "missing api_key"
                } else if provider.is_available().await {
                    "available"
                } else {
                    "not reachable"
                }
            );

            println!(
                "  whatsapp: {}",
                if cfg.whatsapp.enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: asro ask <message>");
            }

            let prompt = message.join(" ");
            cfg.validate()?;

            let provider = build_provider(&cfg);
            let responder = gateway::Responder::new(provider, cfg.persona.clone());
            let response = responder.respond("cli", &prompt).await;
            println!("{response}");
        }
    }

    Ok(())
}

/// Build the Gemini provider from config.
fn build_provider(cfg: &config::Config) -> Arc<dyn Provider> {
    Arc::new(GeminiProvider::from_config(
        cfg.gemini.api_key.clone(),
        cfg.gemini.model.clone(),
    ))
}
