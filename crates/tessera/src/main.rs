// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tessera - a Telegram order-intake concierge.
//!
//! This is the binary entry point for the Tessera bots.

use std::path::Path;

use clap::{Parser, Subcommand};
use tracing::error;

mod serve;

/// Tessera - a Telegram order-intake concierge.
#[derive(Parser, Debug)]
#[command(name = "tessera", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the concierge bots.
    Serve,
    /// Print ticket ledger totals.
    Report,
    /// Show the effective configuration.
    Config,
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // A broken config is fatal before any bot connects.
    let config = match tessera_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            tessera_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.agent.log_level);

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run(config).await {
                error!(error = %e, "serve failed");
                std::process::exit(1);
            }
        }
        Some(Commands::Report) => {
            let registry = match tessera_registry::Registry::open(
                Path::new(&config.storage.data_dir),
                &config.tickets,
                &config.audience,
            ) {
                Ok(registry) => registry,
                Err(e) => {
                    eprintln!("tessera report: {e}");
                    std::process::exit(1);
                }
            };
            println!("{}", tessera_agent::worker::format_report(&registry.summarize()));
        }
        Some(Commands::Config) | None => {
            println!("data_dir      = {}", config.storage.data_dir);
            println!("workers       = {:?}", config.audience.worker_chat_ids);
            println!("log providers = {:?}", config.audience.log_chat_ids);
            println!(
                "subtotal band = ${:.0}..${:.0}",
                config.order.subtotal_min, config.order.subtotal_max
            );
            println!(
                "rate limit    = {} tickets / {} min",
                config.rate_limit.max_tickets, config.rate_limit.window_minutes
            );
            println!(
                "bots          = food:{} flight:{} hotel:{}",
                config.telegram.bot_token.is_some(),
                config.telegram.flight_bot_token.is_some(),
                config.telegram.hotel_bot_token.is_some(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        // Defaults must validate; the bot token is only required by serve.
        let config = tessera_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert!(config.telegram.bot_token.is_none());
        assert_eq!(config.tickets.counter_floor, 60);
    }
}
