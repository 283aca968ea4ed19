// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `serve` subcommand: connect one bot per configured service, drain
//! their inbound queues into the agent, and sweep idle sessions until
//! interrupted.

use std::sync::Arc;
use std::time::Duration;

use tessera_agent::{Agent, TransportMap};
use tessera_config::model::TesseraConfig;
use tessera_core::{ServiceKind, TesseraError};
use tessera_telegram::TelegramChannel;
use tracing::info;

fn connect(
    service: ServiceKind,
    token: &str,
    config: &TesseraConfig,
) -> Result<Arc<TelegramChannel>, TesseraError> {
    let mut channel = TelegramChannel::new(service, token, &config.telegram)?;
    channel.connect();
    Ok(Arc::new(channel))
}

pub async fn run(config: TesseraConfig) -> Result<(), TesseraError> {
    let token = config.telegram.bot_token.as_deref().ok_or_else(|| {
        TesseraError::Config("telegram.bot_token is required for serve".to_string())
    })?;
    if config.audience.worker_chat_ids.is_empty() {
        return Err(TesseraError::Config(
            "audience.worker_chat_ids must not be empty for serve".to_string(),
        ));
    }

    let primary = connect(ServiceKind::Food, token, &config)?;
    let mut transports = TransportMap::new(primary.clone());
    let mut channels = vec![primary];

    for (service, token) in [
        (ServiceKind::Flight, &config.telegram.flight_bot_token),
        (ServiceKind::Hotel, &config.telegram.hotel_bot_token),
    ] {
        if let Some(token) = token.as_deref() {
            let channel = connect(service, token, &config)?;
            transports.register(service, channel.clone());
            channels.push(channel);
        }
    }

    let agent = Arc::new(Agent::new(&config, transports)?);

    let mut tasks = Vec::new();
    for channel in channels {
        let agent = agent.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = channel.recv().await {
                agent.handle_event(event).await;
            }
        }));
    }

    let sweep_agent = agent.clone();
    let sweep_interval = Duration::from_secs(config.sessions.cleanup_interval_secs.max(1));
    tasks.push(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_agent.sweep_sessions().await;
        }
    }));

    info!("tessera serving; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| TesseraError::Internal(format!("failed to listen for shutdown: {e}")))?;

    info!("shutting down");
    for task in &tasks {
        task.abort();
    }
    agent.flush()?;
    Ok(())
}
