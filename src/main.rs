//! Snake Sync Client
//!
//! Headless client: connects, mirrors the world and reads commands from
//! stdin (`start`, `up`/`down`/`left`/`right`, `status`, `quit`).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use snake_sync::{
    game::LoggingSubmitter, ClientConfig, ClientHandle, Direction, SessionPhase, SyncClient,
    VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Snake Sync Client v{}", VERSION);

    let config = ClientConfig::from_env().context("invalid configuration")?;
    info!("Player: {} ({})", config.display_name, config.player_id);

    let (handle, engine) = SyncClient::connect(&config, Arc::new(LoggingSubmitter))
        .await
        .with_context(|| format!("failed to connect to {}", config.server_url))?;

    let input = tokio::spawn(read_commands(handle.clone()));
    let mut status = tokio::time::interval(Duration::from_secs(10));

    tokio::pin!(engine);
    loop {
        tokio::select! {
            result = &mut engine => {
                result.context("engine task failed")?;
                break;
            }
            _ = status.tick() => log_status(&handle),
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                let _ = handle.shutdown();
            }
        }
    }

    input.abort();
    log_status(&handle);
    Ok(())
}

async fn read_commands(handle: ClientHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let command = line.trim();
        let result = match command {
            "" => continue,
            "start" => handle.start_game(),
            "status" => {
                log_status(&handle);
                continue;
            }
            "quit" | "exit" => handle.shutdown(),
            other => match other.parse::<Direction>() {
                Ok(direction) => handle.steer(direction),
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            },
        };
        if result.is_err() {
            break;
        }
    }
}

fn log_status(handle: &ClientHandle) {
    let store = handle.snapshot();
    let alive = store.snakes().values().filter(|s| !s.is_dead).count();
    let latency = handle
        .latency()
        .map(|l| format!("{} ms", l.as_millis()))
        .unwrap_or_else(|| "-".to_string());

    info!(
        "Phase: {:?}, snakes: {} ({} alive), food: {}, score: {}, latency: {}",
        handle.phase(),
        store.snake_count(),
        alive,
        store.food().len(),
        handle.score().unwrap_or(0),
        latency,
    );
    if handle.phase() == SessionPhase::Over {
        info!("Game over");
    }
}
