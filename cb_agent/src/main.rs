//! Chess bot agent.
//!
//! Connects a bot account to the game server, accepts suitable challenges and
//! plays every running game with a local UCI engine.

mod config;
mod health;
mod logging;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Error;
use chess_bot::{
    EngineSupervisor, GameApi, HttpApiClient, MoveSubmitter, SessionContext, SessionPoller,
    SessionRegistry, UciLauncher,
};
use config::{AgentConfig, Overrides};
use pico_args::Arguments;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const HELP: &str = "\
Run a chess bot agent

USAGE:
  cb_agent [OPTIONS]

OPTIONS:
  --engine       PATH      UCI engine executable  [default: env ENGINE_PATH or ./stockfish]
  --health-bind  IP:PORT   Health endpoint bind address  [default: env HEALTH_BIND or 0.0.0.0:8080]
  --base-url     URL       Game server base URL  [default: env API_BASE_URL or https://lichess.org]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  BOT_TOKEN                API token of the bot account (required)
  CHALLENGE_*              Challenge acceptance rules
  ENGINE_*                 Engine strength and budgets
  LOG_FILE                 Also append log lines to this file
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        engine_path: pargs.opt_value_from_str::<_, PathBuf>("--engine")?,
        health_bind: pargs.opt_value_from_str::<_, SocketAddr>("--health-bind")?,
        base_url: pargs.opt_value_from_str("--base-url")?,
    };

    let log_file = std::env::var_os("LOG_FILE").map(PathBuf::from);
    logging::init(log_file.as_deref());

    let config = AgentConfig::from_env(overrides)?;
    config.validate()?;

    info!("Starting chess bot against {}", config.base_url);

    let client = HttpApiClient::new(config.base_url.clone(), config.token.clone())?
        .with_request_timeout(config.request_timeout());
    let api: Arc<dyn GameApi> = Arc::new(client);

    let account_id = match api.account().await {
        Ok(account) => {
            info!("Logged in as {} ({})", account.username, account.id);
            Some(account.id)
        }
        Err(e) => {
            warn!("Failed to fetch account, colors will come from the playing list: {}", e);
            None
        }
    };

    info!("Launching engine: {}", config.engine_path.display());
    let engine = EngineSupervisor::start(
        Arc::new(UciLauncher::new(config.engine_path.clone())),
        config.engine.params.clone(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to start engine: {}", e))?
    .with_restart_pause(config.restart_pause());
    let engine = Arc::new(engine);

    let submitter = MoveSubmitter::new(api.clone(), config.retry_policy())
        .with_attempt_timeout(config.request_timeout());

    let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
    let ctx = Arc::new(SessionContext {
        api,
        engine: engine.clone(),
        submitter: Arc::new(submitter),
        move_request: config.move_request(),
        account_id,
        fatal: fatal_tx,
    });

    let registry = Arc::new(SessionRegistry::new());
    let poller = SessionPoller::new(
        ctx,
        registry.clone(),
        Arc::new(config.challenges.clone()),
        config.poll_schedule(),
        fatal_rx,
    );

    let health = health::spawn(config.health_bind);

    info!("Agent is running. Press Ctrl+C to stop.");

    let outcome = tokio::select! {
        result = poller.run() => result.map_err(Error::from),
        () = shutdown_signal() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    info!("Shutting down agent...");
    health.abort();
    registry.shutdown().await;
    engine.shutdown().await;

    if let Err(e) = &outcome {
        error!("Agent stopped: {}", e);
    }

    outcome
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
