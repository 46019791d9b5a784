//! Lovebirds Server: real-time chat channel core
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing_subscriber::{EnvFilter, fmt};

use lovebirds_api::app::serve;
use lovebirds_api::state::AppState;
use lovebirds_auth::{JwtDecoder, JwtEncoder};
use lovebirds_core::config::AppConfig;
use lovebirds_core::error::AppError;
use lovebirds_core::types::UserId;
use lovebirds_realtime::server::RealtimeEngine;
use lovebirds_store::{MemoryMessageLog, Seed};

/// Lovebirds: real-time chat channel server
#[derive(Debug, Parser)]
#[command(name = "lovebirds-server", version, about, long_about = None)]
struct Cli {
    /// Configuration environment overlay (`config/{env}.toml`)
    #[arg(short, long, env = "LOVEBIRDS_ENV", default_value = "development")]
    env: String,

    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the server
    Serve,
    /// Issue a signed credential for development clients
    Token {
        /// User ID (random when omitted)
        #[arg(long)]
        user: Option<UserId>,
        /// Display name carried in the token
        #[arg(long, default_value = "guest")]
        name: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            init_logging(&config);
            run(config).await
        }
        Commands::Token { user, name } => issue_token(&config, user.unwrap_or_default(), &name),
    };

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Prints a credential for `user_id` to stdout.
fn issue_token(config: &AppConfig, user_id: UserId, name: &str) -> Result<(), AppError> {
    let token = JwtEncoder::new(&config.auth).issue(user_id, name)?;
    println!("{token}");
    Ok(())
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Lovebirds v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Message store ────────────────────────────────────
    let store = match &config.store.seed_file {
        Some(path) => {
            tracing::info!("Loading seed data from '{}'", path);
            MemoryMessageLog::from_seed(Seed::from_file(path)?).await
        }
        None => MemoryMessageLog::new(),
    };
    let store = Arc::new(store.with_preview_length(config.realtime.preview_length));

    // ── Step 2: Credential verifier ──────────────────────────────
    let verifier = Arc::new(JwtDecoder::new(&config.auth));

    // ── Step 3: Realtime engine ──────────────────────────────────
    tracing::info!("Initializing realtime engine...");
    let engine = Arc::new(RealtimeEngine::new(
        config.realtime.clone(),
        verifier,
        store.clone(),
        store,
    ));
    engine.start();

    // ── Step 4: HTTP server ──────────────────────────────────────
    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let shutdown_engine = engine.clone();
    let state = AppState::new(Arc::new(config), engine);

    let (signalled_tx, mut signalled_rx) = oneshot::channel::<()>();
    let server = serve(listener, state, async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = signalled_tx.send(());
        // Open WebSocket connections must end before the HTTP server drains.
        shutdown_engine.shutdown().await;
    });
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        Ok(()) = &mut signalled_rx => {
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(AppError::internal(format!(
                        "Forced exit: shutdown did not finish within {grace:?}"
                    )));
                }
            }
        }
    }

    tracing::info!("Lovebirds server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
