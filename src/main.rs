//! rag-gateway
//!
//! Authorization and abuse-control front door for a healthcare RAG API.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id → trace → CORS → timeout
//!                                                   │
//!                     public routes ◀───────────────┤
//!                     (/, /health, /auth/demo-token)│
//!                                                   ▼
//!                                ┌──────────────── gate ────────────────┐
//!                                │ bearer → JwtVerifier → RateLimiter   │
//!                                │   401 ◀─┘        429 ◀─┘             │
//!                                └──────────────────┬───────────────────┘
//!                                                   ▼
//!                     handlers ──▶ GenerationService / DocumentStore
//!                                                   │
//!     Client Response ◀────── AuditRecorder (one record per sensitive action)
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use rag_gateway::config::{load_config, ConfigWatcher, PLACEHOLDER_SECRET};
use rag_gateway::http::HttpServer;
use rag_gateway::lifecycle::{signals, Shutdown};
use rag_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "rag-gateway", version)]
#[command(about = "Authorization and rate-limiting gateway for the RAG API", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults plus environment overrides when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the rate limit policy when the configuration file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rag-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        rate_limit_quota = config.rate_limit.quota,
        rate_limit_period_secs = config.rate_limit.period_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );
    if config.auth.secret == PLACEHOLDER_SECRET {
        tracing::warn!("Using the placeholder signing secret; set API_SECRET_KEY before deploying");
    }
    if config.auth.demo_tokens_enabled {
        tracing::warn!("Demo token endpoint is enabled");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the life of the process.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal(&shutdown).await;
    });

    let server = HttpServer::new(config.clone())?;
    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            server.run_tls(addr, tls, config_updates, server_shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            server.run(listener, config_updates, server_shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
