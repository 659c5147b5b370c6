//! # borgdash server
//!
//! Serves the dashboard API for borg backup reports.
//!
//! Configuration comes from two YAML layers (see `borgdash-config`); the
//! process itself only needs a listen address, taken from the command line,
//! the environment or a `.env` file.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use borgdash_config::{ConfigResolver, ConfigSources};
use borgdash_server::{AppState, routes};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "borgdash-server")]
#[command(about = "Dashboard backend for borg backup reports")]
struct ServeArgs {
    /// Server host
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value_t = 3000)]
    port: u16,

    /// Override configuration document (edited through the API)
    #[arg(long, env = "BORGDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Default configuration document
    #[arg(long, env = "BORGDASH_DEFAULT_CONFIG")]
    default_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file_loaded = dotenvy::dotenv().is_ok();
    let args = ServeArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_file_loaded {
        info!("loaded .env file");
    }

    run_server(args).await
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let mut sources = ConfigSources::from_env();
    if let Some(path) = args.config {
        sources = sources.with_override_path(path);
    }
    if let Some(path) = args.default_config {
        sources = sources.with_default_path(path);
    }
    info!(
        override_path = %sources.override_path().display(),
        defaults = %sources.describe_defaults(),
        "configuration sources"
    );

    let config = Arc::new(ConfigResolver::new(sources));
    // Surface a broken configuration at startup; requests retry the load.
    if let Err(err) = config.get_config(false).await {
        warn!(error = ?err, "configuration not loadable yet");
    }

    let state = AppState::new(config);
    let app = routes::create_app(state.clone());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| {
            format!("invalid listen address {}:{}", args.host, args.port)
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Starting borgdash server on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutting down");
    state.rescan().stop();
    state.logfs().shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
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
