//! tvhub backend server.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::time::UtcTime, prelude::*, EnvFilter};

use tvhub::{
    config::{Config, ConfigOverrides},
    create_app, version,
};

/// tvhub - TV streaming server backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "TVHUB_PORT")]
    port: Option<u16>,

    /// Recording backend reported by the version endpoint
    #[arg(long, env = "TVHUB_BACKEND")]
    backend: Option<String>,

    /// Encoder reported by the version endpoint
    #[arg(long, env = "TVHUB_ENCODER")]
    encoder: Option<String>,

    /// Tags listing used to look up the latest release
    #[arg(long, env = "TVHUB_TAGS_URL")]
    tags_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TVHUB_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_figment(ConfigOverrides {
        port: args.port,
        backend: args.backend,
        encoder: args.encoder,
        tags_url: args.tags_url,
        log_level: args.log_level,
    })?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&config)?;

    info!("Starting tvhub {}...", version::VERSION);
    info!(
        "Backend: {}, encoder: {}",
        config.general.backend, config.general.encoder
    );

    let app = create_app(&config)?;

    // Bind to 0.0.0.0 to be accessible from all interfaces (Docker, network, etc.)
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down");
    Ok(())
}

/// Initialize logging to stdout, and to `log_file` if configured.
///
/// The level comes from the config if set, otherwise from `RUST_LOG`,
/// defaulting to info.
fn init_logging(config: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match config.log_level {
        Some(ref level) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level: {}", level))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let timer = UtcTime::new(Rfc3339);
    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_timer(timer.clone())
        .compact();

    let (file_layer, guard) = match config.log_file {
        Some(ref path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Some(ref path) = config.log_file {
        info!("Logging to file: {}", path.display());
    }

    Ok(guard)
}
