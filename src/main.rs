use atelier_daemon::config::{load_server_config, ServerConfig};
use atelier_daemon::logging::{self, init_logging, parse_rotation, LogConfig, LOG_FILENAME};
use atelier_daemon::server::{build_router, AppState};
use atelier_daemon::{builtin_content_types, db, ContentStore, ResponseCache};
use clap::Parser;
use color_eyre::eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Atelier Daemon - content-management backend for portfolio sites
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, env = "ATELIER_ADDR", default_value = DEFAULT_ADDR)]
    addr: String,

    /// Comma-separated list of allowed CORS origins.
    /// Use "*" to allow all origins (not recommended for production).
    #[arg(
        long,
        env = "ATELIER_CORS_ORIGINS",
        default_value = atelier_daemon::cors::DEFAULT_CORS_ORIGINS,
        value_delimiter = ','
    )]
    cors_origins: Vec<String>,

    /// Enable JSON log format (for production/log aggregation)
    #[arg(long, env = "ATELIER_LOG_JSON", default_value = "false")]
    log_json: bool,

    /// Log rotation period: daily, hourly, or never
    #[arg(long, env = "ATELIER_LOG_ROTATION", default_value = "daily")]
    log_rotation: String,

    /// Custom log directory (default: ~/.atelier/logs)
    #[arg(long, env = "ATELIER_LOG_DIR")]
    log_dir: Option<String>,
}

fn report_bind_error(addr: &str, log_file: &std::path::Path, e: &std::io::Error) {
    if e.kind() == std::io::ErrorKind::AddrInUse {
        eprintln!();
        eprintln!("Error: Failed to start server - address {addr} is already in use");
        eprintln!();
        eprintln!("Another instance of atelier-daemon may already be running.");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  1. Kill the existing process:   pkill atelier-daemon");
        eprintln!("  2. Use a different port:        atelier-daemon --addr 127.0.0.1:3001");
        eprintln!();
    } else {
        eprintln!();
        eprintln!("Error: Failed to start server: {e}");
        eprintln!();
    }
    eprintln!("Logs: {}", log_file.display());
    eprintln!();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre error hooks for colored error output
    color_eyre::install()?;

    // Parse CLI arguments first (before logging, so we can use log config)
    let args = Args::parse();

    let log_dir = args.log_dir.map_or_else(
        || {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".atelier")
                .join("logs")
        },
        PathBuf::from,
    );
    let log_file = log_dir.join(LOG_FILENAME);

    let log_config = LogConfig {
        log_dir,
        json_format: args.log_json,
        rotation: parse_rotation(&args.log_rotation),
        ..Default::default()
    };

    if let Err(e) = init_logging(log_config) {
        eprintln!();
        eprintln!("Error: Failed to initialize logging: {e}");
        eprintln!();
        return Err(e);
    }

    // Server config: optional ~/.atelier/config.toml, then environment overrides.
    let config = load_server_config().unwrap_or_else(|e| {
        warn!("Failed to load config file, using defaults: {e}");
        ServerConfig::default()
    });

    info!("Connecting to PostgreSQL at {}", logging::redact_db_url(&config.database_url));
    let pool = db::connect(&config.database_url, config.max_connections).await?;
    db::ensure_schema(&pool, &builtin_content_types()).await?;
    db::seed_admin_from_env(&pool).await?;

    tokio::fs::create_dir_all(&config.uploads_dir).await?;

    let cors = atelier_daemon::cors::build_cors_layer(
        args.cors_origins
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    );

    let store = ContentStore::new(pool.clone(), builtin_content_types());
    let cache = ResponseCache::with_ttl_secs(config.cache_ttl_secs);
    let state = Arc::new(AppState {
        store,
        cache,
        pool,
        config,
    });

    let app = build_router(state).layer(cors);

    info!("Starting atelier daemon on {}", args.addr);
    let listener = match TcpListener::bind(&args.addr).await {
        Ok(l) => l,
        Err(e) => {
            report_bind_error(&args.addr, &log_file, &e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Atelier daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => warn!("Failed to install signal handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
