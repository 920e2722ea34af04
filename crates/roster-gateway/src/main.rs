use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

mod app;
mod auth;
mod http;
mod pipeline;

#[derive(Parser)]
#[command(name = "roster-gateway", about = "Task reminder and recurring-task gateway")]
struct Cli {
    /// Path to roster.toml (default: ~/.roster/roster.toml).
    #[arg(long)]
    config: Option<String>,

    /// Override gateway.port from the config.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: explicit path > ROSTER_CONFIG env > ~/.roster/roster.toml
    let config_path = cli
        .config
        .or_else(|| std::env::var("ROSTER_CONFIG").ok());
    let mut config =
        roster_core::RosterConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            roster_core::RosterConfig::default()
        });
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if config.gateway.cron_secret.is_none() {
        tracing::warn!("gateway.cron_secret is not set — cron endpoints will deny all callers");
    }

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    // initialize SQLite database — single file for all stores
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    roster_store::db::init_db(&db)?;
    info!("database migrations complete");

    // build stores — each gets its own connection for thread safety
    let tasks = roster_store::TaskStore::new(rusqlite::Connection::open(db_path)?);
    let subscriptions = Arc::new(roster_store::SubscriptionStore::new(
        rusqlite::Connection::open(db_path)?,
    ));
    let recurring = roster_store::RecurringStore::new(rusqlite::Connection::open(db_path)?);

    // push delivery: VAPID-signed Web Push, fail fast on missing key material
    let transport = Arc::new(roster_push::WebPushTransport::new(&config.push)?);
    let push = roster_push::PushService::new(Arc::clone(&subscriptions), transport);

    let state = Arc::new(app::AppState {
        config,
        tasks,
        subscriptions,
        recurring,
        push,
    });
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("roster gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
