//! Trailsync service - location ingest and resumable sync over HTTP.
//!
//! Run with: `cargo run -p trailsync-service`

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use trailsync_service::{AppState, Config, api};
use trailsync_store::Store;

/// Trailsync service - location ingest and resumable sync over HTTP.
#[derive(Parser, Debug)]
#[command(name = "trailsync-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trailsync_service=info".parse()?)
                .add_directive("trailsync_store=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    // Override config with CLI args
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }

    config.validate()?;

    let store = Store::open(&config.storage.path)?;

    let addr: SocketAddr = config.server.bind.parse()?;
    let allow_any = config.cors.allow_any;
    if config.ingest.track_active {
        info!("Live tracking enabled at startup");
    }

    let state = AppState::new(store, config);

    let mut app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http());
    if allow_any {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    let app = app.with_state(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
