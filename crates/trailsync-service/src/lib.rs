//! HTTP ingest and resumable sync for day-partitioned location tracking.
//!
//! This crate provides a service that:
//! - Accepts batches of coordinates from mobile clients and stamps them with
//!   server time
//! - Stores them in one partition per UTC day
//! - Lets a client resume from a watermark after losing connectivity, or
//!   pull its whole history
//! - Optionally mirrors accepted samples onto an in-process live queue
//!
//! # Endpoints
//!
//! - `POST /send` - Ingest `{firebaseid, coords: [{x_cord, y_cord}, ...]}`
//! - `POST /sync` - Resume from `{firebaseid?, last_synced_timestamp}`
//! - `GET /viewtoday?firebaseid=` - Today's samples for a client
//! - `GET /sync_all?firebaseid=` - Full history, client filter optional
//! - `GET /history?firebaseid=` - Days holding data for a client
//! - `GET /serverstatus` - Liveness probe
//! - `POST /track` - Switch live tracking with `{active}`
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/trailsync/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:5000"
//! live_buffer = 100
//!
//! [storage]
//! path = "~/.local/share/trailsync/tracker.db"
//!
//! [ingest]
//! track_active = false
//!
//! [cors]
//! allow_any = true
//! ```

pub mod api;
pub mod config;
pub mod ingest;
pub mod live;
pub mod state;

pub use config::{
    Config, ConfigError, CorsConfig, IngestConfig, ServerConfig, StorageConfig, ValidationError,
};
pub use ingest::{IngestError, IngestOutcome, IngestService};
pub use live::LiveTracking;
pub use state::AppState;
