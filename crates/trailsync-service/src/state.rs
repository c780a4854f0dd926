//! Application state shared across handlers.
//!
//! The store is the only shared mutable resource. Each handler holds the
//! store lock for its whole operation, so one sync call always sees a single
//! consistent partition set.

use std::sync::Arc;

use tokio::sync::Mutex;

use trailsync_store::Store;
use trailsync_types::{Clock, SystemClock};

use crate::config::Config;
use crate::ingest::IngestService;
use crate::live::LiveTracking;

/// Shared application state.
pub struct AppState {
    /// The data store.
    pub store: Mutex<Store>,
    /// Configuration the service was started with.
    pub config: Config,
    /// Batch ingestion and the tracking switch.
    pub ingest: IngestService,
    /// Source of "now" for partition naming and sample stamps.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create application state on the wall clock.
    pub fn new(store: Store, config: Config) -> Arc<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create application state with an explicit clock.
    pub fn with_clock(store: Store, config: Config, clock: Arc<dyn Clock>) -> Arc<Self> {
        let live = Arc::new(LiveTracking::new(
            config.server.live_buffer,
            config.ingest.track_active,
        ));
        Arc::new(Self {
            store: Mutex::new(store),
            config,
            ingest: IngestService::new(live),
            clock,
        })
    }

    /// The live-tracking holder.
    pub fn live(&self) -> &LiveTracking {
        self.ingest.live()
    }
}
