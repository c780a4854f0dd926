//! Day-partitioned persistence and resumable sync for location samples.
//!
//! This crate provides SQLite-based storage where each UTC day is its own
//! partition, plus the synchronization algorithms that read across them.
//!
//! # Features
//!
//! - One table per day, created on the first write of that day
//! - A registry of days that hold data
//! - Ordered scans with an optional client filter and inclusive lower bound
//! - Resume from a watermark, full history sync, today's view, history dates
//!
//! # Example
//!
//! ```no_run
//! use time::OffsetDateTime;
//! use trailsync_store::{Store, SyncEngine};
//!
//! let store = Store::open_default()?;
//! let now = OffsetDateTime::now_utc();
//!
//! let engine = SyncEngine::new(&store);
//! let missed = engine.resume_sync(now, now - time::Duration::hours(2), Some("u1"))?;
//! println!("{} samples to catch up on", missed.len());
//! # Ok::<(), trailsync_store::Error>(())
//! ```

mod error;
mod queries;
mod schema;
mod store;
mod sync;
mod traits;

pub use error::{Error, Result};
pub use queries::SampleQuery;
pub use schema::{PARTITION_TABLE_PREFIX, partition_table};
pub use store::Store;
pub use sync::SyncEngine;
pub use traits::{EventStore, PartitionRegistry};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/trailsync/tracker.db`
/// - macOS: `~/Library/Application Support/trailsync/tracker.db`
/// - Windows: `C:\Users\<user>\AppData\Local\trailsync\tracker.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("trailsync")
        .join("tracker.db")
}
