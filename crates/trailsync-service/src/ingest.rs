//! Sample ingestion.

use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;

use trailsync_store::EventStore;
use trailsync_types::{Coordinates, LocationSample, PartitionKey};

use crate::live::LiveTracking;

/// Errors raised while ingesting a batch.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// No client id was supplied.
    #[error("Missing firebaseid")]
    MissingClientId,

    /// The store rejected the batch.
    #[error(transparent)]
    Store(#[from] trailsync_store::Error),
}

/// Result of one ingest call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Number of samples written.
    pub inserted: usize,
    /// Tracking state observed for this batch.
    pub track_active: bool,
}

/// Validates incoming entries, stamps them and appends them to today's
/// partition.
#[derive(Debug, Clone)]
pub struct IngestService {
    live: Arc<LiveTracking>,
}

impl IngestService {
    /// Create a service publishing accepted samples to `live`.
    pub fn new(live: Arc<LiveTracking>) -> Self {
        Self { live }
    }

    /// The live-tracking holder this service publishes to.
    pub fn live(&self) -> &LiveTracking {
        &self.live
    }

    /// Switch live tracking on or off and return the new state.
    pub fn set_tracking(&self, active: bool) -> bool {
        self.live.set_active(active)
    }

    /// Ingest a batch for `client_id` at instant `now`.
    ///
    /// Entries without numeric `x_cord` and `y_cord` are skipped. Every kept
    /// entry is stamped with `now` and written to the partition for `now`.
    /// The rows and the partition's registry entry are written together, so
    /// a store failure writes nothing.
    pub fn ingest<S>(
        &self,
        store: &S,
        now: OffsetDateTime,
        client_id: Option<&str>,
        entries: &[Value],
    ) -> Result<IngestOutcome, IngestError>
    where
        S: EventStore,
    {
        let client_id = match client_id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(IngestError::MissingClientId),
        };

        let track_active = self.live.is_active();
        let samples: Vec<LocationSample> = entries
            .iter()
            .filter_map(Coordinates::from_entry)
            .map(|coordinates| LocationSample::new(client_id, coordinates, now))
            .collect();

        let dropped = entries.len() - samples.len();
        if dropped > 0 {
            debug!("Dropped {} incomplete entries from {}", dropped, client_id);
        }

        if samples.is_empty() {
            return Ok(IngestOutcome {
                inserted: 0,
                track_active,
            });
        }

        let key = PartitionKey::for_instant(now);
        let inserted = store.append(&key, &samples)?;

        if track_active {
            for sample in samples {
                self.live.publish(sample);
            }
        }

        Ok(IngestOutcome {
            inserted,
            track_active,
        })
    }
}
