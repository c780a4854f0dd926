//! Resumable and full synchronization across day partitions.
//!
//! The engine walks partitions in ascending order. Since every sample lives
//! in the partition of its own `logged_at` day, concatenating per-partition
//! scans yields one sequence that is non-decreasing in `logged_at`.

use time::OffsetDateTime;
use tracing::debug;

use trailsync_types::{LocationSample, PartitionKey};

use crate::error::Result;
use crate::traits::EventStore;

/// Synchronization algorithms over a partition registry and event store.
///
/// Every method takes `now` explicitly; callers read their clock once per
/// request so the partition set cannot shift mid-call.
pub struct SyncEngine<'a, S> {
    store: &'a S,
}

impl<'a, S> SyncEngine<'a, S>
where
    S: EventStore,
{
    /// Create an engine over a store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Everything logged at or after `watermark`, ascending.
    ///
    /// Partitions are probed in order until one holds a sample at or after
    /// the watermark. That partition is scanned from the watermark and every
    /// later partition is scanned in full. No match anywhere gives an empty
    /// result. A storage error aborts the walk and nothing is returned.
    pub fn resume_sync(
        &self,
        now: OffsetDateTime,
        watermark: OffsetDateTime,
        client_id: Option<&str>,
    ) -> Result<Vec<LocationSample>> {
        let partitions = self.store.effective_partition_list(now)?;
        let mut found = false;
        let mut result = Vec::new();

        for key in &partitions {
            if found {
                result.extend(self.store.scan_all(key, client_id)?);
                continue;
            }

            if self
                .store
                .find_earliest_at_or_after(key, client_id, watermark)?
                .is_some()
            {
                debug!("Resuming sync from partition {}", key);
                found = true;
                result.extend(self.store.scan_from(key, client_id, watermark)?);
            }
        }

        Ok(result)
    }

    /// Every sample in every partition, ascending.
    pub fn full_sync(
        &self,
        now: OffsetDateTime,
        client_id: Option<&str>,
    ) -> Result<Vec<LocationSample>> {
        let mut result = Vec::new();
        for key in self.store.effective_partition_list(now)? {
            result.extend(self.store.scan_all(&key, client_id)?);
        }
        Ok(result)
    }

    /// Samples in the partition for `now`.
    pub fn today_view(
        &self,
        now: OffsetDateTime,
        client_id: Option<&str>,
    ) -> Result<Vec<LocationSample>> {
        self.store.scan_all(&PartitionKey::for_instant(now), client_id)
    }

    /// Registered days, ascending, optionally only those holding `client_id`.
    pub fn list_history_dates(&self, client_id: Option<&str>) -> Result<Vec<PartitionKey>> {
        let keys = self.store.list_known_partitions()?;
        let Some(client_id) = client_id else {
            return Ok(keys);
        };

        let mut dates = Vec::with_capacity(keys.len());
        for key in keys {
            if self.store.contains_client(&key, Some(client_id))? {
                dates.push(key);
            }
        }
        Ok(dates)
    }
}
