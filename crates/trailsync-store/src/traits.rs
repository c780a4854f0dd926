//! Trait abstractions over partition bookkeeping and sample storage.
//!
//! [`Store`](crate::Store) implements both traits on SQLite. The sync and
//! ingest logic is written against the traits so it can run over any
//! backend that keeps samples ordered by `logged_at`.

use time::OffsetDateTime;

use trailsync_types::{LocationSample, PartitionKey};

use crate::error::Result;

/// Registry of day partitions that have received at least one write.
pub trait PartitionRegistry {
    /// All registered partitions, ascending and without duplicates.
    fn list_known_partitions(&self) -> Result<Vec<PartitionKey>>;

    /// Record that `key` holds data.
    ///
    /// Idempotent. Returns `true` only when the key was not registered before.
    fn ensure_registered(&self, key: &PartitionKey) -> Result<bool>;

    /// Registered partitions plus the partition for `now`, ascending.
    ///
    /// Today's partition is always visible even before its first write has
    /// been registered.
    fn effective_partition_list(&self, now: OffsetDateTime) -> Result<Vec<PartitionKey>> {
        let mut keys = self.list_known_partitions()?;
        let today = PartitionKey::for_instant(now);
        if let Err(pos) = keys.binary_search(&today) {
            keys.insert(pos, today);
        }
        Ok(keys)
    }
}

/// Append-only storage of samples grouped by day partition.
///
/// A partition that has never been written reads as empty.
pub trait EventStore: PartitionRegistry {
    /// Append a batch to a partition and return how many samples were written.
    ///
    /// A non-empty batch also registers the partition. Rows and registry
    /// entry are written together or not at all.
    fn append(&self, key: &PartitionKey, samples: &[LocationSample]) -> Result<usize>;

    /// Samples with `logged_at >= since`, ascending.
    fn scan_from(
        &self,
        key: &PartitionKey,
        client_id: Option<&str>,
        since: OffsetDateTime,
    ) -> Result<Vec<LocationSample>>;

    /// Every sample in the partition, ascending.
    fn scan_all(&self, key: &PartitionKey, client_id: Option<&str>)
    -> Result<Vec<LocationSample>>;

    /// The earliest sample with `logged_at >= since`, if any.
    fn find_earliest_at_or_after(
        &self,
        key: &PartitionKey,
        client_id: Option<&str>,
        since: OffsetDateTime,
    ) -> Result<Option<LocationSample>>;

    /// Whether the partition holds any sample matching the client filter.
    fn contains_client(&self, key: &PartitionKey, client_id: Option<&str>) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use time::macros::datetime;

    struct FixedRegistry(RefCell<Vec<PartitionKey>>);

    impl PartitionRegistry for FixedRegistry {
        fn list_known_partitions(&self) -> Result<Vec<PartitionKey>> {
            Ok(self.0.borrow().clone())
        }

        fn ensure_registered(&self, key: &PartitionKey) -> Result<bool> {
            let mut keys = self.0.borrow_mut();
            match keys.binary_search(key) {
                Ok(_) => Ok(false),
                Err(pos) => {
                    keys.insert(pos, *key);
                    Ok(true)
                }
            }
        }
    }

    fn keys(names: &[&str]) -> Vec<PartitionKey> {
        names.iter().map(|n| PartitionKey::parse(n).unwrap()).collect()
    }

    #[test]
    fn test_effective_list_appends_today() {
        let registry = FixedRegistry(RefCell::new(keys(&["2024_01_10", "2024_01_12"])));
        let list = registry
            .effective_partition_list(datetime!(2024-01-15 09:00 UTC))
            .unwrap();
        assert_eq!(list, keys(&["2024_01_10", "2024_01_12", "2024_01_15"]));
    }

    #[test]
    fn test_effective_list_does_not_duplicate_today() {
        let registry = FixedRegistry(RefCell::new(keys(&["2024_01_10", "2024_01_15"])));
        let list = registry
            .effective_partition_list(datetime!(2024-01-15 09:00 UTC))
            .unwrap();
        assert_eq!(list, keys(&["2024_01_10", "2024_01_15"]));
    }

    #[test]
    fn test_effective_list_keeps_sort_order_for_past_now() {
        let registry = FixedRegistry(RefCell::new(keys(&["2024_01_10", "2024_01_20"])));
        let list = registry
            .effective_partition_list(datetime!(2024-01-15 09:00 UTC))
            .unwrap();
        assert_eq!(list, keys(&["2024_01_10", "2024_01_15", "2024_01_20"]));
    }

    #[test]
    fn test_effective_list_on_empty_registry() {
        let registry = FixedRegistry(RefCell::new(Vec::new()));
        let list = registry
            .effective_partition_list(datetime!(2024-01-15 09:00 UTC))
            .unwrap();
        assert_eq!(list, keys(&["2024_01_15"]));
    }
}
