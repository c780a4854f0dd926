//! Live-tracking switch and queue.
//!
//! While tracking is on, every accepted sample is also published to a
//! bounded broadcast channel. Nothing in this service consumes it; an
//! external live-delivery component can [`subscribe`](LiveTracking::subscribe).
//! A subscriber that falls behind loses the oldest samples. Publishing never
//! blocks.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

use trailsync_types::LocationSample;

/// Tracking flag plus the live queue it gates.
#[derive(Debug)]
pub struct LiveTracking {
    active: AtomicBool,
    tx: broadcast::Sender<LocationSample>,
}

impl LiveTracking {
    /// Create a holder with the given queue capacity and initial flag.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize, active: bool) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            active: AtomicBool::new(active),
            tx,
        }
    }

    /// Whether samples are currently published.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Switch tracking on or off. Returns the new state.
    pub fn set_active(&self, active: bool) -> bool {
        self.active.store(active, Ordering::SeqCst);
        active
    }

    /// Publish a sample and return how many subscribers will see it.
    ///
    /// Having no subscribers is not an error.
    pub fn publish(&self, sample: LocationSample) -> usize {
        self.tx.send(sample).unwrap_or(0)
    }

    /// Receive samples published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LocationSample> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
