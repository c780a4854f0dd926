//! Domain types for day-partitioned location tracking.
//!
//! This crate provides the types shared by the store and the HTTP service:
//!
//! - [`PartitionKey`] and [`partition_for`] name the UTC day a sample lives in
//! - [`LocationSample`] and [`Coordinates`] describe one recorded point
//! - [`parse_watermark`] reads a client's resume timestamp
//! - [`Clock`] abstracts "now" so day boundaries can be tested
//!
//! # Example
//!
//! ```
//! use time::macros::datetime;
//! use trailsync_types::{Coordinates, LocationSample, partition_for};
//!
//! let now = datetime!(2024-01-15 10:30 UTC);
//! let sample = LocationSample::new("u1", Coordinates::new(1, 2), now);
//! assert_eq!(partition_for(sample.logged_at).to_string(), "2024_01_15");
//! ```

pub mod clock;
pub mod error;
pub mod partition;
pub mod sample;
pub mod watermark;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ParseError, ParseResult};
pub use partition::{PartitionKey, partition_for};
pub use sample::{Coordinates, LocationSample, X_FIELD, Y_FIELD};
pub use watermark::parse_watermark;
