//! Location samples.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use time::OffsetDateTime;

/// JSON field carrying the x coordinate of an incoming entry.
pub const X_FIELD: &str = "x_cord";
/// JSON field carrying the y coordinate of an incoming entry.
pub const Y_FIELD: &str = "y_cord";

/// A raw coordinate pair.
///
/// Values are kept as JSON numbers so integers and floats survive storage
/// unchanged. No range validation is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// X coordinate.
    pub x: Number,
    /// Y coordinate.
    pub y: Number,
}

impl Coordinates {
    /// Create a coordinate pair.
    pub fn new(x: impl Into<Number>, y: impl Into<Number>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Extract coordinates from an incoming JSON entry.
    ///
    /// Returns `None` unless the entry is an object with both `x_cord` and
    /// `y_cord` present as numbers.
    ///
    /// ```
    /// use serde_json::json;
    /// use trailsync_types::Coordinates;
    ///
    /// assert!(Coordinates::from_entry(&json!({"x_cord": 1, "y_cord": 2.5})).is_some());
    /// assert!(Coordinates::from_entry(&json!({"x_cord": 1})).is_none());
    /// assert!(Coordinates::from_entry(&json!({"x_cord": "1", "y_cord": 2})).is_none());
    /// ```
    pub fn from_entry(entry: &Value) -> Option<Self> {
        let object: &Map<String, Value> = entry.as_object()?;
        let number = |field: &str| match object.get(field)? {
            Value::Number(n) => Some(n.clone()),
            _ => None,
        };
        Some(Self {
            x: number(X_FIELD)?,
            y: number(Y_FIELD)?,
        })
    }
}

/// One recorded point attributed to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Originating device or user.
    pub client_id: String,
    /// Coordinates as received.
    pub coordinates: Coordinates,
    /// Server-assigned UTC instant of insertion.
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
}

impl LocationSample {
    /// Stamp a coordinate pair for `client_id` at `logged_at`.
    pub fn new(client_id: &str, coordinates: Coordinates, logged_at: OffsetDateTime) -> Self {
        Self {
            client_id: client_id.to_string(),
            coordinates,
            logged_at,
        }
    }
}
