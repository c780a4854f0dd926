//! Query builder for partition scans.
//!
//! Every read against a day partition goes through [`SampleQuery`]: an
//! optional client filter, an optional inclusive lower bound on
//! `logged_at`, and an optional limit. Results are always ascending by
//! `logged_at`, with insertion order breaking ties.
//!
//! # Example
//!
//! ```
//! use trailsync_store::SampleQuery;
//! use time::macros::datetime;
//!
//! // Earliest sample for a client at or after a watermark
//! let probe = SampleQuery::new()
//!     .client("u1")
//!     .since(datetime!(2024-01-15 10:00 UTC))
//!     .limit(1);
//! assert_eq!(probe.limit, Some(1));
//! ```

use time::OffsetDateTime;

use crate::schema::partition_table;
use trailsync_types::PartitionKey;

/// Fluent query builder for samples in one partition.
#[derive(Debug, Default, Clone)]
pub struct SampleQuery {
    /// Filter by client ID. `None` means all clients.
    pub client_id: Option<String>,
    /// Include only samples logged at or after this instant.
    pub since: Option<OffsetDateTime>,
    /// Maximum number of results.
    pub limit: Option<u32>,
}

impl SampleQuery {
    /// Create an unfiltered, unbounded query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by client ID.
    pub fn client(mut self, client_id: &str) -> Self {
        self.client_id = Some(client_id.to_string());
        self
    }

    /// Apply an optional client filter.
    pub fn maybe_client(self, client_id: Option<&str>) -> Self {
        match client_id {
            Some(id) => self.client(id),
            None => self,
        }
    }

    /// Filter to samples logged at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref client_id) = self.client_id {
            conditions.push("client_id = ?");
            params.push(Box::new(client_id.clone()));
        }

        if let Some(since) = self.since {
            conditions.push("logged_at >= ?");
            params.push(Box::new(bound_nanos(since)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SELECT against a partition table.
    pub(crate) fn build_sql(&self, key: &PartitionKey) -> String {
        let (where_clause, _) = self.build_where();

        let mut sql = format!(
            "SELECT client_id, x_cord, y_cord, logged_at FROM \"{}\" {} \
             ORDER BY logged_at ASC, id ASC",
            partition_table(key),
            where_clause
        );

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }

    /// Build an existence check against a partition table.
    pub(crate) fn build_exists_sql(&self, key: &PartitionKey) -> String {
        let (where_clause, _) = self.build_where();
        format!(
            "SELECT EXISTS(SELECT 1 FROM \"{}\" {})",
            partition_table(key),
            where_clause
        )
    }
}

/// Nanoseconds since the Unix epoch, saturated to the `i64` range.
///
/// Stored timestamps always fit, so clamping a query bound never changes
/// which rows match.
pub(crate) fn bound_nanos(time: OffsetDateTime) -> i64 {
    time.unix_timestamp_nanos()
        .clamp(i64::MIN as i128, i64::MAX as i128) as i64
}
