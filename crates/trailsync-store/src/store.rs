//! Main store implementation.

use std::path::Path;

use rusqlite::Connection;
use rusqlite::types::{Type, Value, ValueRef};
use serde_json::Number;
use time::OffsetDateTime;
use tracing::{debug, info};

use trailsync_types::{Coordinates, LocationSample, PartitionKey};

use crate::error::{Error, Result};
use crate::queries::SampleQuery;
use crate::schema::{self, partition_table};
use crate::traits::{EventStore, PartitionRegistry};

/// SQLite-based store for day-partitioned location samples.
///
/// Each UTC day lives in its own table, and a `partitions` table records
/// which days have data.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Run a query against one partition.
    ///
    /// A partition that was never written has no table and yields no rows.
    pub fn query_samples(
        &self,
        key: &PartitionKey,
        query: &SampleQuery,
    ) -> Result<Vec<LocationSample>> {
        if !schema::partition_table_exists(&self.conn, key)? {
            return Ok(Vec::new());
        }

        let sql = query.build_sql(key);
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let samples = stmt
            .query_map(params_ref.as_slice(), row_to_sample)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(samples)
    }
}

// Registry operations
impl PartitionRegistry for Store {
    fn list_known_partitions(&self) -> Result<Vec<PartitionKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM partitions ORDER BY name ASC")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let keys = names
            .iter()
            .map(|name| PartitionKey::parse(name))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(keys)
    }

    fn ensure_registered(&self, key: &PartitionKey) -> Result<bool> {
        let inserted = register(&self.conn, key)?;
        if inserted {
            info!("Registered partition {}", key);
        }
        Ok(inserted)
    }
}

// Sample operations
impl EventStore for Store {
    fn append(&self, key: &PartitionKey, samples: &[LocationSample]) -> Result<usize> {
        if samples.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        schema::create_partition_table(&tx, key)?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" (client_id, x_cord, y_cord, logged_at)
                 VALUES (?1, ?2, ?3, ?4)",
                partition_table(key)
            ))?;

            for sample in samples {
                let logged_at = i64::try_from(sample.logged_at.unix_timestamp_nanos())
                    .map_err(|_| Error::InvalidTimestamp(sample.logged_at.to_string()))?;

                stmt.execute(rusqlite::params![
                    sample.client_id,
                    number_to_sql(&sample.coordinates.x),
                    number_to_sql(&sample.coordinates.y),
                    logged_at,
                ])?;
            }
        }

        // Rows and registry entry commit together
        let registered = register(&tx, key)?;
        tx.commit()?;

        if registered {
            info!("Registered partition {}", key);
        }
        debug!("Appended {} samples to partition {}", samples.len(), key);
        Ok(samples.len())
    }

    fn scan_from(
        &self,
        key: &PartitionKey,
        client_id: Option<&str>,
        since: OffsetDateTime,
    ) -> Result<Vec<LocationSample>> {
        let query = SampleQuery::new().maybe_client(client_id).since(since);
        self.query_samples(key, &query)
    }

    fn scan_all(
        &self,
        key: &PartitionKey,
        client_id: Option<&str>,
    ) -> Result<Vec<LocationSample>> {
        let query = SampleQuery::new().maybe_client(client_id);
        self.query_samples(key, &query)
    }

    fn find_earliest_at_or_after(
        &self,
        key: &PartitionKey,
        client_id: Option<&str>,
        since: OffsetDateTime,
    ) -> Result<Option<LocationSample>> {
        let query = SampleQuery::new()
            .maybe_client(client_id)
            .since(since)
            .limit(1);
        let mut samples = self.query_samples(key, &query)?;
        Ok(samples.pop())
    }

    fn contains_client(&self, key: &PartitionKey, client_id: Option<&str>) -> Result<bool> {
        if !schema::partition_table_exists(&self.conn, key)? {
            return Ok(false);
        }

        let query = SampleQuery::new().maybe_client(client_id);
        let sql = query.build_exists_sql(key);
        let (_, params) = query.build_where();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let exists: bool = self
            .conn
            .query_row(&sql, params_ref.as_slice(), |row| row.get(0))?;
        Ok(exists)
    }
}

/// Insert a registry entry, returning whether it was new.
fn register(conn: &Connection, key: &PartitionKey) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO partitions (name) VALUES (?)",
        [key.to_string()],
    )?;
    Ok(inserted > 0)
}

fn row_to_sample(row: &rusqlite::Row<'_>) -> rusqlite::Result<LocationSample> {
    Ok(LocationSample {
        client_id: row.get(0)?,
        coordinates: Coordinates {
            x: number_from_sql(row.get_ref(1)?, 1)?,
            y: number_from_sql(row.get_ref(2)?, 2)?,
        },
        logged_at: instant_from_sql(row.get(3)?, 3)?,
    })
}

/// Bind a JSON number so integers stay integers.
fn number_to_sql(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Integer(i)
    } else {
        match n.as_f64() {
            Some(f) => Value::Real(f),
            None => Value::Null,
        }
    }
}

fn number_from_sql(value: ValueRef<'_>, idx: usize) -> rusqlite::Result<Number> {
    match value {
        ValueRef::Integer(i) => Ok(Number::from(i)),
        ValueRef::Real(f) => Number::from_f64(f).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                Type::Real,
                "non-finite coordinate".into(),
            )
        }),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "coordinate".to_string(),
            other.data_type(),
        )),
    }
}

fn instant_from_sql(nanos: i64, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}
