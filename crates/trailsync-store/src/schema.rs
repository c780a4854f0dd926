//! Database schema and migrations.
//!
//! The fixed schema holds only bookkeeping: the schema version and the
//! partition registry. Day partitions are separate tables created on first
//! write (see [`partition_table`]).

use rusqlite::Connection;

use trailsync_types::PartitionKey;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Prefix of every day-partition table.
pub const PARTITION_TABLE_PREFIX: &str = "samples_";

/// Initialize the database schema.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version < SCHEMA_VERSION {
        migrate(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- One row per day partition that has received a write
        CREATE TABLE IF NOT EXISTS partitions (
            name TEXT PRIMARY KEY
        );
        "#,
    )?;

    Ok(())
}

fn migrate(conn: &Connection, old_version: i32) -> Result<()> {
    // Add future migrations here
    // if old_version < 2 { migrate_to_v2(conn)?; }

    let _ = old_version;
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

/// Table name backing a day partition.
///
/// `PartitionKey` only formats as `YYYY_MM_DD`, so the name never needs
/// escaping.
pub fn partition_table(key: &PartitionKey) -> String {
    format!("{}{}", PARTITION_TABLE_PREFIX, key)
}

/// Create the table for a day partition if it does not exist yet.
///
/// Coordinate columns carry no declared type so SQLite keeps integers and
/// reals exactly as bound.
pub fn create_partition_table(conn: &Connection, key: &PartitionKey) -> Result<()> {
    let table = partition_table(key);
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS "{table}" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            client_id TEXT NOT NULL,
            x_cord,
            y_cord,
            logged_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS "idx_{table}_client_time"
            ON "{table}"(client_id, logged_at);
        CREATE INDEX IF NOT EXISTS "idx_{table}_time"
            ON "{table}"(logged_at);
        "#
    ))?;
    Ok(())
}

/// Whether the table for a day partition exists.
pub fn partition_table_exists(conn: &Connection, key: &PartitionKey) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name = ?",
        [partition_table(key)],
        |row| row.get(0),
    )?;
    Ok(exists)
}
