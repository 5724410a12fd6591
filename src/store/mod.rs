//! Embedded SQLite store for the concept cache.
//!
//! The build step owns the only writable connection and recreates the schema
//! on every run. The API opens the file read-only through an r2d2 pool so
//! queries can run in parallel on the blocking thread pool.
//!
//! # Invariants
//! - Every connection handed out has `foreign_keys=ON`.
//! - Read-only openers never create the database file.

use crate::utils::error::{ConceptsError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

mod concept_repo;
mod schema;

pub use concept_repo::{
    count_concepts, get_concept, get_concept_detail, insert_concept, insert_related_relation,
    insert_subconcept_relation, parent_concepts, ping, related_concepts, search, subconcepts,
};
pub use schema::recreate_schema;

pub type ConceptPool = Pool<SqliteConnectionManager>;

const READ_ONLY_FLAGS: OpenFlags = OpenFlags::SQLITE_OPEN_READ_ONLY
    .union(OpenFlags::SQLITE_OPEN_URI)
    .union(OpenFlags::SQLITE_OPEN_NO_MUTEX);

/// Opens (creating if needed) the database for a build.
pub fn open_read_write(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path).inspect_err(|err| {
        tracing::error!(path = %path.display(), error = %err, "Failed to open database");
    })?;
    configure(&conn)?;

    tracing::debug!(
        path = %path.display(),
        duration_ms = started_at.elapsed().as_millis() as u64,
        "Opened database read-write"
    );
    Ok(conn)
}

/// Opens an existing database without write access.
pub fn open_read_only(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    ensure_exists(path)?;

    let conn = Connection::open_with_flags(path, READ_ONLY_FLAGS)?;
    configure(&conn)?;
    Ok(conn)
}

/// Builds a pool of read-only connections to an existing database.
pub fn read_only_pool(path: impl AsRef<Path>, size: u32) -> Result<ConceptPool> {
    let path = path.as_ref();
    ensure_exists(path)?;

    let manager = SqliteConnectionManager::file(path)
        .with_flags(READ_ONLY_FLAGS)
        .with_init(|conn| configure(conn).map_err(into_sqlite_error));

    let pool = Pool::builder()
        .max_size(size.max(1))
        .connection_timeout(Duration::from_secs(5))
        .build(manager)?;

    tracing::info!(path = %path.display(), size, "Opened read-only connection pool");
    Ok(pool)
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(ConceptsError::ConfigError {
            message: format!(
                "database file {} does not exist, run `concepts build` first",
                path.display()
            ),
        });
    }
    Ok(())
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

fn into_sqlite_error(err: ConceptsError) -> rusqlite::Error {
    match err {
        ConceptsError::DatabaseError(e) => e,
        other => rusqlite::Error::ToSqlConversionFailure(Box::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_only_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.db");

        assert!(matches!(
            open_read_only(&path),
            Err(ConceptsError::ConfigError { .. })
        ));
        assert!(read_only_pool(&path, 2).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("concepts.db");
        {
            let mut conn = open_read_write(&path).unwrap();
            let tx = conn.transaction().unwrap();
            recreate_schema(&tx).unwrap();
            tx.commit().unwrap();
        }

        let conn = open_read_only(&path).unwrap();
        let result = conn.execute(
            "INSERT INTO concepts (wikibase_id, preferred_label, alternative_labels, negative_labels, labelled_passages)
             VALUES ('Q1', 'x', '[]', '[]', '[]')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pool_connections_enforce_foreign_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("concepts.db");
        open_read_write(&path).unwrap();

        let pool = read_only_pool(&path, 2).unwrap();
        let conn = pool.get().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_open_read_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/concepts.db");
        open_read_write(&path).unwrap();
        assert!(path.exists());
    }
}
