//! SQLite connection handling.

use crate::error::AppError;
use crate::infra::migrations::{migrate_up, MIGRATIONS};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

pub struct DbPool(pub Mutex<Connection>);

/// Open DB at path with foreign keys enforced. No migrations are run.
pub fn open_db(db_path: &Path) -> Result<DbPool, AppError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;
    configure(&conn)?;
    Ok(DbPool(Mutex::new(conn)))
}

/// Initialize DB at path, apply pending migrations, return managed pool.
pub fn init_db(db_path: &Path) -> Result<DbPool, AppError> {
    let pool = open_db(db_path)?;
    {
        let mut conn = get_connection(&pool)?;
        let applied = migrate_up(&mut conn, MIGRATIONS)?;
        log::info!("DB ready at {:?}, {} migration(s) applied", db_path, applied.len());
    }
    Ok(pool)
}

/// In-memory DB with foreign keys enforced and no migrations applied.
pub fn init_test_db() -> DbPool {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    configure(&conn).expect("configure in-memory db");
    DbPool(Mutex::new(conn))
}

fn configure(conn: &Connection) -> Result<(), AppError> {
    // Must run outside a transaction, SQLite ignores it otherwise.
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

/// Get connection from pool.
pub fn get_connection(pool: &DbPool) -> Result<std::sync::MutexGuard<'_, Connection>, AppError> {
    pool.0.lock().map_err(|e| AppError::Db(e.to_string()))
}

/// Names of user tables, excluding SQLite internals and the migration ledger.
pub fn user_tables(conn: &Connection) -> Result<Vec<String>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != 'schema_migrations' ORDER BY name",
    )?;
    let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool, AppError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        [name],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_keys_enabled() {
        let pool = init_test_db();
        let conn = get_connection(&pool).unwrap();
        let on: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(on, 1);
    }

    #[test]
    fn user_tables_skips_internal() {
        let pool = init_test_db();
        let conn = get_connection(&pool).unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY);
             CREATE TABLE zeta (id INTEGER PRIMARY KEY AUTOINCREMENT);
             CREATE TABLE alpha (id INTEGER);
             INSERT INTO zeta DEFAULT VALUES;",
        )
        .unwrap();
        assert_eq!(user_tables(&conn).unwrap(), vec!["alpha", "zeta"]);
        assert!(table_exists(&conn, "zeta").unwrap());
        assert!(!table_exists(&conn, "points").unwrap());
        // SQLite resolves table names case-insensitively.
        assert!(table_exists(&conn, "ZETA").unwrap());
    }
}
