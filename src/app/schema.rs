//! Schema migration use cases over the managed pool.

use crate::error::AppError;
use crate::infra::get_connection;
use crate::infra::migrations::{
    migrate_down, migrate_up, migration_status, rollback_all, MigrationStatusDto, MIGRATIONS,
};
use crate::infra::DbPool;

pub fn schema_migrate_latest(pool: &DbPool) -> Result<Vec<i32>, AppError> {
    let mut conn = get_connection(pool)?;
    migrate_up(&mut conn, MIGRATIONS)
}

pub fn schema_rollback(pool: &DbPool) -> Result<Vec<i32>, AppError> {
    let mut conn = get_connection(pool)?;
    migrate_down(&mut conn, MIGRATIONS)
}

pub fn schema_rollback_all(pool: &DbPool) -> Result<Vec<i32>, AppError> {
    let mut conn = get_connection(pool)?;
    rollback_all(&mut conn, MIGRATIONS)
}

pub fn schema_status(pool: &DbPool) -> Result<Vec<MigrationStatusDto>, AppError> {
    let conn = get_connection(pool)?;
    migration_status(&conn, MIGRATIONS)
}
