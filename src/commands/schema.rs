//! Migration runner commands.

use crate::app::{schema_migrate_latest, schema_rollback, schema_rollback_all, schema_status};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::infra::{open_db, MigrationStatusDto};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MigrateResp {
    pub db_path: String,
    pub versions: Vec<i32>,
}

pub fn cmd_schema_up(config: &AppConfig) -> Result<MigrateResp, AppError> {
    let pool = open_db(&config.db_path)?;
    let versions = schema_migrate_latest(&pool)?;
    Ok(MigrateResp {
        db_path: config.db_path.display().to_string(),
        versions,
    })
}

pub fn cmd_schema_down(config: &AppConfig, all: bool) -> Result<MigrateResp, AppError> {
    let pool = open_db(&config.db_path)?;
    let versions = if all {
        schema_rollback_all(&pool)?
    } else {
        schema_rollback(&pool)?
    };
    Ok(MigrateResp {
        db_path: config.db_path.display().to_string(),
        versions,
    })
}

pub fn cmd_schema_status(config: &AppConfig) -> Result<Vec<MigrationStatusDto>, AppError> {
    let pool = open_db(&config.db_path)?;
    schema_status(&pool)
}
