//! Schema migrations with declared dependencies and batch rollback.

use crate::error::AppError;
use crate::infra::db::table_exists;
use chrono::Utc;
use rusqlite::{params, Connection, Transaction};
use serde::Serialize;

/// One reversible schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    /// Versions that must already be applied.
    pub depends_on: &'static [i32],
    /// Tables owned outside this plan that must exist before `up` runs.
    pub requires_tables: &'static [&'static str],
    pub up: &'static str,
    pub down: &'static str,
}

impl Migration {
    pub fn label(&self) -> String {
        format!("{}_{}", self.version, self.name)
    }
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_items",
        depends_on: &[],
        requires_tables: &[],
        up: include_str!("../../migrations/0001_create_items.up.sql"),
        down: include_str!("../../migrations/0001_create_items.down.sql"),
    },
    Migration {
        version: 2,
        name: "create_point_items",
        depends_on: &[1],
        requires_tables: &["points"],
        up: include_str!("../../migrations/0002_create_point_items.up.sql"),
        down: include_str!("../../migrations/0002_create_point_items.down.sql"),
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatusDto {
    pub version: i32,
    pub name: String,
    pub applied: bool,
    pub batch: Option<i64>,
    pub applied_at: Option<String>,
}

#[derive(Debug, Clone)]
struct AppliedRow {
    version: i32,
    batch: i64,
    applied_at: String,
}

/// Versions strictly ascending, every dependency points to an earlier entry.
pub fn validate_plan(plan: &[Migration]) -> Result<(), AppError> {
    for (i, m) in plan.iter().enumerate() {
        if i > 0 && plan[i - 1].version >= m.version {
            return Err(AppError::Migration(format!(
                "versions must be strictly ascending: {} after {}",
                m.version,
                plan[i - 1].version
            )));
        }
        for dep in m.depends_on {
            if !plan[..i].iter().any(|p| p.version == *dep) {
                return Err(AppError::Migration(format!(
                    "{} depends on {} which is not declared before it",
                    m.label(),
                    dep
                )));
            }
        }
    }
    Ok(())
}

fn ensure_ledger(tx: &Transaction<'_>) -> Result<(), AppError> {
    tx.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (version INTEGER PRIMARY KEY, name TEXT NOT NULL, batch INTEGER NOT NULL, applied_at TEXT NOT NULL)",
        [],
    )?;
    Ok(())
}

fn applied_rows(conn: &Connection) -> Result<Vec<AppliedRow>, AppError> {
    let mut stmt =
        conn.prepare("SELECT version, batch, applied_at FROM schema_migrations ORDER BY version")?;
    let rows = stmt.query_map([], |r| {
        Ok(AppliedRow {
            version: r.get(0)?,
            batch: r.get(1)?,
            applied_at: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn find<'a>(plan: &'a [Migration], version: i32) -> Result<&'a Migration, AppError> {
    plan.iter().find(|m| m.version == version).ok_or_else(|| {
        AppError::Migration(format!(
            "applied version {} is missing from the migration plan",
            version
        ))
    })
}

/// Apply every pending migration as one batch. Returns applied versions.
pub fn migrate_up(conn: &mut Connection, plan: &[Migration]) -> Result<Vec<i32>, AppError> {
    validate_plan(plan)?;
    let tx = conn.transaction()?;
    ensure_ledger(&tx)?;

    let applied = applied_rows(&tx)?;
    for row in &applied {
        find(plan, row.version)?;
    }
    let batch = applied.iter().map(|r| r.batch).max().unwrap_or(0) + 1;
    let mut done: Vec<i32> = Vec::new();

    for m in plan {
        if applied.iter().any(|r| r.version == m.version) {
            continue;
        }
        for dep in m.depends_on {
            let satisfied = done.contains(dep) || applied.iter().any(|r| r.version == *dep);
            if !satisfied {
                return Err(AppError::MissingDependency {
                    migration: m.label(),
                    dependency: format!("migration {}", dep),
                });
            }
        }
        for table in m.requires_tables {
            if !table_exists(&tx, table)? {
                return Err(AppError::MissingDependency {
                    migration: m.label(),
                    dependency: format!("table {}", table),
                });
            }
        }
        tx.execute_batch(m.up)
            .map_err(|e| AppError::Migration(format!("{} up: {}", m.label(), e)))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, batch, applied_at) VALUES (?1, ?2, ?3, ?4)",
            params![m.version, m.name, batch, Utc::now().to_rfc3339()],
        )?;
        log::info!("Applied migration {} (batch {})", m.label(), batch);
        done.push(m.version);
    }

    tx.commit()?;
    Ok(done)
}

/// Reverse the most recent batch, newest version first. Returns reverted versions.
pub fn migrate_down(conn: &mut Connection, plan: &[Migration]) -> Result<Vec<i32>, AppError> {
    validate_plan(plan)?;
    let tx = conn.transaction()?;
    ensure_ledger(&tx)?;

    let applied = applied_rows(&tx)?;
    let Some(last_batch) = applied.iter().map(|r| r.batch).max() else {
        return Ok(Vec::new());
    };
    let mut batch: Vec<i32> = applied
        .iter()
        .filter(|r| r.batch == last_batch)
        .map(|r| r.version)
        .collect();
    batch.sort_unstable_by(|a, b| b.cmp(a));

    for version in &batch {
        let m = find(plan, *version)?;
        for other in applied.iter().filter(|r| r.batch != last_batch) {
            if find(plan, other.version)?.depends_on.contains(version) {
                return Err(AppError::Migration(format!(
                    "cannot roll back {}: migration {} still depends on it",
                    m.label(),
                    other.version
                )));
            }
        }
        tx.execute_batch(m.down)
            .map_err(|e| AppError::Migration(format!("{} down: {}", m.label(), e)))?;
        tx.execute("DELETE FROM schema_migrations WHERE version = ?1", [version])?;
        log::info!("Rolled back migration {} (batch {})", m.label(), last_batch);
    }

    tx.commit()?;
    Ok(batch)
}

/// Roll back batch after batch until nothing is applied.
pub fn rollback_all(conn: &mut Connection, plan: &[Migration]) -> Result<Vec<i32>, AppError> {
    let mut reverted = Vec::new();
    loop {
        let batch = migrate_down(conn, plan)?;
        if batch.is_empty() {
            return Ok(reverted);
        }
        reverted.extend(batch);
    }
}

pub fn migration_status(
    conn: &Connection,
    plan: &[Migration],
) -> Result<Vec<MigrationStatusDto>, AppError> {
    let applied = if table_exists(conn, "schema_migrations")? {
        applied_rows(conn)?
    } else {
        Vec::new()
    };
    Ok(plan
        .iter()
        .map(|m| {
            let row = applied.iter().find(|r| r.version == m.version);
            MigrationStatusDto {
                version: m.version,
                name: m.name.to_string(),
                applied: row.is_some(),
                batch: row.map(|r| r.batch),
                applied_at: row.map(|r| r.applied_at.clone()),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_plan_is_valid() {
        assert!(validate_plan(MIGRATIONS).is_ok());
    }

    #[test]
    fn dependency_on_later_migration_rejected() {
        let plan = [
            Migration {
                version: 1,
                name: "a",
                depends_on: &[2],
                requires_tables: &[],
                up: "",
                down: "",
            },
            Migration {
                version: 2,
                name: "b",
                depends_on: &[],
                requires_tables: &[],
                up: "",
                down: "",
            },
        ];
        let err = validate_plan(&plan).unwrap_err();
        assert_eq!(err.code(), "MIGRATION_ERROR");
    }

    #[test]
    fn duplicate_versions_rejected() {
        let step = Migration {
            version: 1,
            name: "a",
            depends_on: &[],
            requires_tables: &[],
            up: "",
            down: "",
        };
        assert!(validate_plan(&[step, step]).is_err());
    }
}
