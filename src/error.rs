//! Stable error codes for frontend.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Db(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Migration {migration} requires {dependency}")]
    MissingDependency {
        migration: String,
        dependency: String,
    },

    #[error("IO error: {0}")]
    Io(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Db(_) => "DB_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Network(_) => "NETWORK_ERROR",
            Self::InvalidResponse(_) => "INVALID_RESPONSE",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::MissingDependency { .. } => "MISSING_DEPENDENCY",
            Self::Io(_) => "IO_ERROR",
        }
    }

    pub fn to_serde(&self) -> AppErrorDto {
        let details = match self {
            Self::MissingDependency {
                migration,
                dependency,
            } => Some(serde_json::json!({
                "migration": migration,
                "dependency": dependency,
            })),
            _ => None,
        };
        AppErrorDto {
            code: self.code().to_string(),
            message: self.to_string(),
            details,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Db(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_serde().serialize(serializer)
    }
}

#[derive(Debug, Serialize)]
pub struct AppErrorDto {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dependency_serializes_details() {
        let err = AppError::MissingDependency {
            migration: "2_create_point_items".into(),
            dependency: "table points".into(),
        };
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["code"], "MISSING_DEPENDENCY");
        assert_eq!(v["details"]["dependency"], "table points");
        assert_eq!(
            v["message"],
            "Migration 2_create_point_items requires table points"
        );
    }

    #[test]
    fn rusqlite_error_maps_to_db() {
        let err: AppError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.code(), "DB_ERROR");
    }
}
