//! Runtime configuration: defaults, then environment, then CLI overrides.

use crate::error::AppError;
use crate::infra::ibge::DEFAULT_BASE_URL;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_GEO_BASE_URL: &str = "ECOLETA_GEO_BASE_URL";
pub const ENV_DB_PATH: &str = "ECOLETA_DB_PATH";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "ECOLETA_HTTP_TIMEOUT_SECS";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub geo_base_url: String,
    pub db_path: PathBuf,
    pub http_timeout: Duration,
}

fn app_data_dir() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("br.com.ecoleta")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            geo_base_url: DEFAULT_BASE_URL.to_string(),
            db_path: app_data_dir().join("app.db"),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(url) = get(ENV_GEO_BASE_URL) {
            config.geo_base_url = url;
        }
        if let Some(path) = get(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(secs) = get(ENV_HTTP_TIMEOUT_SECS) {
            let secs: u64 = secs.parse().map_err(|_| {
                AppError::Validation(format!(
                    "{} must be a whole number of seconds",
                    ENV_HTTP_TIMEOUT_SECS
                ))
            })?;
            if secs == 0 {
                return Err(AppError::Validation(format!(
                    "{} must be greater than zero",
                    ENV_HTTP_TIMEOUT_SECS
                )));
            }
            config.http_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_overrides(
        mut self,
        geo_base_url: Option<String>,
        db_path: Option<PathBuf>,
    ) -> Self {
        if let Some(url) = geo_base_url {
            self.geo_base_url = url;
        }
        if let Some(path) = db_path {
            self.db_path = path;
        }
        self
    }
}
