pub mod app;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;

/// Install the `log` backend. `RUST_LOG` overrides the build default.
pub fn init_logging() {
    let default_level = if cfg!(debug_assertions) {
        "info"
    } else {
        "warn"
    };
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
