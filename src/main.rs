use app_lib::app::LocationSelector;
use app_lib::commands::location::{cmd_location_select, StdoutNavigator};
use app_lib::commands::schema::{cmd_schema_down, cmd_schema_status, cmd_schema_up};
use app_lib::config::AppConfig;
use app_lib::error::AppError;
use app_lib::infra::IbgeClient;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Ecoleta: pick a UF and city, or manage the marketplace schema.
#[derive(Parser)]
#[command(name = "ecoleta", version, about, long_about = None)]
struct Cli {
    /// Geography API base URL (overrides ECOLETA_GEO_BASE_URL).
    #[arg(long, global = true)]
    geo_url: Option<String>,

    /// SQLite database file (overrides ECOLETA_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Choose a UF and city, then print the navigation request.
    Select,
    /// Schema migrations.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations as one batch.
    Up,
    /// Roll back the latest batch.
    Down,
    /// Roll back every applied migration.
    RollbackAll,
    /// Show each migration and whether it is applied.
    Status,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| AppError::Io(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = AppConfig::from_env()?.with_overrides(cli.geo_url, cli.db);

    match cli.command {
        Command::Select => {
            let client = IbgeClient::new(config.geo_base_url.clone(), config.http_timeout);
            let selector = LocationSelector::new(client);
            let stdin = std::io::stdin();
            cmd_location_select(&selector, &StdoutNavigator, stdin.lock(), std::io::stderr())
                .await?;
        }
        Command::Migrate { action } => match action {
            MigrateAction::Up => print_json(&cmd_schema_up(&config)?)?,
            MigrateAction::Down => print_json(&cmd_schema_down(&config, false)?)?,
            MigrateAction::RollbackAll => print_json(&cmd_schema_down(&config, true)?)?,
            MigrateAction::Status => print_json(&cmd_schema_status(&config)?)?,
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    app_lib::init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            if let Ok(json) = serde_json::to_string(&e.to_serde()) {
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}
