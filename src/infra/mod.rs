//! Infrastructure: SQLite connection, migrations, geography client.

pub mod db;
pub mod ibge;
pub mod migrations;

pub use db::{get_connection, init_db, open_db, DbPool};
pub use ibge::{GeoSource, IbgeClient};
pub use migrations::{Migration, MigrationStatusDto, MIGRATIONS};
