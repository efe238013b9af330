//! Application use cases.

mod location;
mod schema;

pub use location::{
    LocationSelector, LocationViewDto, Navigator, SelectOptionDto, LOCALITY_PLACEHOLDER,
    REGION_PLACEHOLDER,
};
pub use schema::{schema_migrate_latest, schema_rollback, schema_rollback_all, schema_status};
