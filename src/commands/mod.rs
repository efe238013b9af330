//! Command handlers (CLI boundary).

pub mod location;
pub mod schema;
