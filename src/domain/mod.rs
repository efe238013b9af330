//! Domain types and pure rules.

pub mod location;

pub use location::{
    Action, Effect, Locality, LocalityPhase, LocationMachine, LocationState, NavigationRequest,
    PointsParams, Region, POINTS_TARGET,
};
