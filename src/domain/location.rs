//! Region/locality selection state and its state machine rules.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Navigation target that receives the confirmed selection.
pub const POINTS_TARGET: &str = "Points";

/// First-level division, identified by its UF code (e.g. "SP").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(pub String);

/// Second-level division, identified by its display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locality(pub String);

impl Region {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Locality {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the locality list stands relative to the selected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "state")]
pub enum LocalityPhase {
    Idle,
    LoadingLocalities { token: u64 },
    Ready,
}

impl LocalityPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::LoadingLocalities { .. } => "LOADING_LOCALITIES",
            Self::Ready => "READY",
        }
    }
}

/// Everything the selection screen knows. `None` selections are the
/// "nothing selected" sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationState {
    pub regions: Vec<Region>,
    pub regions_error: Option<String>,
    pub localities: Vec<Locality>,
    pub localities_error: Option<String>,
    pub selected_region: Option<Region>,
    pub selected_locality: Option<Locality>,
    pub phase: LocalityPhase,
    regions_in_flight: Option<u64>,
    next_token: u64,
}

impl Default for LocationState {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            regions_error: None,
            localities: Vec::new(),
            localities_error: None,
            selected_region: None,
            selected_locality: None,
            phase: LocalityPhase::Idle,
            regions_in_flight: None,
            next_token: 1,
        }
    }
}

impl LocationState {
    /// Token of the locality fetch currently allowed to land, if any.
    pub fn in_flight_token(&self) -> Option<u64> {
        match self.phase {
            LocalityPhase::LoadingLocalities { token } => Some(token),
            _ => None,
        }
    }

    /// Token of the region fetch currently allowed to land, if any.
    pub fn regions_token(&self) -> Option<u64> {
        self.regions_in_flight
    }

    /// Drop both selections and any in-flight locality fetch.
    fn clear_selection(&mut self) {
        self.issue_token();
        self.selected_region = None;
        self.selected_locality = None;
        self.localities_error = None;
        self.phase = LocalityPhase::Idle;
    }

    /// A selected region must stay one of the loaded codes.
    fn reconcile_selection(&mut self) {
        let stale = match &self.selected_region {
            Some(region) => !self.regions.contains(region),
            None => false,
        };
        if stale {
            self.clear_selection();
            self.localities.clear();
        }
    }

    fn issue_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    LoadRegions,
    RegionsLoaded {
        token: u64,
        regions: Vec<Region>,
    },
    RegionsFailed {
        token: u64,
        message: String,
    },
    SelectRegion(Option<Region>),
    LocalitiesLoaded {
        token: u64,
        localities: Vec<Locality>,
    },
    LocalitiesFailed {
        token: u64,
        message: String,
    },
    RetryLocalities,
    SelectLocality(Option<Locality>),
}

/// Side effect the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    FetchRegions { token: u64 },
    FetchLocalities { region: Region, token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsParams {
    pub selected_uf: String,
    pub selected_city: String,
}

/// Hand-off to the downstream screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub target: String,
    pub params: PointsParams,
}

/// State machine: pure transitions over `LocationState`.
pub struct LocationMachine;

impl LocationMachine {
    pub fn reduce(
        state: &LocationState,
        action: Action,
    ) -> Result<(LocationState, Effect), AppError> {
        let mut next = state.clone();
        let effect = match action {
            Action::LoadRegions => {
                // A newer request supersedes any region fetch still in flight.
                let token = next.issue_token();
                next.regions_in_flight = Some(token);
                Effect::FetchRegions { token }
            }
            Action::RegionsLoaded { token, regions } => {
                if state.regions_in_flight != Some(token) {
                    return Ok((next, Effect::None));
                }
                next.regions_in_flight = None;
                next.regions = regions;
                next.regions_error = None;
                next.reconcile_selection();
                Effect::None
            }
            Action::RegionsFailed { token, message } => {
                if state.regions_in_flight != Some(token) {
                    return Ok((next, Effect::None));
                }
                next.regions_in_flight = None;
                next.regions.clear();
                next.regions_error = Some(message);
                next.reconcile_selection();
                Effect::None
            }
            Action::SelectRegion(Some(region)) => {
                if !state.regions.contains(&region) {
                    return Err(AppError::Validation(format!("unknown region: {}", region)));
                }
                if state.selected_region.as_ref() == Some(&region) {
                    return Ok((next, Effect::None));
                }
                let token = next.issue_token();
                next.selected_region = Some(region.clone());
                next.selected_locality = None;
                next.localities.clear();
                next.localities_error = None;
                next.phase = LocalityPhase::LoadingLocalities { token };
                Effect::FetchLocalities { region, token }
            }
            Action::SelectRegion(None) => {
                // Burns a token so an in-flight fetch can no longer land.
                next.clear_selection();
                Effect::None
            }
            Action::LocalitiesLoaded { token, localities } => {
                if state.in_flight_token() != Some(token) {
                    return Ok((next, Effect::None));
                }
                next.localities = localities;
                next.localities_error = None;
                next.phase = LocalityPhase::Ready;
                Effect::None
            }
            Action::LocalitiesFailed { token, message } => {
                if state.in_flight_token() != Some(token) {
                    return Ok((next, Effect::None));
                }
                next.localities_error = Some(message);
                next.phase = LocalityPhase::Idle;
                Effect::None
            }
            Action::RetryLocalities => match (&state.selected_region, state.phase) {
                (Some(region), LocalityPhase::Idle) | (Some(region), LocalityPhase::Ready) => {
                    let token = next.issue_token();
                    next.localities.clear();
                    next.localities_error = None;
                    next.selected_locality = None;
                    next.phase = LocalityPhase::LoadingLocalities { token };
                    Effect::FetchLocalities {
                        region: region.clone(),
                        token,
                    }
                }
                _ => Effect::None,
            },
            Action::SelectLocality(Some(locality)) => {
                if !state.localities.contains(&locality) {
                    return Err(AppError::Validation(format!(
                        "unknown locality: {}",
                        locality
                    )));
                }
                next.selected_locality = Some(locality);
                Effect::None
            }
            Action::SelectLocality(None) => {
                next.selected_locality = None;
                Effect::None
            }
        };
        Ok((next, effect))
    }

    /// Returns true if both selections are made.
    pub fn can_proceed(state: &LocationState) -> bool {
        state.selected_region.is_some() && state.selected_locality.is_some()
    }

    pub fn proceed(state: &LocationState) -> Result<NavigationRequest, AppError> {
        let region = state
            .selected_region
            .as_ref()
            .ok_or_else(|| AppError::Validation("region is required".into()))?;
        let locality = state
            .selected_locality
            .as_ref()
            .ok_or_else(|| AppError::Validation("locality is required".into()))?;
        Ok(NavigationRequest {
            target: POINTS_TARGET.to_string(),
            params: PointsParams {
                selected_uf: region.0.clone(),
                selected_city: locality.0.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> LocationState {
        let (s, effect) =
            LocationMachine::reduce(&LocationState::default(), Action::LoadRegions).unwrap();
        assert_eq!(effect, Effect::FetchRegions { token: 1 });
        let (s, _) = LocationMachine::reduce(
            &s,
            Action::RegionsLoaded {
                token: 1,
                regions: vec![Region::new("SP"), Region::new("RJ")],
            },
        )
        .unwrap();
        s
    }

    #[test]
    fn select_region_issues_fetch() {
        let (s, effect) =
            LocationMachine::reduce(&loaded(), Action::SelectRegion(Some(Region::new("SP"))))
                .unwrap();
        assert_eq!(
            effect,
            Effect::FetchLocalities {
                region: Region::new("SP"),
                token: 2
            }
        );
        assert_eq!(s.phase, LocalityPhase::LoadingLocalities { token: 2 });
    }

    #[test]
    fn stale_token_ignored() {
        let (s, _) =
            LocationMachine::reduce(&loaded(), Action::SelectRegion(Some(Region::new("SP"))))
                .unwrap();
        let (s2, _) = LocationMachine::reduce(
            &s,
            Action::LocalitiesLoaded {
                token: 99,
                localities: vec![Locality::new("Santos")],
            },
        )
        .unwrap();
        assert_eq!(s2, s);
    }

    #[test]
    fn failed_reload_drops_selection() {
        let (s, _) =
            LocationMachine::reduce(&loaded(), Action::SelectRegion(Some(Region::new("SP"))))
                .unwrap();
        let (s, effect) = LocationMachine::reduce(&s, Action::LoadRegions).unwrap();
        let Effect::FetchRegions { token } = effect else {
            panic!("expected region fetch");
        };
        let (s, _) = LocationMachine::reduce(
            &s,
            Action::RegionsFailed {
                token,
                message: "down".into(),
            },
        )
        .unwrap();
        assert_eq!(s.selected_region, None);
        assert_eq!(s.in_flight_token(), None);
        assert_eq!(s.phase, LocalityPhase::Idle);
    }

    #[test]
    fn proceed_requires_locality() {
        let (s, _) =
            LocationMachine::reduce(&loaded(), Action::SelectRegion(Some(Region::new("SP"))))
                .unwrap();
        let err = LocationMachine::proceed(&s).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(!LocationMachine::can_proceed(&s));
    }
}
