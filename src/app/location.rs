//! Location selection use cases: drives the state machine against a geography source.

use crate::domain::{
    Action, Effect, Locality, LocationMachine, LocationState, NavigationRequest, Region,
};
use crate::error::AppError;
use crate::infra::GeoSource;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

pub const REGION_PLACEHOLDER: &str = "Selecione uma UF";
pub const LOCALITY_PLACEHOLDER: &str = "Selecione uma cidade";

/// Downstream screen that consumes a confirmed selection.
pub trait Navigator {
    fn navigate(&self, request: &NavigationRequest) -> Result<(), AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOptionDto {
    pub label: String,
    /// `None` is the "nothing selected" placeholder.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationViewDto {
    pub region_options: Vec<SelectOptionDto>,
    pub locality_options: Vec<SelectOptionDto>,
    pub selected_uf: Option<String>,
    pub selected_city: Option<String>,
    pub phase: String,
    pub regions_error: Option<String>,
    pub localities_error: Option<String>,
    pub can_proceed: bool,
}

impl LocationViewDto {
    pub fn from_state(state: &LocationState) -> Self {
        let options = |placeholder: &str, values: Vec<String>| {
            std::iter::once(SelectOptionDto {
                label: placeholder.to_string(),
                value: None,
            })
            .chain(values.into_iter().map(|v| SelectOptionDto {
                label: v.clone(),
                value: Some(v),
            }))
            .collect::<Vec<_>>()
        };
        Self {
            region_options: options(
                REGION_PLACEHOLDER,
                state.regions.iter().map(|r| r.0.clone()).collect(),
            ),
            locality_options: options(
                LOCALITY_PLACEHOLDER,
                state.localities.iter().map(|l| l.0.clone()).collect(),
            ),
            selected_uf: state.selected_region.as_ref().map(|r| r.0.clone()),
            selected_city: state.selected_locality.as_ref().map(|l| l.0.clone()),
            phase: state.phase.as_str().to_string(),
            regions_error: state.regions_error.clone(),
            localities_error: state.localities_error.clone(),
            can_proceed: LocationMachine::can_proceed(state),
        }
    }
}

/// Owns the selection state for one screen session.
pub struct LocationSelector<S: GeoSource + 'static> {
    source: Arc<S>,
    state: Mutex<LocationState>,
}

impl<S: GeoSource + 'static> LocationSelector<S> {
    pub fn new(source: S) -> Self {
        Self::with_source(Arc::new(source))
    }

    pub fn with_source(source: Arc<S>) -> Self {
        Self {
            source,
            state: Mutex::new(LocationState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LocationState>, AppError> {
        self.state
            .lock()
            .map_err(|e| AppError::Db(format!("selection state poisoned: {}", e)))
    }

    fn dispatch(&self, action: Action) -> Result<Effect, AppError> {
        let mut state = self.lock()?;
        let (next, effect) = LocationMachine::reduce(&state, action)?;
        *state = next;
        Ok(effect)
    }

    pub fn state(&self) -> Result<LocationState, AppError> {
        Ok(self.lock()?.clone())
    }

    pub fn view(&self) -> Result<LocationViewDto, AppError> {
        Ok(LocationViewDto::from_state(&*self.lock()?))
    }

    /// Fetch the region list. A failure is recorded in the view, not returned.
    /// A response overtaken by a later call is dropped.
    pub async fn load_regions(&self) -> Result<LocationViewDto, AppError> {
        let effect = self.dispatch(Action::LoadRegions)?;
        self.perform(effect).await?;
        self.view()
    }

    pub async fn select_region(&self, region: Option<Region>) -> Result<LocationViewDto, AppError> {
        let effect = self.dispatch(Action::SelectRegion(region))?;
        self.perform(effect).await?;
        self.view()
    }

    /// Refetch localities for the selected region after a failure.
    pub async fn retry_localities(&self) -> Result<LocationViewDto, AppError> {
        let effect = self.dispatch(Action::RetryLocalities)?;
        self.perform(effect).await?;
        self.view()
    }

    pub fn select_locality(&self, locality: Option<Locality>) -> Result<LocationViewDto, AppError> {
        self.dispatch(Action::SelectLocality(locality))?;
        self.view()
    }

    /// Hand the confirmed selection to the navigator.
    pub fn proceed(&self, navigator: &dyn Navigator) -> Result<NavigationRequest, AppError> {
        let request = LocationMachine::proceed(&*self.lock()?)?;
        log::info!(
            "Navigating to {} with uf={} city={}",
            request.target,
            request.params.selected_uf,
            request.params.selected_city
        );
        navigator.navigate(&request)?;
        Ok(request)
    }

    async fn perform(&self, effect: Effect) -> Result<(), AppError> {
        match effect {
            Effect::None => Ok(()),
            Effect::FetchRegions { token } => self.fetch_regions(token).await,
            Effect::FetchLocalities { region, token } => {
                self.fetch_localities(region, token).await
            }
        }
    }

    async fn fetch_regions(&self, token: u64) -> Result<(), AppError> {
        let source = Arc::clone(&self.source);
        let result = tokio::task::spawn_blocking(move || source.regions())
            .await
            .map_err(|e| AppError::Network(format!("region fetch task failed: {}", e)))?;
        let action = match result {
            Ok(regions) => {
                log::info!("Loaded {} regions", regions.len());
                Action::RegionsLoaded { token, regions }
            }
            Err(e) => {
                log::warn!("Region fetch failed: {}", e);
                Action::RegionsFailed {
                    token,
                    message: e.to_string(),
                }
            }
        };

        let mut state = self.lock()?;
        if state.regions_token() != Some(token) {
            log::debug!("Dropping stale region response (token {})", token);
            return Ok(());
        }
        let (next, _) = LocationMachine::reduce(&state, action)?;
        *state = next;
        Ok(())
    }

    async fn fetch_localities(&self, region: Region, token: u64) -> Result<(), AppError> {
        let source = Arc::clone(&self.source);
        let target = region.clone();
        let result = tokio::task::spawn_blocking(move || source.localities(&target))
            .await
            .map_err(|e| AppError::Network(format!("locality fetch task failed: {}", e)))?;
        let action = match result {
            Ok(localities) => Action::LocalitiesLoaded { token, localities },
            Err(e) => {
                log::warn!("Locality fetch for {} failed: {}", region, e);
                Action::LocalitiesFailed {
                    token,
                    message: e.to_string(),
                }
            }
        };

        let mut state = self.lock()?;
        if state.in_flight_token() != Some(token) {
            log::debug!("Dropping stale locality response for {} (token {})", region, token);
            return Ok(());
        }
        let (next, _) = LocationMachine::reduce(&state, action)?;
        *state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyGeo;

    impl GeoSource for EmptyGeo {
        fn regions(&self) -> Result<Vec<Region>, AppError> {
            Ok(Vec::new())
        }

        fn localities(&self, _region: &Region) -> Result<Vec<Locality>, AppError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn poisoned_state_reports_db_error() {
        let selector = LocationSelector::new(EmptyGeo);
        let _ = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = selector.state.lock().unwrap();
                panic!("poison selection state");
            })
            .join()
        });

        let err = selector.view().unwrap_err();
        assert_eq!(err.code(), "DB_ERROR");
        assert!(err.to_string().contains("poisoned"));
    }
}
