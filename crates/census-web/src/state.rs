//! Shared application state.
//!
//! [`AppState`] is built once at boot and injected into handlers and
//! middleware via Axum's `State` extractor, wrapped in [`Arc`]. Settings,
//! the startup profile, the pipeline and the views are immutable; the
//! census store and the session store sit behind `tokio` read-write locks.

use std::sync::Arc;
use std::time::Duration;

use census_render::ColorScale;
use tokio::sync::RwLock;

use crate::config::Settings;
use crate::mode::StartupProfile;
use crate::pipeline::Pipeline;
use crate::session::SessionStore;
use crate::store::{CensusData, CensusStore, StoreError};
use crate::views::Views;

/// Shared state for the Axum application.
#[derive(Debug)]
pub struct AppState {
    /// Immutable settings.
    pub settings: Arc<Settings>,
    /// What was wired in at boot.
    pub profile: StartupProfile,
    /// Request-context pipeline.
    pub pipeline: Pipeline,
    /// Census data and submissions.
    pub store: RwLock<CensusStore>,
    /// Cookie sessions (unused in readonly mode).
    pub sessions: SessionStore,
    /// Page templates.
    pub views: Views,
    /// Score gradient for the overview.
    pub scale: ColorScale,
}

impl AppState {
    /// Assemble the state from settings and already-loaded census data.
    pub fn new(settings: Settings, data: CensusData) -> Result<Self, minijinja::Error> {
        let settings = Arc::new(settings);
        let profile = StartupProfile::from_settings(&settings);
        let pipeline = Pipeline::new(&profile, Arc::clone(&settings));
        Ok(Self {
            settings: Arc::clone(&settings),
            profile,
            pipeline,
            store: RwLock::new(CensusStore::new(data)),
            sessions: SessionStore::new(Duration::from_secs(
                settings.appconfig.session_ttl_secs,
            )),
            views: Views::new()?,
            scale: ColorScale::total(),
        })
    }

    /// Re-read the seed file into the store, keeping submissions and the
    /// answers accepted from them.
    pub async fn reload(&self) -> Result<(), StoreError> {
        let path = self
            .settings
            .appconfig
            .data_path
            .as_deref()
            .ok_or(StoreError::NoDataPath)?;
        let data = CensusData::from_file(path)?;
        let places = data.places.len();
        let datasets = data.datasets.len();
        self.store.write().await.replace_data(data);
        tracing::info!(places, datasets, "census data reloaded");
        Ok(())
    }
}
