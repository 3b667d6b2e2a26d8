//! Open Data Census server entry point.
//!
//! Loads settings from `census-config.yaml` (or the file named by
//! `CENSUS_CONFIG`) plus `CENSUS__*` environment overrides, seeds the
//! store from `appconfig.data_path` and serves until `Ctrl-C`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use census_web::{AppState, CensusData, ServerConfig, Settings, start_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG: &str = "census-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::var_os("CENSUS_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let settings = Settings::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!(
        config = %config_path.display(),
        readonly = settings.appconfig.readonly,
        auth_on = settings.appconfig.auth_on,
        locales = ?settings.locales,
        "configuration loaded"
    );

    let data = match settings.appconfig.data_path.as_deref() {
        Some(path) => CensusData::from_file(path).context("loading census data")?,
        None => {
            warn!("no appconfig.data_path set, starting with an empty census");
            CensusData::default()
        }
    };
    info!(
        places = data.places.len(),
        datasets = data.datasets.len(),
        entries = data.entries.len(),
        "census data loaded"
    );

    if !settings.appconfig.readonly {
        warn!("loading in census mode, data will be editable");
    }

    let server = ServerConfig::from(&settings.appconfig);
    let state = Arc::new(AppState::new(settings, data).context("compiling page templates")?);
    start_server(&server, state).await?;
    Ok(())
}
