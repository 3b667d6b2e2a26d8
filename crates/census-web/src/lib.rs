//! Open Data Census web application.
//!
//! This crate provides the Axum HTTP server for the census:
//!
//! - **Request-context pipeline** ([`pipeline`]): CORS, readonly cache
//!   control, test user, locale override, readonly session and template
//!   globals, run as an ordered list of stages fixed at boot
//! - **Startup profile** ([`mode`]): readonly/census mode and the optional
//!   basic-auth gate decide the route table and middleware once
//! - **Core pages** ([`handlers`]): overview table, place, dataset and
//!   entry pages, the `/overview.json` summary and the entry export
//! - **Census pages** ([`census`]): submission and review workflow,
//!   anonymous login, locale switching and data reload
//!
//! # Architecture
//!
//! Census data lives in an in-memory [`store`] seeded from a JSON file.
//! Pages are rendered with `minijinja` ([`views`]); the overview table's
//! colors, popovers, sort controls and row orders come from
//! `census-render`. Sessions ([`session`]) exist only in census mode.

pub mod auth;
pub mod census;
pub mod config;
pub mod context;
pub mod cookies;
pub mod error;
pub mod handlers;
pub mod locale;
pub mod mode;
pub mod pipeline;
pub mod router;
pub mod server;
pub mod session;
pub mod state;
pub mod store;
pub mod views;

// Re-export primary types for convenience.
pub use config::{ConfigError, Settings};
pub use error::WebError;
pub use mode::{Gate, Mode, StartupProfile};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
pub use store::{CensusData, CensusStore, StoreError};
