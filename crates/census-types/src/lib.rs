//! Shared type definitions for the Open Data Census.
//!
//! This crate is the single source of truth for the census domain: the
//! place/dataset matrix, answers and their scoring, submissions under
//! review, users, and the summary contract served at `/overview.json`.
//! Types flow to `TypeScript` via `ts-rs` for browser code consuming the
//! summary.
//!
//! # Modules
//!
//! - [`ids`] -- Submission UUIDs and place/dataset slugs
//! - [`enums`] -- Answers, questions, review status, auth providers
//! - [`structs`] -- Places, datasets, entries, submissions, users
//! - [`summary`] -- The per-place score summary

pub mod enums;
pub mod ids;
pub mod structs;
pub mod summary;

// Re-export all public types at crate root for convenience.
pub use enums::{AuthProvider, Choice, Question, SubmissionStatus, UnknownChoice};
pub use ids::{DatasetId, PlaceId, SubmissionId};
pub use structs::{Answers, Dataset, Entry, Place, Submission, User, score_answers};
pub use summary::{DatasetRecord, PlaceSummary, Summary};
