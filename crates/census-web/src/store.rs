//! In-memory census store.
//!
//! Holds the place/dataset matrix, the accepted entries and the
//! submission queue. The matrix and entries are seeded from a JSON file
//! and can be reloaded at runtime (`/admin/reload`); submissions live only
//! in memory and survive reloads, with accepted ones replayed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use census_types::{
    Answers, Dataset, DatasetId, Entry, Place, PlaceId, Submission, SubmissionId,
    SubmissionStatus, Summary, User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Errors raised by the census store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The seed file could not be read.
    #[error("failed to read census data from {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The seed file is not valid census JSON.
    #[error("failed to parse census data from {}: {source}", path.display())]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// A reload was requested but no seed file is configured.
    #[error("no census data path configured")]
    NoDataPath,

    /// No such place.
    #[error("unknown place: {0}")]
    UnknownPlace(String),

    /// No such dataset.
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    /// No such submission.
    #[error("unknown submission: {0}")]
    UnknownSubmission(SubmissionId),

    /// The submission has already been accepted or rejected.
    #[error("submission {0} has already been reviewed")]
    AlreadyReviewed(SubmissionId),
}

/// Seed file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusData {
    /// Places, in display order.
    pub places: Vec<Place>,
    /// Datasets, in display order.
    pub datasets: Vec<Dataset>,
    /// Accepted entries.
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl CensusData {
    /// Read and parse a seed file.
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A submission as entered on the form, before it gets an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    /// Place surveyed.
    pub place: PlaceId,
    /// Dataset surveyed.
    pub dataset: DatasetId,
    /// Proposed answers.
    pub answers: Answers,
    /// Free-text details.
    pub details: String,
    /// Who submitted it.
    pub submitter: Option<User>,
}

/// A reviewer's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Publish the answers as the current entry.
    Accept,
    /// Discard the submission.
    Reject,
}

/// The census matrix, its entries and the submission queue.
#[derive(Debug, Clone, Default)]
pub struct CensusStore {
    places: Vec<Place>,
    datasets: Vec<Dataset>,
    entries: BTreeMap<(PlaceId, DatasetId), Entry>,
    submissions: BTreeMap<SubmissionId, Submission>,
}

impl CensusStore {
    /// Build a store from seed data.
    pub fn new(data: CensusData) -> Self {
        let mut store = Self::default();
        store.replace_data(data);
        store
    }

    /// Swap in freshly loaded seed data, keeping the submission queue.
    ///
    /// Accepted submissions are replayed over the seed entries in review
    /// order, so a reload never loses published answers. Submissions for a
    /// place or dataset the new seed no longer has are skipped.
    pub fn replace_data(&mut self, data: CensusData) {
        self.entries = data
            .entries
            .into_iter()
            .map(|entry| ((entry.place.clone(), entry.dataset.clone()), entry))
            .collect();
        self.places = data.places;
        self.datasets = data.datasets;

        let mut accepted: Vec<&Submission> = self
            .submissions
            .values()
            .filter(|s| s.status == SubmissionStatus::Accepted)
            .collect();
        accepted.sort_by_key(|s| s.reviewed_at);

        let mut replayed = 0_usize;
        for submission in accepted {
            let known = self.places.iter().any(|p| p.id == submission.place)
                && self.datasets.iter().any(|d| d.id == submission.dataset);
            if !known {
                tracing::warn!(
                    submission = %submission.id,
                    place = %submission.place,
                    dataset = %submission.dataset,
                    "accepted submission no longer matches the census data"
                );
                continue;
            }
            let reviewed_at = submission.reviewed_at.unwrap_or(submission.created_at);
            let reviewer = submission.reviewer.as_ref().map(|r| r.name.clone());
            let entry = submission.to_entry(reviewer, reviewed_at);
            self.entries
                .insert((entry.place.clone(), entry.dataset.clone()), entry);
            replayed = replayed.saturating_add(1);
        }
        if replayed > 0 {
            tracing::debug!(replayed, "accepted submissions replayed over seed entries");
        }
    }

    /// All places, in display order.
    pub fn places(&self) -> &[Place] {
        &self.places
    }

    /// All datasets, in display order.
    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    /// Look up a place by slug.
    pub fn place(&self, id: &str) -> Option<&Place> {
        self.places.iter().find(|p| p.id.as_str() == id)
    }

    /// Look up a dataset by slug.
    pub fn dataset(&self, id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id.as_str() == id)
    }

    /// The accepted entry for a place/dataset pair.
    pub fn entry(&self, place: &str, dataset: &str) -> Option<&Entry> {
        self.entries
            .get(&(PlaceId::new(place), DatasetId::new(dataset)))
    }

    /// Every accepted entry, ordered by place then dataset.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// The `/overview.json` summary of the current entries.
    pub fn summary(&self) -> Summary {
        Summary::build(&self.places, &self.datasets, self.entries.values())
    }

    /// Queue a submission for review.
    pub fn submit(
        &mut self,
        new: NewSubmission,
        now: DateTime<Utc>,
    ) -> Result<SubmissionId, StoreError> {
        if self.place(new.place.as_str()).is_none() {
            return Err(StoreError::UnknownPlace(new.place.0));
        }
        if self.dataset(new.dataset.as_str()).is_none() {
            return Err(StoreError::UnknownDataset(new.dataset.0));
        }

        let id = SubmissionId::new();
        self.submissions.insert(
            id,
            Submission {
                id,
                place: new.place,
                dataset: new.dataset,
                answers: new.answers,
                details: new.details,
                submitter: new.submitter,
                status: SubmissionStatus::Pending,
                reviewer: None,
                review_comment: String::new(),
                created_at: now,
                reviewed_at: None,
            },
        );
        Ok(id)
    }

    /// Look up a submission.
    pub fn submission(&self, id: SubmissionId) -> Option<&Submission> {
        self.submissions.get(&id)
    }

    /// Accept or reject a pending submission. Accepting replaces the
    /// entry for its place/dataset pair.
    pub fn review(
        &mut self,
        id: SubmissionId,
        decision: Decision,
        reviewer: User,
        comment: String,
        now: DateTime<Utc>,
    ) -> Result<&Submission, StoreError> {
        let submission = self
            .submissions
            .get_mut(&id)
            .ok_or(StoreError::UnknownSubmission(id))?;
        if submission.status != SubmissionStatus::Pending {
            return Err(StoreError::AlreadyReviewed(id));
        }

        submission.status = match decision {
            Decision::Accept => SubmissionStatus::Accepted,
            Decision::Reject => SubmissionStatus::Rejected,
        };
        submission.review_comment = comment;
        submission.reviewed_at = Some(now);

        if decision == Decision::Accept {
            let entry = submission.to_entry(Some(reviewer.name.clone()), now);
            self.entries
                .insert((entry.place.clone(), entry.dataset.clone()), entry);
        }
        submission.reviewer = Some(reviewer);

        Ok(submission)
    }

    /// Most recent submissions first, up to `limit`.
    pub fn changes(&self, limit: usize) -> Vec<&Submission> {
        self.submissions.values().rev().take(limit).collect()
    }
}
