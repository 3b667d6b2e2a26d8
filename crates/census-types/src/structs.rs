//! Core census entities: places, datasets, entries, submissions and users.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AuthProvider, Choice, Question, SubmissionStatus};
use crate::ids::{DatasetId, PlaceId, SubmissionId};

/// Answers keyed by question. Missing questions count as unanswered.
pub type Answers = BTreeMap<Question, Choice>;

/// A surveyed place (the rows of the census matrix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Place {
    /// URL slug.
    pub id: PlaceId,
    /// Display name.
    pub name: String,
}

/// A dataset category (the columns of the census matrix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Dataset {
    /// URL slug.
    pub id: DatasetId,
    /// Display title.
    pub title: String,
    /// Short description shown on the dataset page.
    #[serde(default)]
    pub description: String,
}

/// The accepted answer set for one place/dataset pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Entry {
    /// Place surveyed.
    pub place: PlaceId,
    /// Dataset surveyed.
    pub dataset: DatasetId,
    /// Per-question answers.
    #[serde(default)]
    pub answers: Answers,
    /// Free-text details (URLs, caveats).
    #[serde(default)]
    pub details: String,
    /// Name of the reviewer who accepted it, if any.
    #[serde(default)]
    pub reviewer: Option<String>,
    /// When the entry was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Openness score in `0..=100`.
    pub fn score(&self) -> u32 {
        score_answers(&self.answers)
    }
}

/// Sum of the weights of every question answered [`Choice::Yes`].
pub fn score_answers(answers: &Answers) -> u32 {
    answers
        .iter()
        .filter(|(_, choice)| **choice == Choice::Yes)
        .map(|(question, _)| question.weight())
        .sum()
}

/// An authenticated (or synthetic) user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct User {
    /// Provider-scoped identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact address, when the provider shares one.
    #[serde(default)]
    pub email: Option<String>,
    /// How the user logged in.
    pub provider: AuthProvider,
}

/// A proposed answer set awaiting review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Submission {
    /// Identifier used in `/submission/{id}`.
    pub id: SubmissionId,
    /// Place surveyed.
    pub place: PlaceId,
    /// Dataset surveyed.
    pub dataset: DatasetId,
    /// Proposed answers.
    pub answers: Answers,
    /// Free-text details supplied by the submitter.
    pub details: String,
    /// Who submitted it, when logged in.
    pub submitter: Option<User>,
    /// Review state.
    pub status: SubmissionStatus,
    /// Who reviewed it.
    pub reviewer: Option<User>,
    /// Reviewer comment.
    #[serde(default)]
    pub review_comment: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Review time.
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Score the entry would have if this submission were accepted.
    pub fn score(&self) -> u32 {
        score_answers(&self.answers)
    }

    /// Convert an accepted submission into the entry it produces.
    pub fn to_entry(&self, reviewer: Option<String>, now: DateTime<Utc>) -> Entry {
        Entry {
            place: self.place.clone(),
            dataset: self.dataset.clone(),
            answers: self.answers.clone(),
            details: self.details.clone(),
            reviewer,
            updated_at: now,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn only_yes_answers_score() {
        let mut answers = Answers::new();
        answers.insert(Question::Exists, Choice::Yes);
        answers.insert(Question::OpenLicense, Choice::Yes);
        answers.insert(Question::Free, Choice::No);
        answers.insert(Question::Bulk, Choice::Unsure);
        assert_eq!(score_answers(&answers), 35);
    }

    #[test]
    fn all_yes_scores_one_hundred() {
        let answers: Answers = Question::ALL.iter().map(|q| (*q, Choice::Yes)).collect();
        assert_eq!(score_answers(&answers), 100);
    }

    #[test]
    fn answers_round_trip_through_json_keys() {
        let mut answers = Answers::new();
        answers.insert(Question::MachineReadable, Choice::Yes);
        let json = serde_json::to_value(&answers).unwrap();
        assert_eq!(json["machinereadable"], "Yes");
    }
}
