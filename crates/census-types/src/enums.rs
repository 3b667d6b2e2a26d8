//! Enumeration types for census answers, questions and review state.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// An answer to a single census question.
///
/// The submission form only accepts these three values; anything else is
/// a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Choice {
    /// The criterion is met.
    Yes,
    /// The criterion is not met.
    No,
    /// The submitter could not tell.
    Unsure,
}

impl Choice {
    /// All accepted answers, in form order.
    pub const ALL: [Self; 3] = [Self::Yes, Self::No, Self::Unsure];

    /// The form value for this answer.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Unsure => "Unsure",
        }
    }
}

impl core::str::FromStr for Choice {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(Self::Yes),
            "No" => Ok(Self::No),
            "Unsure" => Ok(Self::Unsure),
            other => Err(UnknownChoice(other.to_owned())),
        }
    }
}

impl core::fmt::Display for Choice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a form value is not one of `Yes`, `No` or `Unsure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChoice(pub String);

impl core::fmt::Display for UnknownChoice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown choice `{}` (expected Yes, No or Unsure)", self.0)
    }
}

impl std::error::Error for UnknownChoice {}

/// One openness criterion asked for every place/dataset pair.
///
/// Weights follow the Open Data Index methodology and sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Question {
    /// Does the data exist at all?
    Exists,
    /// Is it in digital form?
    Digital,
    /// Is it publicly available?
    Public,
    /// Is it free of charge?
    Free,
    /// Is it available online?
    Online,
    /// Is it machine readable?
    MachineReadable,
    /// Is it available in bulk?
    Bulk,
    /// Is it openly licensed?
    OpenLicense,
    /// Is it up to date?
    UpToDate,
}

impl Question {
    /// Every question, in the order shown on the submission form.
    pub const ALL: [Self; 9] = [
        Self::Exists,
        Self::Digital,
        Self::Public,
        Self::Free,
        Self::Online,
        Self::MachineReadable,
        Self::Bulk,
        Self::OpenLicense,
        Self::UpToDate,
    ];

    /// Points awarded when the answer is [`Choice::Yes`].
    pub const fn weight(self) -> u32 {
        match self {
            Self::Exists | Self::Digital | Self::Public | Self::Online => 5,
            Self::Free | Self::MachineReadable => 15,
            Self::Bulk | Self::UpToDate => 10,
            Self::OpenLicense => 30,
        }
    }

    /// Form field name, matching the serialized key.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::Digital => "digital",
            Self::Public => "public",
            Self::Free => "free",
            Self::Online => "online",
            Self::MachineReadable => "machinereadable",
            Self::Bulk => "bulk",
            Self::OpenLicense => "openlicense",
            Self::UpToDate => "uptodate",
        }
    }

    /// Human-readable prompt.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Exists => "Does the data exist?",
            Self::Digital => "Is the data in digital form?",
            Self::Public => "Is the data publicly available?",
            Self::Free => "Is the data available for free?",
            Self::Online => "Is the data available online?",
            Self::MachineReadable => "Is the data machine-readable?",
            Self::Bulk => "Available in bulk?",
            Self::OpenLicense => "Openly licensed?",
            Self::UpToDate => "Is the data provided on a timely and up to date basis?",
        }
    }
}

/// Review state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum SubmissionStatus {
    /// Waiting for a reviewer.
    Pending,
    /// Accepted; its answers became the current entry.
    Accepted,
    /// Rejected by a reviewer.
    Rejected,
}

/// How a user authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum AuthProvider {
    /// Self-declared name via the anonymous login form.
    Anonymous,
    /// Google OAuth.
    Google,
    /// Synthetic user injected in test deployments.
    Test,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn question_weights_sum_to_one_hundred() {
        let total: u32 = Question::ALL.iter().map(|q| q.weight()).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn choice_parsing_is_exact() {
        assert_eq!("Yes".parse::<Choice>(), Ok(Choice::Yes));
        assert_eq!("Unsure".parse::<Choice>(), Ok(Choice::Unsure));
        assert!("yes".parse::<Choice>().is_err());
        assert!("Maybe".parse::<Choice>().is_err());
    }

    #[test]
    fn question_keys_match_serde() {
        for question in Question::ALL {
            let json = serde_json::to_string(&question).unwrap();
            assert_eq!(json, format!("\"{}\"", question.key()));
        }
    }
}
