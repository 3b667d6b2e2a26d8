//! The `/overview.json` contract.
//!
//! The summary table renderer resolves every scored cell through
//! [`Summary::record`], so the shape of `byplace` is a hard contract:
//! `byplace[place].datasets[dataset]` must expose `score` and `title`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{DatasetId, PlaceId};
use crate::structs::{Dataset, Entry, Place};

/// Score and title of one place/dataset cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DatasetRecord {
    /// Openness score in `0..=100`.
    pub score: u32,
    /// Dataset display title.
    pub title: String,
}

/// All scored datasets for one place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlaceSummary {
    /// Aggregate score over every configured dataset.
    pub score: u32,
    /// Scored cells keyed by dataset.
    pub datasets: BTreeMap<DatasetId, DatasetRecord>,
}

/// The whole census matrix as served to the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Summary {
    /// Places in display order.
    pub places: Vec<Place>,
    /// Datasets in display order.
    pub datasets: Vec<Dataset>,
    /// Per-place scores.
    pub byplace: BTreeMap<PlaceId, PlaceSummary>,
}

impl Summary {
    /// Build the summary from the current entries.
    ///
    /// Every place gets a `byplace` slot even with no entries. A place's
    /// score is the mean over all datasets, counting missing entries as
    /// zero and rounding down. Entries naming an unknown place or dataset
    /// are ignored.
    pub fn build<'a>(
        places: &[Place],
        datasets: &[Dataset],
        entries: impl IntoIterator<Item = &'a Entry>,
    ) -> Self {
        let titles: BTreeMap<&DatasetId, &str> = datasets
            .iter()
            .map(|d| (&d.id, d.title.as_str()))
            .collect();

        let mut byplace: BTreeMap<PlaceId, PlaceSummary> = places
            .iter()
            .map(|p| (p.id.clone(), PlaceSummary::default()))
            .collect();

        for entry in entries {
            let Some(title) = titles.get(&entry.dataset) else {
                continue;
            };
            let Some(summary) = byplace.get_mut(&entry.place) else {
                continue;
            };
            summary.datasets.insert(
                entry.dataset.clone(),
                DatasetRecord {
                    score: entry.score(),
                    title: (*title).to_owned(),
                },
            );
        }

        let dataset_count = u32::try_from(datasets.len()).unwrap_or(u32::MAX);
        for summary in byplace.values_mut() {
            let total: u32 = summary.datasets.values().map(|r| r.score).sum();
            summary.score = total.checked_div(dataset_count).unwrap_or(0);
        }

        Self {
            places: places.to_vec(),
            datasets: datasets.to_vec(),
            byplace,
        }
    }

    /// Look up one cell. `None` when either key is unknown.
    pub fn record(&self, place: &str, dataset: &str) -> Option<&DatasetRecord> {
        self.byplace.get(place)?.datasets.get(dataset)
    }

    /// Aggregate score of a place, if it is known.
    pub fn place_score(&self, place: &str) -> Option<u32> {
        self.byplace.get(place).map(|p| p.score)
    }
}
