//! The summary table model.
//!
//! A [`SummaryTable`] mirrors the overview page's table: header and footer
//! rows, then one body [`Row`] per place. Rows carry a stable
//! [`RowHandle`] so reordering only repositions them; nothing is rebuilt
//! once the skeleton exists.

use census_types::{DatasetId, PlaceId, Summary};
use serde::Serialize;

use crate::color::ColorScale;
use crate::controls::SortControls;
use crate::sort::SortKey;

/// Stable identity of a body row (its position in the server-rendered
/// skeleton).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RowHandle(pub usize);

/// What a body cell shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// The place name.
    Name,
    /// The place's aggregate score.
    Total,
    /// One dataset's score for the place.
    Dataset,
}

/// Title and score shown when hovering a dataset cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Popover {
    /// Dataset title.
    pub title: String,
    /// Cell score.
    pub score: u32,
}

/// A body cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    /// Cell role.
    pub kind: CellKind,
    /// Dataset column, for [`CellKind::Dataset`] cells.
    pub dataset: Option<DatasetId>,
    /// Dataset title as rendered in the skeleton (`data-datasettitle`).
    pub dataset_title: Option<String>,
    /// Score attribute (`data-score`), absent when unsurveyed.
    pub score: Option<u32>,
    /// Text content.
    pub text: String,
    /// Computed background color.
    pub background: Option<String>,
    /// Hover enrichment resolved from the summary.
    pub popover: Option<Popover>,
}

impl Cell {
    fn new(kind: CellKind, text: String) -> Self {
        Self {
            kind,
            dataset: None,
            dataset_title: None,
            score: None,
            text,
            background: None,
            popover: None,
        }
    }

    /// Whether colorizing applies to this cell (a scored, non-name cell).
    pub fn is_place_score(&self) -> bool {
        self.kind != CellKind::Name && self.score.is_some()
    }
}

/// A body row: one place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    /// Stable identity.
    pub handle: RowHandle,
    /// Place key (`data-place`).
    pub place: PlaceId,
    /// Place display name (`data-placename`).
    pub place_name: String,
    /// Aggregate score (`data-score`).
    pub score: u32,
    /// Cells, name first.
    pub cells: Vec<Cell>,
}

/// What a header or footer cell holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HeaderContent {
    /// Plain text.
    Text {
        /// Label.
        text: String,
    },
    /// The sort radio group.
    Sorting {
        /// The control group.
        controls: SortControls,
    },
}

/// A header or footer cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCell {
    /// Content.
    pub content: HeaderContent,
}

impl HeaderCell {
    fn text(text: impl Into<String>) -> Self {
        Self {
            content: HeaderContent::Text { text: text.into() },
        }
    }
}

/// A header or footer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderRow {
    /// Cells, left to right.
    pub cells: Vec<HeaderCell>,
}

/// The overview table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryTable {
    /// `thead` rows.
    pub head: Vec<HeaderRow>,
    /// `tfoot` rows.
    pub foot: Vec<HeaderRow>,
    /// `tbody` rows in display order.
    pub body: Vec<Row>,
    /// Current sort, once one has been applied.
    pub sorted_by: Option<SortKey>,
}

impl SummaryTable {
    /// Build the server-rendered skeleton: places in summary order,
    /// a name column, a total column and one column per dataset.
    ///
    /// Only the `data-*` attributes are filled in; colors and popovers are
    /// added by [`colorize`](Self::colorize) and [`enrich`](Self::enrich).
    pub fn skeleton(summary: &Summary) -> Self {
        let mut labels = vec![HeaderCell::text(""), HeaderCell::text("Score")];
        labels.extend(summary.datasets.iter().map(|d| HeaderCell::text(d.title.clone())));
        let header = HeaderRow { cells: labels };

        let body = summary
            .places
            .iter()
            .enumerate()
            .map(|(index, place)| {
                let by_place = summary.byplace.get(place.id.as_str());
                let score = by_place.map_or(0, |p| p.score);

                let mut cells = vec![Cell::new(CellKind::Name, place.name.clone())];
                let mut total = Cell::new(CellKind::Total, score.to_string());
                total.score = Some(score);
                cells.push(total);

                for dataset in &summary.datasets {
                    let record = by_place.and_then(|p| p.datasets.get(dataset.id.as_str()));
                    let mut cell = Cell::new(
                        CellKind::Dataset,
                        record.map(|r| r.score.to_string()).unwrap_or_default(),
                    );
                    cell.dataset = Some(dataset.id.clone());
                    cell.dataset_title = Some(dataset.title.clone());
                    cell.score = record.map(|r| r.score);
                    cells.push(cell);
                }

                Row {
                    handle: RowHandle(index),
                    place: place.id.clone(),
                    place_name: place.name.clone(),
                    score,
                    cells,
                }
            })
            .collect();

        Self {
            head: vec![header.clone()],
            foot: vec![header],
            body,
            sorted_by: None,
        }
    }

    /// Set the background of every scored cell from its `data-score`.
    pub fn colorize(&mut self, scale: &ColorScale) {
        for cell in self.body.iter_mut().flat_map(|row| row.cells.iter_mut()) {
            if !cell.is_place_score() {
                continue;
            }
            cell.background = cell.score.map(|score| scale.hex(score));
        }
    }

    /// Attach popovers to dataset cells whose place/dataset keys resolve
    /// in the summary. Cells that do not resolve are left untouched.
    ///
    /// Returns the number of cells enriched.
    pub fn enrich(&mut self, summary: &Summary) -> usize {
        let mut enriched = 0_usize;
        for row in &mut self.body {
            for cell in &mut row.cells {
                let Some(dataset) = cell.dataset.as_ref() else {
                    continue;
                };
                let Some(record) = summary.record(row.place.as_str(), dataset.as_str()) else {
                    tracing::trace!(place = %row.place, dataset = %dataset, "no summary record");
                    continue;
                };
                cell.popover = Some(Popover {
                    title: cell.dataset_title.clone().unwrap_or_else(|| record.title.clone()),
                    score: record.score,
                });
                enriched = enriched.saturating_add(1);
            }
        }
        enriched
    }

    /// Put one sort control group in the first cell of every header and
    /// footer row, numbered across head then foot. Re-attaching replaces
    /// the existing groups rather than adding more.
    pub fn attach_sort_controls(&mut self) {
        let selected = self.sorted_by.unwrap_or_default();
        for (index, row) in self.head.iter_mut().chain(self.foot.iter_mut()).enumerate() {
            if let Some(first) = row.cells.first_mut() {
                first.content = HeaderContent::Sorting {
                    controls: SortControls::new(index, selected),
                };
            }
        }
    }

    /// Every control group currently attached.
    #[cfg(test)]
    pub(crate) fn sort_controls(&self) -> impl Iterator<Item = &SortControls> {
        self.head
            .iter()
            .chain(self.foot.iter())
            .filter_map(|row| row.cells.first())
            .filter_map(|cell| match &cell.content {
                HeaderContent::Sorting { controls } => Some(controls),
                HeaderContent::Text { .. } => None,
            })
    }

    /// Body rows' handles in display order.
    pub fn handles(&self) -> Vec<RowHandle> {
        self.body.iter().map(|row| row.handle).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use census_types::{Dataset, DatasetRecord, Place, PlaceSummary};

    use super::*;

    pub(crate) fn summary() -> Summary {
        let places = vec![
            Place { id: PlaceId::new("gb"), name: String::from("United Kingdom") },
            Place { id: PlaceId::new("fr"), name: String::from("France") },
        ];
        let datasets = vec![Dataset {
            id: DatasetId::new("budget"),
            title: String::from("Budget"),
            description: String::new(),
        }];
        let mut gb = PlaceSummary { score: 80, datasets: BTreeMap::new() };
        gb.datasets.insert(
            DatasetId::new("budget"),
            DatasetRecord { score: 80, title: String::from("Budget") },
        );
        let mut byplace = BTreeMap::new();
        byplace.insert(PlaceId::new("gb"), gb);
        Summary { places, datasets, byplace }
    }

    #[test]
    fn skeleton_has_one_row_per_place() {
        let table = SummaryTable::skeleton(&summary());
        assert_eq!(table.body.len(), 2);
        assert_eq!(table.head.len(), 1);
        assert_eq!(table.foot.len(), 1);
        assert_eq!(table.body.first().map(|r| r.score), Some(80));
        // France has no byplace entry at all.
        assert_eq!(table.body.get(1).map(|r| r.score), Some(0));
    }

    #[test]
    fn colorize_skips_unsurveyed_and_name_cells() {
        let mut table = SummaryTable::skeleton(&summary());
        table.colorize(&ColorScale::total());

        let france = table.body.get(1).unwrap().cells.clone();
        assert!(france.first().is_some_and(|c| c.background.is_none()));
        assert!(france.get(1).is_some_and(|c| c.background.is_some()));
        assert!(france.get(2).is_some_and(|c| c.background.is_none()));
    }

    #[test]
    fn enrichment_degrades_silently_on_missing_keys() {
        let mut table = SummaryTable::skeleton(&summary());
        let enriched = table.enrich(&summary());
        assert_eq!(enriched, 1);

        let gb_budget = table.body.first().and_then(|r| r.cells.get(2));
        assert_eq!(
            gb_budget.and_then(|c| c.popover.clone()),
            Some(Popover { title: String::from("Budget"), score: 80 })
        );
        let fr_budget = table.body.get(1).and_then(|r| r.cells.get(2));
        assert!(fr_budget.is_some_and(|c| c.popover.is_none()));
    }

    #[test]
    fn controls_attach_once_per_row() {
        let mut table = SummaryTable::skeleton(&summary());
        table.attach_sort_controls();
        table.attach_sort_controls();

        let groups: Vec<_> = table.sort_controls().map(|c| c.name.clone()).collect();
        assert_eq!(groups, vec!["sorttable-0", "sorttable-1"]);
        assert!(table.sort_controls().all(|c| c.selected == SortKey::Score));
    }
}
