//! Row ordering for the summary table.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::table::{HeaderContent, Row, RowHandle, SummaryTable};

/// Which key the table is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Case- and accent-insensitive place name, ascending.
    Alpha,
    /// Score descending, then place name as for `Alpha`.
    #[default]
    Score,
}

/// Uppercased name with accents stripped, so `Åland` files under `A`.
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_uppercase)
        .collect()
}

fn by_place_name(a: &Row, b: &Row) -> Ordering {
    collation_key(&a.place_name)
        .cmp(&collation_key(&b.place_name))
        .then_with(|| a.place_name.to_uppercase().cmp(&b.place_name.to_uppercase()))
}

/// Compare two rows under `key`.
pub fn compare(key: SortKey, a: &Row, b: &Row) -> Ordering {
    match key {
        SortKey::Alpha => by_place_name(a, b),
        SortKey::Score => b.score.cmp(&a.score).then_with(|| by_place_name(a, b)),
    }
}

/// The order `rows` would take under `key`, as handles. `rows` is not
/// touched. The sort is stable, so rows equal under `key` keep their
/// relative order.
pub fn sort_order(rows: &[Row], key: SortKey) -> Vec<RowHandle> {
    let mut refs: Vec<&Row> = rows.iter().collect();
    refs.sort_by(|a, b| compare(key, a, b));
    refs.into_iter().map(|row| row.handle).collect()
}

impl SummaryTable {
    /// Reorder body rows in place and select `key` in every control group.
    ///
    /// Rows are moved, never rebuilt: each row keeps its cells, colors and
    /// popovers.
    pub fn sort(&mut self, key: SortKey) {
        self.body.sort_by(|a, b| compare(key, a, b));
        self.sorted_by = Some(key);
        for row in self.head.iter_mut().chain(self.foot.iter_mut()) {
            if let Some(HeaderContent::Sorting { controls }) =
                row.cells.first_mut().map(|cell| &mut cell.content)
            {
                controls.select(key);
            }
        }
    }

    /// Precomputed orders for both keys, for the page script to apply on
    /// control change without another round trip.
    pub fn orders(&self) -> SortOrders {
        SortOrders {
            alpha: sort_order(&self.body, SortKey::Alpha),
            score: sort_order(&self.body, SortKey::Score),
        }
    }
}

/// Row handle order for each sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortOrders {
    /// Alphabetical order.
    pub alpha: Vec<RowHandle>,
    /// Score order.
    pub score: Vec<RowHandle>,
}

#[cfg(test)]
mod tests {
    use census_types::PlaceId;

    use super::*;

    fn rows(cells: &[(u32, &str)]) -> Vec<Row> {
        cells
            .iter()
            .enumerate()
            .map(|(index, (score, name))| Row {
                handle: RowHandle(index),
                place: PlaceId::new(name.to_lowercase()),
                place_name: (*name).to_owned(),
                score: *score,
                cells: Vec::new(),
            })
            .collect()
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.place_name.as_str()).collect()
    }

    fn table(cells: &[(u32, &str)]) -> SummaryTable {
        SummaryTable {
            head: Vec::new(),
            foot: Vec::new(),
            body: rows(cells),
            sorted_by: None,
        }
    }

    const FIXTURE: [(u32, &str); 4] = [(10, "Zeta"), (30, "Beta"), (30, "Alpha"), (20, "Mu")];

    #[test]
    fn score_sort_breaks_ties_by_name() {
        let mut table = table(&FIXTURE);
        table.sort(SortKey::Score);
        assert_eq!(names(&table.body), vec!["Alpha", "Beta", "Mu", "Zeta"]);
        let scores: Vec<u32> = table.body.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![30, 30, 20, 10]);
    }

    #[test]
    fn alphabetical_sort_ignores_score() {
        let mut table = table(&FIXTURE);
        table.sort(SortKey::Alpha);
        assert_eq!(names(&table.body), vec!["Alpha", "Beta", "Mu", "Zeta"]);
    }

    #[test]
    fn name_comparison_is_case_insensitive() {
        let mut table = table(&[(0, "beta"), (0, "Alpha"), (0, "ALPHA2")]);
        table.sort(SortKey::Alpha);
        assert_eq!(names(&table.body), vec!["Alpha", "ALPHA2", "beta"]);
    }

    #[test]
    fn sorting_twice_is_idempotent() {
        let mut once = table(&FIXTURE);
        once.sort(SortKey::Score);
        let mut twice = once.clone();
        twice.sort(SortKey::Score);
        assert_eq!(once.handles(), twice.handles());
    }

    #[test]
    fn sort_moves_rows_without_rebuilding_them() {
        let mut table = table(&FIXTURE);
        let before = table.body.clone();
        table.sort(SortKey::Score);
        for row in &before {
            let moved = table.body.iter().find(|r| r.handle == row.handle);
            assert_eq!(moved, Some(row));
        }
    }

    #[test]
    fn sort_order_leaves_input_alone() {
        let rows = rows(&FIXTURE);
        let order = sort_order(&rows, SortKey::Score);
        assert_eq!(order, vec![RowHandle(2), RowHandle(1), RowHandle(3), RowHandle(0)]);
        assert_eq!(names(&rows), vec!["Zeta", "Beta", "Alpha", "Mu"]);
    }

    #[test]
    fn accented_names_sort_with_their_base_letter() {
        let mut table = table(&[
            (10, "Zambia"),
            (10, "Österreich"),
            (10, "Åland"),
            (10, "oman"),
        ]);
        table.sort(SortKey::Alpha);
        assert_eq!(names(&table.body), vec!["Åland", "oman", "Österreich", "Zambia"]);
    }
}
