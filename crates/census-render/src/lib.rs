//! Summary table model for the Open Data Census overview page.
//!
//! Rendering happens in two phases. First a validated [`Summary`] is
//! obtained (from the store, or fetched as `/overview.json`). Then pure,
//! synchronous functions compute the table's visual state over that
//! value: score colors, popover enrichment, sort controls and row order.
//! Writing the result to the page, and pinning column widths once the
//! browser has laid it out, is a thin final step outside this crate.
//!
//! # Modules
//!
//! - [`color`] -- Score-to-hex gradient
//! - [`table`] -- Table skeleton, colorizing and enrichment
//! - [`sort`] -- Score and alphabetical ordering
//! - [`controls`] -- The sort radio group

pub mod color;
pub mod controls;
pub mod sort;
pub mod table;

use census_types::Summary;

pub use color::{ColorScale, Rgb};
pub use controls::{SortControls, SortOption};
pub use sort::{SortKey, SortOrders, compare, sort_order};
pub use table::{
    Cell, CellKind, HeaderCell, HeaderContent, HeaderRow, Popover, Row, RowHandle, SummaryTable,
};

/// Run the whole render pass the overview page starts with: skeleton,
/// colors, popovers, sort controls, then the default score order.
pub fn prepare(summary: &Summary, scale: &ColorScale) -> SummaryTable {
    let mut table = SummaryTable::skeleton(summary);
    table.colorize(scale);
    let enriched = table.enrich(summary);
    table.attach_sort_controls();
    table.sort(SortKey::Score);
    tracing::debug!(rows = table.body.len(), enriched, "summary table prepared");
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_sorts_by_score_and_checks_score_control() {
        let summary = table::tests::summary();
        let table = prepare(&summary, &ColorScale::total());

        let names: Vec<&str> = table.body.iter().map(|r| r.place_name.as_str()).collect();
        assert_eq!(names, vec!["United Kingdom", "France"]);
        assert_eq!(table.sorted_by, Some(SortKey::Score));
        assert_eq!(table.sort_controls().count(), 2);
        assert!(table.sort_controls().all(|c| c.selected == SortKey::Score));
    }

    #[test]
    fn empty_summary_renders_empty_body() {
        let table = prepare(&Summary::default(), &ColorScale::total());
        assert!(table.body.is_empty());
        assert_eq!(table.orders().score, Vec::new());
    }
}
