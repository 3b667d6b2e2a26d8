//! The "Sort alphabetically / by score" radio group.

use serde::Serialize;

use crate::sort::SortKey;

/// One radio input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortOption {
    /// Input value (`alpha` or `score`).
    pub value: SortKey,
    /// Label text.
    pub label: &'static str,
    /// Whether the input is checked.
    pub checked: bool,
}

/// A mutually exclusive pair of sort choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortControls {
    /// Radio group name, `sorttable-<index>`.
    pub name: String,
    /// Currently selected key.
    pub selected: SortKey,
    /// The two inputs, alphabetical first.
    pub options: [SortOption; 2],
}

impl SortControls {
    /// Controls for the `index`-th header/footer row.
    pub fn new(index: usize, selected: SortKey) -> Self {
        let mut controls = Self {
            name: format!("sorttable-{index}"),
            selected,
            options: [
                SortOption {
                    value: SortKey::Alpha,
                    label: "alphabetically",
                    checked: false,
                },
                SortOption {
                    value: SortKey::Score,
                    label: "by score",
                    checked: false,
                },
            ],
        };
        controls.select(selected);
        controls
    }

    /// Check exactly the input for `key`.
    pub fn select(&mut self, key: SortKey) {
        self.selected = key;
        for option in &mut self.options {
            option.checked = option.value == key;
        }
    }
}
