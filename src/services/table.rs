//! Sortable table
//!
//! In-memory sorting of tabular rows by one column. Cells that both parse as
//! numbers compare numerically, everything else compares as text with a
//! locale-style collation. Sorting never mutates the input.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Direction of the active sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
    /// Input order
    #[default]
    Unsorted,
}

impl SortDirection {
    /// Parse a query-string value (`asc`, `desc`, anything else is unsorted)
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => SortDirection::Ascending,
            "desc" | "descending" => SortDirection::Descending,
            _ => SortDirection::Unsorted,
        }
    }

    /// Next direction when the same column header is clicked again
    pub fn cycle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Unsorted,
            SortDirection::Unsorted => SortDirection::Ascending,
        }
    }
}

/// A row whose cells can be looked up by column key
pub trait TableRow {
    fn cell(&self, column: &str) -> Option<Cow<'_, str>>;
}

impl TableRow for BTreeMap<String, String> {
    fn cell(&self, column: &str) -> Option<Cow<'_, str>> {
        self.get(column).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl TableRow for HashMap<String, String> {
    fn cell(&self, column: &str) -> Option<Cow<'_, str>> {
        self.get(column).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl TableRow for serde_json::Map<String, serde_json::Value> {
    fn cell(&self, column: &str) -> Option<Cow<'_, str>> {
        self.get(column).and_then(json_cell)
    }
}

impl TableRow for serde_json::Value {
    fn cell(&self, column: &str) -> Option<Cow<'_, str>> {
        self.as_object()?.cell(column)
    }
}

fn json_cell(value: &serde_json::Value) -> Option<Cow<'_, str>> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

/// Return a new vector of `rows` ordered by `column`.
///
/// The sort is stable; `Unsorted` returns the rows in input order. Missing
/// cells compare as empty text, which sorts after every number.
pub fn sort_rows<R: TableRow + Clone>(rows: &[R], column: &str, direction: SortDirection) -> Vec<R> {
    let mut sorted = rows.to_vec();

    let compare = |a: &R, b: &R| {
        let left = a.cell(column).unwrap_or_default();
        let right = b.cell(column).unwrap_or_default();
        compare_cells(&left, &right)
    };

    match direction {
        SortDirection::Ascending => sorted.sort_by(compare),
        SortDirection::Descending => sorted.sort_by(|a, b| compare(b, a)),
        SortDirection::Unsorted => {}
    }

    sorted
}

/// Compare two cell values.
///
/// Two numbers compare numerically and two texts collate. A number and a
/// text order the number first so the comparison stays a total order.
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    match (parse_number(a), parse_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => collate(a, b),
    }
}

/// Numeric value of a cell, if it is one. Blank cells, NaN and infinities are not numbers.
fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Case-insensitive order first, then lowercase before uppercase, then code points
fn collate(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    if primary != Ordering::Equal {
        return primary;
    }

    let tertiary = a
        .chars()
        .map(|c| c.is_uppercase())
        .cmp(b.chars().map(|c| c.is_uppercase()));
    tertiary.then_with(|| a.cmp(b))
}

/// Column/direction state driven by header clicks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SortState {
    pub column: Option<String>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: Some(column.into()),
            direction,
        }
    }

    /// Same column cycles ascending, descending, unsorted; a new column starts ascending
    pub fn click(&mut self, column: &str) {
        if self.column.as_deref() == Some(column) {
            self.direction = self.direction.cycle();
        } else {
            self.column = Some(column.to_string());
            self.direction = SortDirection::Ascending;
        }
    }

    /// Apply the current state to `rows`
    pub fn apply<R: TableRow + Clone>(&self, rows: &[R]) -> Vec<R> {
        match &self.column {
            Some(column) => sort_rows(rows, column, self.direction),
            None => rows.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn row(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn column(rows: &[BTreeMap<String, String>], key: &str) -> Vec<String> {
        rows.iter().map(|r| r[key].clone()).collect()
    }

    #[test]
    fn test_numeric_cells_sort_numerically() {
        let rows = vec![row(&[("n", "10")]), row(&[("n", "9")]), row(&[("n", " 100 ")])];
        let sorted = sort_rows(&rows, "n", SortDirection::Ascending);
        assert_eq!(column(&sorted, "n"), vec!["9", "10", " 100 "]);
    }

    #[test]
    fn test_numbers_sort_before_text() {
        assert_eq!(compare_cells("10", "9"), Ordering::Greater);
        assert_eq!(compare_cells("10", "abc"), Ordering::Less);
        assert_eq!(compare_cells("", "0"), Ordering::Greater);
        assert_eq!(compare_cells("", "abc"), Ordering::Less);
        assert_eq!(compare_cells("NaN", "1"), Ordering::Greater);
    }

    #[test]
    fn test_text_collation() {
        assert_eq!(compare_cells("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_cells("a", "A"), Ordering::Less);
        assert_eq!(compare_cells("Zed", "zed"), Ordering::Greater);
        assert_eq!(compare_cells("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_input_not_mutated_and_unsorted_keeps_order() {
        let rows = vec![row(&[("k", "b")]), row(&[("k", "a")])];
        let original = rows.clone();

        let sorted = sort_rows(&rows, "k", SortDirection::Ascending);
        assert_eq!(column(&sorted, "k"), vec!["a", "b"]);
        assert_eq!(rows, original);

        let unsorted = sort_rows(&rows, "k", SortDirection::Unsorted);
        assert_eq!(unsorted, original);
    }

    #[test]
    fn test_stable_for_equal_keys() {
        let rows = vec![
            row(&[("k", "1"), ("id", "first")]),
            row(&[("k", "0"), ("id", "zero")]),
            row(&[("k", "1"), ("id", "second")]),
        ];
        let asc = sort_rows(&rows, "k", SortDirection::Ascending);
        assert_eq!(column(&asc, "id"), vec!["zero", "first", "second"]);

        let desc = sort_rows(&rows, "k", SortDirection::Descending);
        assert_eq!(column(&desc, "id"), vec!["first", "second", "zero"]);
    }

    #[test]
    fn test_json_rows() {
        let rows = vec![
            json!({"title": "B", "views": 3}),
            json!({"title": "A", "views": 12}),
            json!({"title": "C"}),
        ];
        let sorted = sort_rows(&rows, "views", SortDirection::Descending);
        let titles: Vec<&str> = sorted.iter().map(|r| r["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_click_cycle() {
        let mut state = SortState::default();
        state.click("title");
        assert_eq!(state.direction, SortDirection::Ascending);
        state.click("title");
        assert_eq!(state.direction, SortDirection::Descending);
        state.click("title");
        assert_eq!(state.direction, SortDirection::Unsorted);
        state.click("title");
        assert_eq!(state.direction, SortDirection::Ascending);

        state.click("title");
        state.click("views");
        assert_eq!(state.column.as_deref(), Some("views"));
        assert_eq!(state.direction, SortDirection::Ascending);
    }

    #[test]
    fn test_parse_direction() {
        assert_eq!(SortDirection::parse("asc"), SortDirection::Ascending);
        assert_eq!(SortDirection::parse("DESC"), SortDirection::Descending);
        assert_eq!(SortDirection::parse(""), SortDirection::Unsorted);
    }

    proptest! {
        #[test]
        fn prop_descending_reverses_distinct_numbers(
            values in proptest::collection::hash_set(-100_000i64..100_000, 0..40)
        ) {
            let rows: Vec<_> = values.iter().map(|v| row(&[("n", &v.to_string())])).collect();

            let asc = sort_rows(&rows, "n", SortDirection::Ascending);
            let mut desc = sort_rows(&asc, "n", SortDirection::Descending);
            desc.reverse();
            prop_assert_eq!(asc, desc);
        }

        #[test]
        fn prop_sorting_sorted_is_identity(
            values in proptest::collection::vec("[a-zA-Z0-9 ]{0,6}", 0..30),
            descending in any::<bool>()
        ) {
            let direction = if descending { SortDirection::Descending } else { SortDirection::Ascending };
            let rows: Vec<_> = values.iter().map(|v| row(&[("c", v.as_str())])).collect();

            let once = sort_rows(&rows, "c", direction);
            let twice = sort_rows(&once, "c", direction);
            prop_assert_eq!(once, twice);
        }
    }
}
