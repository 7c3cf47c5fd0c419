use std::collections::BTreeSet;

use super::model::{SalesDataset, SalesRecord};

// ---------------------------------------------------------------------------
// Filter selection: which values are allowed per filterable column
// ---------------------------------------------------------------------------

/// The two columns a user can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterDimension {
    Branch,
    ProductLine,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 2] = [FilterDimension::Branch, FilterDimension::ProductLine];

    /// Widget label.
    pub fn label(self) -> &'static str {
        match self {
            FilterDimension::Branch => "Branch",
            FilterDimension::ProductLine => "Product line",
        }
    }

    /// Every value of this column present in the dataset, first-seen order.
    pub fn universe(self, dataset: &SalesDataset) -> &[String] {
        match self {
            FilterDimension::Branch => &dataset.branches,
            FilterDimension::ProductLine => &dataset.product_lines,
        }
    }

    fn value_of(self, record: &SalesRecord) -> &str {
        match self {
            FilterDimension::Branch => &record.branch,
            FilterDimension::ProductLine => &record.product_line,
        }
    }
}

/// Allowed values per dimension. An empty set selects nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub branches: BTreeSet<String>,
    pub product_lines: BTreeSet<String>,
}

impl FilterSelection {
    /// Every value of both columns selected (the widgets' default).
    pub fn all(dataset: &SalesDataset) -> Self {
        FilterSelection {
            branches: dataset.branches.iter().cloned().collect(),
            product_lines: dataset.product_lines.iter().cloned().collect(),
        }
    }

    pub fn values(&self, dimension: FilterDimension) -> &BTreeSet<String> {
        match dimension {
            FilterDimension::Branch => &self.branches,
            FilterDimension::ProductLine => &self.product_lines,
        }
    }

    fn values_mut(&mut self, dimension: FilterDimension) -> &mut BTreeSet<String> {
        match dimension {
            FilterDimension::Branch => &mut self.branches,
            FilterDimension::ProductLine => &mut self.product_lines,
        }
    }

    pub fn is_selected(&self, dimension: FilterDimension, value: &str) -> bool {
        self.values(dimension).contains(value)
    }

    /// Flip membership of a single value.
    pub fn toggle(&mut self, dimension: FilterDimension, value: &str) {
        let selected = self.values_mut(dimension);
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
    }

    /// Select every value of `dimension` present in the dataset.
    pub fn select_all(&mut self, dimension: FilterDimension, dataset: &SalesDataset) {
        *self.values_mut(dimension) = dimension.universe(dataset).iter().cloned().collect();
    }

    /// Deselect all values of `dimension`.
    pub fn select_none(&mut self, dimension: FilterDimension) {
        self.values_mut(dimension).clear();
    }

    /// Whether a record passes both dimensions.
    pub fn matches(&self, record: &SalesRecord) -> bool {
        FilterDimension::ALL
            .iter()
            .all(|dim| self.is_selected(*dim, dim.value_of(record)))
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// The records passing the current selection, in dataset order.
#[derive(Debug, Clone, Default)]
pub struct FilteredView<'a> {
    records: Vec<&'a SalesRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn from_records(records: Vec<&'a SalesRecord>) -> Self {
        FilteredView { records }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a SalesRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Return the records whose branch and product line are both selected.
///
/// Membership within a dimension, conjunction across dimensions. An empty
/// set for either dimension yields an empty view, never "everything".
pub fn filter<'a>(dataset: &'a SalesDataset, selection: &FilterSelection) -> FilteredView<'a> {
    FilteredView::from_records(
        dataset
            .records
            .iter()
            .filter(|record| selection.matches(record))
            .collect(),
    )
}
