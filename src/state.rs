use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::color::ColorMap;
use crate::data::aggregate::DashboardViews;
use crate::data::cache::load_cached;
use crate::data::filter::{filter, FilterDimension, FilterSelection};
use crate::data::model::SalesDataset;

// ---------------------------------------------------------------------------
// Selection events
// ---------------------------------------------------------------------------

/// A user interaction with one of the filter widgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    Toggle(FilterDimension, String),
    SelectAll(FilterDimension),
    SelectNone(FilterDimension),
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Loaded dataset (None until a file loads successfully).
    pub dataset: Option<Arc<SalesDataset>>,

    /// File the dataset came from.
    pub data_path: Option<PathBuf>,

    /// Current branch / product-line selection.
    pub selection: FilterSelection,

    /// Chart inputs for the current selection.
    pub views: DashboardViews,

    /// Branch colours shared by the scatter and stacked-bar charts.
    pub branch_colors: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Load `path` through the process-wide cache. On failure the previous
    /// dataset (if any) stays active and the error is shown in the UI.
    pub fn load(&mut self, path: &Path) {
        match load_cached(path) {
            Ok(dataset) => self.set_dataset(path.to_path_buf(), dataset),
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Ingest a newly loaded dataset: select everything and recompute.
    pub fn set_dataset(&mut self, path: PathBuf, dataset: Arc<SalesDataset>) {
        self.selection = FilterSelection::all(&dataset);
        self.branch_colors = Some(ColorMap::new(&dataset.branches));
        self.dataset = Some(dataset);
        self.data_path = Some(path);
        self.status_message = None;
        self.recompute();
    }

    /// Apply one widget interaction, then rebuild every view from scratch.
    pub fn apply(&mut self, event: SelectionEvent) {
        match &event {
            SelectionEvent::Toggle(dim, value) => self.selection.toggle(*dim, value),
            SelectionEvent::SelectAll(dim) => {
                if let Some(ds) = &self.dataset {
                    self.selection.select_all(*dim, ds);
                }
            }
            SelectionEvent::SelectNone(dim) => self.selection.select_none(*dim),
        }
        log::debug!("Selection changed: {event:?}");
        self.recompute();
    }

    /// Recompute the filtered view and all chart inputs.
    pub fn recompute(&mut self) {
        self.views = match &self.dataset {
            Some(ds) => {
                let view = filter(ds, &self.selection);
                log::debug!("{} of {} records visible", view.len(), ds.len());
                DashboardViews::compute(&view)
            }
            None => DashboardViews::default(),
        };
    }

    /// Number of records passing the current selection.
    pub fn visible_records(&self) -> usize {
        self.views.summary.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::{dataset, record};

    fn loaded_state() -> AppState {
        let ds = dataset(vec![
            record("BranchA", "Health", (2024, 1, 1), 10.0),
            record("BranchB", "Health", (2024, 1, 1), 20.0),
            record("BranchA", "Food", (2024, 1, 2), 5.0),
        ]);
        let mut state = AppState::default();
        state.set_dataset(PathBuf::from("memory.csv"), Arc::new(ds));
        state
    }

    #[test]
    fn new_dataset_selects_everything() {
        let state = loaded_state();
        assert_eq!(state.visible_records(), 3);
        assert_eq!(state.views.daily_totals.len(), 2);
        assert_eq!(
            state.branch_colors.as_ref().map(|c| c.legend_entries().len()),
            Some(2)
        );
    }

    #[test]
    fn events_recompute_every_view() {
        let mut state = loaded_state();
        state.apply(SelectionEvent::Toggle(FilterDimension::Branch, "BranchB".into()));
        state.apply(SelectionEvent::Toggle(FilterDimension::ProductLine, "Food".into()));

        assert_eq!(state.visible_records(), 1);
        assert_eq!(state.views.daily_totals[0].total, 10.0);
        assert_eq!(state.views.revenue_by_product_line.len(), 1);
        assert_eq!(state.views.gross_income_pivot.columns, vec!["BranchA"]);
    }

    #[test]
    fn select_none_then_all_round_trips() {
        let mut state = loaded_state();
        state.apply(SelectionEvent::SelectNone(FilterDimension::ProductLine));
        assert_eq!(state.visible_records(), 0);
        assert!(state.views.payment_shares.is_empty());

        state.apply(SelectionEvent::SelectAll(FilterDimension::ProductLine));
        assert_eq!(state.visible_records(), 3);
    }

    #[test]
    fn failed_load_keeps_previous_dataset() {
        let mut state = loaded_state();
        let dir = tempfile::tempdir().unwrap();
        state.load(&dir.path().join("missing.csv"));

        assert!(state.status_message.as_deref().unwrap().starts_with("Error"));
        assert_eq!(state.visible_records(), 3);
        assert_eq!(state.data_path, Some(PathBuf::from("memory.csv")));
    }
}
