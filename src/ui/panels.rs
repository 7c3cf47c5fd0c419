use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::FilterDimension;
use crate::state::{AppState, SelectionEvent};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
///
/// Widget interactions are collected during the frame and applied once the
/// panel is drawn, so every change triggers exactly one recompute.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(dataset) = state.dataset.clone() else {
        ui.label("No dataset loaded.");
        return;
    };

    let mut events: Vec<SelectionEvent> = Vec::new();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for dim in FilterDimension::ALL {
                let universe = dim.universe(&dataset);

                // Show count of selected / total in the header
                let n_selected = state.selection.values(dim).len();
                let header_text = format!("{}  ({n_selected}/{})", dim.label(), universe.len());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(dim.label())
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                events.push(SelectionEvent::SelectAll(dim));
                            }
                            if ui.small_button("None").clicked() {
                                events.push(SelectionEvent::SelectNone(dim));
                            }
                        });

                        for value in universe {
                            let mut checked = state.selection.is_selected(dim, value);

                            // Branch labels double as the chart legend
                            let mut text = RichText::new(value);
                            if dim == FilterDimension::Branch {
                                if let Some(cm) = &state.branch_colors {
                                    text = text.color(cm.color_for(value));
                                }
                            }

                            if ui.checkbox(&mut checked, text).changed() {
                                events.push(SelectionEvent::Toggle(dim, value.clone()));
                            }
                        }
                    });
            }
        });

    for event in events {
        state.apply(event);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} records loaded, {} visible",
                ds.len(),
                state.visible_records()
            ));
            if let Some((first, last)) = ds.date_range() {
                ui.separator();
                ui.label(format!("{first} – {last}"));
            }
        }

        if let Some(path) = &state.data_path {
            ui.separator();
            ui.weak(path.display().to_string());
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open sales data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load(&path);
    }
}
