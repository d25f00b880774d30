use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::export::FILTERED_EXPORT_NAME;
use crate::state::{AppState, Page, TableView};

// ---------------------------------------------------------------------------
// Left side panel – navigation and filter widgets
// ---------------------------------------------------------------------------

/// Render the left panel for the current page.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    match state.page {
        Page::Sales | Page::Practice => navigation(ui, state),
        Page::Students => student_filters(ui, state),
        Page::StudentForm => {
            ui.heading("Student Form");
            ui.separator();
            ui.label("Records are saved to the students table and show up on the analysis page.");
        }
    }
}

fn navigation(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Navigation");
    ui.separator();
    ui.label("Choose a page:");
    let page = match state.page {
        Page::Practice => &mut state.practice,
        _ => &mut state.sales,
    };
    ui.radio_value(&mut page.view, TableView::Data, "Data View");
    ui.radio_value(&mut page.view, TableView::Charts, "Charts");
}

fn student_filters(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(all_departments) = state
        .students
        .as_ref()
        .and_then(|ds| ds.unique_values("department"))
        .cloned()
    else {
        ui.label("No student data loaded.");
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            let header_text = format!(
                "Department(s)  ({}/{})",
                state.department_filter.len(),
                all_departments.len()
            );
            egui::CollapsingHeader::new(RichText::new(header_text).strong())
                .id_salt("department_filter")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        if ui.small_button("All").clicked() {
                            state.select_all_departments();
                        }
                        if ui.small_button("None").clicked() {
                            state.select_no_departments();
                        }
                    });

                    for dept in &all_departments {
                        let mut text = RichText::new(dept.to_string());
                        if let Some(cm) = &state.department_colors {
                            text = text.color(cm.color_for(dept));
                        }
                        let mut checked = state.department_filter.contains(dept);
                        if ui.checkbox(&mut checked, text).changed() {
                            state.toggle_department(dept);
                        }
                    }
                });

            ui.separator();
            ui.strong("Grade Range");
            let (lo_bound, hi_bound) = state.grade_bounds;
            let (mut low, mut high) = state.grade_range;
            let low_changed = ui
                .add(egui::Slider::new(&mut low, lo_bound..=hi_bound).text("min").step_by(0.1))
                .changed();
            let high_changed = ui
                .add(egui::Slider::new(&mut high, lo_bound..=hi_bound).text("max").step_by(0.1))
                .changed();
            if low_changed || high_changed {
                // keep the handles ordered
                if low_changed && low > high {
                    high = low;
                } else if high_changed && high < low {
                    low = high;
                }
                state.grade_range = (low, high);
                state.refresh_students();
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            let can_export = state.student_view.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export filtered students…"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.cache.clear();
                state.set_page(state.page);
                ui.close_menu();
            }
        });

        ui.separator();

        for page in Page::ALL {
            if ui.selectable_label(state.page == page, page.label()).clicked() && state.page != page {
                state.set_page(page);
            }
        }

        ui.separator();

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        } else if let Some(msg) = &state.info_message {
            ui.label(RichText::new(msg).color(Color32::DARK_GREEN));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

/// Ask where to save the filtered student rows, then write them as CSV.
pub fn save_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Download Filtered Data")
        .set_file_name(FILTERED_EXPORT_NAME)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        state.export_filtered(&path);
    }
}
