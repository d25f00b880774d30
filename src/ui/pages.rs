use eframe::egui::{self, RichText, ScrollArea, Ui};

use crate::data::aggregate::{column_mean, AggValue, KeyMetric};
use crate::data::loader::{DatasetKind, DEPARTMENTS, INTERESTS};
use crate::form::{AGE_RANGE, ATTENDANCE_RANGE, GRADE_RANGE};
use crate::state::{AppState, TableView};
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// Sales / practice
// ---------------------------------------------------------------------------

pub fn table_page(ui: &mut Ui, state: &mut AppState, kind: DatasetKind) {
    let (title, styles): (&str, &[table::ColumnStyle]) = match kind {
        DatasetKind::Practice => ("📊 Practice Data chart", &[]),
        _ => ("📊 Data Visualization", &table::SALES_STYLE),
    };
    ui.heading(title);
    ui.separator();

    let page = match kind {
        DatasetKind::Practice => &state.practice,
        _ => &state.sales,
    };
    let Some(dataset) = &page.dataset else {
        ui.label("No data loaded.");
        return;
    };

    match page.view {
        TableView::Data => {
            ScrollArea::vertical().show(ui, |ui: &mut Ui| {
                ui.strong("Raw Data Display");
                table::dataset_table(ui, "raw_data", dataset, styles);
                ui.add_space(12.0);
                ui.strong("Data Statistics");
                if let Some(summary) = &page.summary {
                    table::summary_table(ui, "statistics", summary);
                }
            });
        }
        TableView::Charts => {
            let mut selected = page.chart;
            egui::ComboBox::from_label("Choose a chart type")
                .selected_text(selected.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for &kind in page.available_charts {
                        ui.selectable_value(&mut selected, kind, kind.label());
                    }
                });
            if let Some(data) = &page.chart_data {
                plot::chart(ui, "table_page_chart", data, None);
            }
            if selected != page.chart {
                state.set_table_chart(kind, selected);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Student dashboard
// ---------------------------------------------------------------------------

fn metric(ui: &mut Ui, label: &str, metric: &KeyMetric, decimals: usize, suffix: &str) {
    ui.vertical(|ui: &mut Ui| {
        ui.label(label);
        ui.heading(format!("{:.decimals$}{suffix}", metric.value));
        let delta = format!("{:+.decimals$}{suffix}", metric.delta);
        let color = match metric.delta.value() {
            Some(d) if d < 0.0 => egui::Color32::RED,
            Some(_) => egui::Color32::DARK_GREEN,
            None => egui::Color32::GRAY,
        };
        ui.label(RichText::new(delta).color(color));
    });
}

pub fn student_dashboard(ui: &mut Ui, state: &mut AppState) {
    ui.heading("📊 Student Data Analysis Dashboard");
    ui.separator();

    let Some(view) = &state.student_view else {
        if let Some(msg) = &state.info_message {
            ui.label(msg);
        }
        return;
    };
    let colors = state.department_colors.as_ref();
    let mut export_clicked = false;

    ScrollArea::vertical().show(ui, |ui: &mut Ui| {
        ui.columns(2, |cols| {
            for (i, data) in view.charts.iter().enumerate() {
                let ui = &mut cols[i % 2];
                plot::chart(ui, &format!("student_chart_{i}"), data, colors);
                ui.add_space(8.0);
            }
        });

        ui.separator();
        ui.heading("📈 Key Statistics");
        ui.columns(3, |cols| {
            metric(&mut cols[0], "Average Grade", &view.average_grade, 2, "");
            metric(&mut cols[1], "Average Attendance", &view.average_attendance, 1, "%");
            metric(&mut cols[2], "Total Students", &view.total_students, 0, "");
        });

        ui.separator();
        ui.heading("📊 Correlation Heatmap");
        match &view.correlation {
            Some(heatmap) => plot::chart(ui, "correlation", heatmap, None),
            None => {
                ui.label("Correlation unavailable.");
            }
        }

        ui.separator();
        ui.heading("📋 Detailed Data View");
        table::dataset_table(ui, "student_detail", &view.filtered, &table::STUDENT_STYLE);
        if ui.button("Download Filtered Data").clicked() {
            export_clicked = true;
        }
    });

    if export_clicked {
        panels::save_file_dialog(state);
    }
}

// ---------------------------------------------------------------------------
// Data-entry form
// ---------------------------------------------------------------------------

pub fn student_form(ui: &mut Ui, state: &mut AppState) {
    ui.heading("📚 Student Data Collection Form");
    ui.label("Please fill in the following details:");
    ui.separator();

    let mut submitted = false;
    ScrollArea::vertical().show(ui, |ui: &mut Ui| {
        let form = &mut state.form;
        ui.add(egui::TextEdit::singleline(&mut form.name).hint_text("Enter full name"));
        ui.columns(2, |cols| {
            cols[0].add(egui::Slider::new(&mut form.age, AGE_RANGE.0..=AGE_RANGE.1).text("Age"));
            cols[1].add(
                egui::Slider::new(&mut form.grade, GRADE_RANGE.0..=GRADE_RANGE.1)
                    .text("Current Grade")
                    .step_by(0.1),
            );
        });

        ui.label("Select Department");
        ui.horizontal_wrapped(|ui: &mut Ui| {
            for dept in DEPARTMENTS {
                ui.radio_value(&mut form.department, dept.to_string(), dept);
            }
        });

        ui.add(
            egui::Slider::new(&mut form.attendance, ATTENDANCE_RANGE.0..=ATTENDANCE_RANGE.1)
                .text("Attendance Percentage")
                .step_by(0.1),
        );

        ui.label("Select Your Interests");
        ui.horizontal_wrapped(|ui: &mut Ui| {
            for interest in INTERESTS {
                let mut checked = form.interests.iter().any(|i| i == interest);
                if ui.checkbox(&mut checked, interest).changed() {
                    form.toggle_interest(interest);
                }
            }
        });

        submitted = ui.button("Submit").clicked();

        ui.separator();
        ui.heading("📊 Saved Records");
        match &state.saved_records {
            Some(records) if !records.is_empty() => {
                table::dataset_table(ui, "saved_records", records, &table::STUDENT_STYLE);
                ui.separator();
                let grade = column_mean(records, "grade").unwrap_or(AggValue::Undefined);
                let attendance = column_mean(records, "attendance").unwrap_or(AggValue::Undefined);
                ui.columns(3, |cols| {
                    cols[0].label(format!("Total Students: {}", records.len()));
                    cols[1].label(format!("Average Grade: {grade:.2}"));
                    cols[2].label(format!("Average Attendance: {attendance:.1}%"));
                });
            }
            _ => {
                ui.label("No records found. Submit the form to see the data here!");
            }
        }
    });

    if submitted {
        state.submit_form();
    }
}
