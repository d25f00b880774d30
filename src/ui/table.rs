use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::aggregate::{ColumnSummary, Summary};
use crate::data::model::{Dataset, Value};

/// How one column's cells are displayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellFormat {
    Plain,
    Decimals(usize),
    /// Whole dollars, e.g. `$412`.
    Currency,
    /// Fixed decimals followed by `%`.
    Percent(usize),
    /// One decimal followed by a star.
    Stars,
    /// `6 Jan 2025, 9:00 AM`
    DateTime,
}

impl CellFormat {
    pub fn render(self, value: &Value) -> String {
        if value.is_null() {
            return String::new();
        }
        match (self, value) {
            (CellFormat::Decimals(d), v) => v.as_f64().map_or_else(|| v.to_string(), |f| format!("{f:.d$}")),
            (CellFormat::Currency, v) => v
                .as_f64()
                .map_or_else(|| v.to_string(), |f| format!("${f:.0}")),
            (CellFormat::Percent(d), v) => v
                .as_f64()
                .map_or_else(|| v.to_string(), |f| format!("{f:.d$}%")),
            (CellFormat::Stars, v) => v
                .as_f64()
                .map_or_else(|| v.to_string(), |f| format!("{f:.1} ⭐")),
            (CellFormat::DateTime, Value::Timestamp(t)) => t.format("%-d %b %Y, %-I:%M %p").to_string(),
            (_, v) => v.to_string(),
        }
    }
}

/// Header text and cell format for a named column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnStyle {
    pub column: &'static str,
    pub header: &'static str,
    pub format: CellFormat,
}

impl ColumnStyle {
    pub const fn new(column: &'static str, header: &'static str, format: CellFormat) -> Self {
        Self { column, header, format }
    }
}

pub const SALES_STYLE: [ColumnStyle; 4] = [
    ColumnStyle::new("Product", "Product Name", CellFormat::Plain),
    ColumnStyle::new("Category", "Category", CellFormat::Plain),
    ColumnStyle::new("Sales", "Sales ($)", CellFormat::Currency),
    ColumnStyle::new("Rating", "Rating", CellFormat::Stars),
];

pub const STUDENT_STYLE: [ColumnStyle; 8] = [
    ColumnStyle::new("id", "ID", CellFormat::Plain),
    ColumnStyle::new("name", "Student Name", CellFormat::Plain),
    ColumnStyle::new("age", "Age", CellFormat::Plain),
    ColumnStyle::new("grade", "Grade", CellFormat::Decimals(2)),
    ColumnStyle::new("department", "Department", CellFormat::Plain),
    ColumnStyle::new("attendance", "Attendance %", CellFormat::Percent(1)),
    ColumnStyle::new("interests", "Interests", CellFormat::Plain),
    ColumnStyle::new("submission_date", "Submitted On", CellFormat::DateTime),
];

fn style_for<'a>(styles: &'a [ColumnStyle], column: &str) -> Option<&'a ColumnStyle> {
    styles.iter().find(|s| s.column == column)
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Render every row of `dataset`, without an index column. Columns missing
/// from `styles` use their own name and plain formatting.
pub fn dataset_table(ui: &mut Ui, id: &str, dataset: &Dataset, styles: &[ColumnStyle]) {
    if dataset.is_empty() {
        ui.label("No rows match the current selection.");
        return;
    }

    let columns: Vec<(String, CellFormat)> = dataset
        .schema()
        .columns
        .iter()
        .map(|c| match style_for(styles, &c.name) {
            Some(style) => (style.header.to_string(), style.format),
            None => (c.name.clone(), CellFormat::Plain),
        })
        .collect();

    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .columns(Column::auto().at_least(60.0), columns.len())
            .min_scrolled_height(0.0)
            .max_scroll_height(320.0)
            .header(20.0, |mut header| {
                for (name, _) in &columns {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, dataset.len(), |mut row| {
                    let values = &dataset.rows()[row.index()];
                    for (value, (_, format)) in values.iter().zip(&columns) {
                        row.col(|ui: &mut Ui| {
                            ui.label(format.render(value));
                        });
                    }
                });
            });
    });
}

/// Descriptive statistics, one column per numeric column.
pub fn summary_table(ui: &mut Ui, id: &str, summary: &Summary) {
    if summary.columns.is_empty() {
        ui.label("No numeric columns.");
        return;
    }

    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::auto().at_least(50.0))
            .columns(Column::auto().at_least(80.0), summary.columns.len())
            .header(20.0, |mut header| {
                header.col(|_ui: &mut Ui| {});
                for col in &summary.columns {
                    header.col(|ui: &mut Ui| {
                        ui.strong(&col.column);
                    });
                }
            })
            .body(|mut body| {
                let stats: Vec<_> = summary.columns.iter().map(ColumnSummary::stats).collect();
                for (i, stat_name) in ColumnSummary::STAT_NAMES.iter().enumerate() {
                    body.row(18.0, |mut row| {
                        row.col(|ui: &mut Ui| {
                            ui.strong(*stat_name);
                        });
                        for col_stats in &stats {
                            row.col(|ui: &mut Ui| {
                                ui.label(format!("{:.3}", col_stats[i]));
                            });
                        }
                    });
                }
            });
    });
}
