use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::chart::{prepare, ChartConfig, ChartData, ChartKind};
use crate::color::ColorMap;
use crate::config::AppConfig;
use crate::data::aggregate::{
    describe, mean_metric, row_count_metric, AggregateResult, AggregateSpec, KeyMetric, Summary,
};
use crate::data::cache::DatasetCache;
use crate::data::export;
use crate::data::filter::{numeric_bounds, FilterCriteria};
use crate::data::loader::DatasetKind;
use crate::data::model::{Dataset, Value};
use crate::data::pipeline;
use crate::form::StudentEntry;
use crate::store::TabularStore;

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Sales,
    Practice,
    Students,
    StudentForm,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Sales, Page::Practice, Page::Students, Page::StudentForm];

    pub fn label(self) -> &'static str {
        match self {
            Page::Sales => "Sales",
            Page::Practice => "Practice",
            Page::Students => "Student Analysis",
            Page::StudentForm => "Student Form",
        }
    }
}

/// "Data View" / "Charts" switch on the table pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableView {
    Data,
    Charts,
}

/// State of a sales-style page: one synthetic dataset persisted to its store,
/// shown either as a table with statistics or as one selectable chart.
pub struct TablePage {
    pub kind: DatasetKind,
    pub view: TableView,
    pub chart: ChartKind,
    pub available_charts: &'static [ChartKind],
    pub chart_config: ChartConfig,
    pub dataset: Option<Dataset>,
    pub summary: Option<Summary>,
    pub chart_data: Option<ChartData>,
}

impl TablePage {
    fn new(kind: DatasetKind, available_charts: &'static [ChartKind], chart_config: ChartConfig) -> Self {
        Self {
            kind,
            view: TableView::Data,
            chart: available_charts[0],
            available_charts,
            chart_config,
            dataset: None,
            summary: None,
            chart_data: None,
        }
    }

    fn rebuild_chart(&mut self) -> Result<()> {
        self.chart_data = match &self.dataset {
            Some(ds) => Some(prepare(self.chart, ds, &self.chart_config)?),
            None => None,
        };
        Ok(())
    }
}

const SALES_CHARTS: [ChartKind; 5] = [
    ChartKind::Bar,
    ChartKind::Pie,
    ChartKind::Histogram,
    ChartKind::Line,
    ChartKind::Scatter,
];
const PRACTICE_CHARTS: [ChartKind; 2] = [ChartKind::Bar, ChartKind::Pie];
/// Charts on the student dashboard, in display order.
pub const STUDENT_CHARTS: [ChartKind; 4] = [
    ChartKind::Bar,
    ChartKind::Histogram,
    ChartKind::Scatter,
    ChartKind::Pie,
];

/// Everything the student dashboard shows for the current filter selection.
pub struct StudentView {
    pub filtered: Dataset,
    pub charts: Vec<ChartData>,
    pub average_grade: KeyMetric,
    pub average_attendance: KeyMetric,
    pub total_students: KeyMetric,
    /// Correlation heatmap over the configured numeric columns.
    pub correlation: Option<ChartData>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AppConfig,
    pub page: Page,
    pub cache: DatasetCache,

    pub sales: TablePage,
    pub practice: TablePage,

    /// Unfiltered student records.
    pub students: Option<Dataset>,
    pub department_filter: BTreeSet<Value>,
    pub grade_range: (f64, f64),
    /// Observed grade min/max; the slider limits.
    pub grade_bounds: (f64, f64),
    pub student_view: Option<StudentView>,
    pub department_colors: Option<ColorMap>,

    pub form: StudentEntry,
    pub saved_records: Option<Dataset>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
    /// Confirmation shown after a successful action.
    pub info_message: Option<String>,
}

impl AppState {
    pub fn new(config: AppConfig, page: Page) -> Self {
        let sales = TablePage::new(DatasetKind::Sales, &SALES_CHARTS, ChartConfig::sales(config.sales_bins));
        let practice = TablePage::new(DatasetKind::Practice, &PRACTICE_CHARTS, ChartConfig::practice());
        let mut state = Self {
            config,
            page,
            cache: DatasetCache::new(),
            sales,
            practice,
            students: None,
            department_filter: BTreeSet::new(),
            grade_range: (0.0, 4.0),
            grade_bounds: (0.0, 4.0),
            student_view: None,
            department_colors: None,
            form: StudentEntry::default(),
            saved_records: None,
            status_message: None,
            info_message: None,
        };
        state.set_page(page);
        state
    }

    /// Log `err` and show it in the status bar.
    pub fn report(&mut self, err: anyhow::Error) {
        log::error!("{err:#}");
        self.status_message = Some(format!("Error: {err:#}"));
    }

    /// Run one fallible action, routing any failure to the status bar.
    fn guarded(&mut self, action: impl FnOnce(&mut Self) -> Result<()>) {
        if let Err(e) = action(self) {
            self.report(e);
        }
    }

    fn open_store(&self, kind: DatasetKind) -> Result<TabularStore> {
        std::fs::create_dir_all(&self.config.data_dir)
            .with_context(|| format!("creating data directory {}", self.config.data_dir.display()))?;
        let path = self.config.store_path(kind);
        TabularStore::open(&path).with_context(|| format!("opening {}", path.display()))
    }

    pub fn set_page(&mut self, page: Page) {
        self.page = page;
        self.status_message = None;
        self.info_message = None;
        match page {
            Page::Sales => self.guarded(|s| s.load_table_page(DatasetKind::Sales)),
            Page::Practice => self.guarded(|s| s.load_table_page(DatasetKind::Practice)),
            Page::Students => self.guarded(Self::load_students),
            Page::StudentForm => self.guarded(Self::load_saved_records),
        }
    }

    fn table_page_mut(&mut self, kind: DatasetKind) -> &mut TablePage {
        match kind {
            DatasetKind::Practice => &mut self.practice,
            _ => &mut self.sales,
        }
    }

    // ---- Sales / practice ----

    /// Generate the page's dataset, replace its stored table, and read it
    /// back through the cache.
    fn load_table_page(&mut self, kind: DatasetKind) -> Result<()> {
        let seed = match kind {
            DatasetKind::Sales => self.config.seed,
            _ => 0,
        };
        let generated = self.cache.synthetic(kind, seed)?;
        let dataset = {
            let mut store = self.open_store(kind)?;
            let stored = self.cache.stored(&store, kind).ok();
            if stored.as_ref() != Some(&generated) {
                store
                    .replace_table(kind.table_name(), &generated)
                    .with_context(|| format!("saving {kind} data"))?;
            }
            self.cache.stored(&store, kind)?
        };
        log::info!("{kind}: {} rows loaded", dataset.len());

        let page = self.table_page_mut(kind);
        page.summary = Some(describe(&dataset));
        page.dataset = Some(dataset);
        page.rebuild_chart()
    }

    pub fn set_table_chart(&mut self, kind: DatasetKind, chart: ChartKind) {
        self.table_page_mut(kind).chart = chart;
        self.guarded(|s| s.table_page_mut(kind).rebuild_chart());
    }

    // ---- Student dashboard ----

    fn load_students(&mut self) -> Result<()> {
        let kind = DatasetKind::Students;
        let dataset = {
            let store = self.open_store(kind)?;
            if !store.table_exists(kind.table_name())? {
                self.students = None;
                self.student_view = None;
                self.info_message =
                    Some("No student records yet. Submit the form or run generate_sample.".to_string());
                return Ok(());
            }
            self.cache.stored(&store, kind)?
        };

        let departments = dataset
            .unique_values("department")
            .cloned()
            .unwrap_or_default();
        let domain_changed = self
            .students
            .as_ref()
            .and_then(|old| old.unique_values("department"))
            != Some(&departments);
        let bounds = numeric_bounds(&dataset, "grade")?.unwrap_or((0.0, 4.0));
        if domain_changed || bounds != self.grade_bounds {
            self.department_filter = departments.clone();
            self.grade_bounds = bounds;
            self.grade_range = bounds;
        }
        self.department_colors = Some(ColorMap::new(&departments));
        self.students = Some(dataset);
        self.refresh_students();
        Ok(())
    }

    pub fn student_criteria(&self) -> FilterCriteria {
        FilterCriteria::new()
            .with_membership("department", self.department_filter.iter().cloned())
            .with_range("grade", self.grade_range.0, self.grade_range.1)
    }

    /// Re-run filter → aggregate → charts for the current selection.
    pub fn refresh_students(&mut self) {
        self.guarded(|s| {
            let view = match &s.students {
                Some(full) => Some(s.build_student_view(full)?),
                None => None,
            };
            s.student_view = view;
            Ok(())
        });
    }

    fn build_student_view(&self, full: &Dataset) -> Result<StudentView> {
        let specs = [AggregateSpec::correlation(self.config.correlation_columns.as_slice())];
        let output = pipeline::run(full, &self.student_criteria(), &specs)?;
        let chart_config = ChartConfig::students(self.config.student_bins, self.config.correlation_columns.clone());
        let charts = STUDENT_CHARTS
            .iter()
            .map(|&kind| prepare(kind, &output.filtered, &chart_config))
            .collect::<Result<Vec<_>, _>>()?;
        let correlation = output.aggregates.into_iter().find_map(|r| match r {
            AggregateResult::Correlation(matrix) => Some(ChartData::Heatmap {
                title: format!("Pearson correlation of {}", matrix.columns.join(", ")),
                matrix,
            }),
            _ => None,
        });
        Ok(StudentView {
            average_grade: mean_metric(&output.filtered, full, "grade")?,
            average_attendance: mean_metric(&output.filtered, full, "attendance")?,
            total_students: row_count_metric(&output.filtered, full),
            charts,
            correlation,
            filtered: output.filtered,
        })
    }

    pub fn toggle_department(&mut self, department: &Value) {
        if !self.department_filter.remove(department) {
            self.department_filter.insert(department.clone());
        }
        self.refresh_students();
    }

    pub fn select_all_departments(&mut self) {
        if let Some(all) = self.students.as_ref().and_then(|ds| ds.unique_values("department")) {
            self.department_filter = all.clone();
        }
        self.refresh_students();
    }

    pub fn select_no_departments(&mut self) {
        self.department_filter.clear();
        self.refresh_students();
    }

    /// Write the filtered student rows as CSV to `path`.
    pub fn export_filtered(&mut self, path: &Path) {
        self.guarded(|s| {
            let view = s
                .student_view
                .as_ref()
                .context("nothing to export: no student data loaded")?;
            export::write_csv(&view.filtered, path)?;
            s.info_message = Some(format!("Saved {}", path.display()));
            Ok(())
        });
    }

    // ---- Data-entry form ----

    fn load_saved_records(&mut self) -> Result<()> {
        let kind = DatasetKind::Students;
        let store = self.open_store(kind)?;
        self.saved_records = if store.table_exists(kind.table_name())? {
            Some(self.cache.stored(&store, kind)?)
        } else {
            None
        };
        Ok(())
    }

    pub fn submit_form(&mut self) {
        self.status_message = None;
        self.info_message = None;
        self.guarded(|s| {
            s.form.validate()?;
            let id = {
                let mut store = s.open_store(DatasetKind::Students)?;
                store
                    .insert_student(&s.form)
                    .context("Error saving data")?
            };
            log::info!("saved student record {id}");
            s.info_message = Some("Data saved successfully! 🎉".to_string());
            s.load_saved_records()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_in(dir: &Path, page: Page) -> AppState {
        let config = AppConfig {
            data_dir: dir.to_path_buf(),
            ..AppConfig::default()
        };
        AppState::new(config, page)
    }

    #[test]
    fn sales_page_persists_and_charts() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path(), Page::Sales);
        assert!(state.status_message.is_none());
        assert!(dir.path().join("sales_data.db").exists());
        assert_eq!(state.sales.dataset.as_ref().unwrap().len(), 100);

        state.set_table_chart(DatasetKind::Sales, ChartKind::Histogram);
        assert!(matches!(state.sales.chart_data, Some(ChartData::Histogram { .. })));
    }

    #[test]
    fn revisiting_a_page_does_not_rewrite_unchanged_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path(), Page::Practice);
        let store = TabularStore::open(dir.path().join("practice_data.db")).unwrap();
        let revision = store.revision("practice").unwrap();
        state.set_page(Page::Sales);
        state.set_page(Page::Practice);
        assert_eq!(store.revision("practice").unwrap(), revision);
    }

    #[test]
    fn missing_student_table_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path(), Page::Students);
        assert!(state.status_message.is_none());
        assert!(state.info_message.is_some());
        assert!(state.student_view.is_none());
    }

    #[test]
    fn form_submission_shows_up_on_the_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path(), Page::StudentForm);
        state.submit_form();
        assert!(state.status_message.as_deref().unwrap().starts_with("Error:"));

        state.form.name = "Ana Silva".into();
        state.submit_form();
        assert!(state.status_message.is_none());
        assert_eq!(state.saved_records.as_ref().unwrap().len(), 1);

        state.set_page(Page::Students);
        let view = state.student_view.as_ref().unwrap();
        assert_eq!(view.filtered.len(), 1);
        assert_eq!(view.charts.len(), STUDENT_CHARTS.len());
    }

    #[test]
    fn deselecting_every_department_empties_the_view() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = TabularStore::open(dir.path().join("students.db")).unwrap();
            crate::data::loader::generate_and_persist(&mut store, DatasetKind::Students, 42).unwrap();
        }
        let mut state = state_in(dir.path(), Page::Students);
        assert_eq!(state.student_view.as_ref().unwrap().filtered.len(), 60);

        state.select_no_departments();
        let view = state.student_view.as_ref().unwrap();
        assert!(view.filtered.is_empty());
        assert!(!view.average_grade.value.is_defined());
        assert_eq!(view.total_students.delta.value(), Some(-60.0));

        state.select_all_departments();
        let csv_path = dir.path().join(export::FILTERED_EXPORT_NAME);
        state.export_filtered(&csv_path);
        let text = std::fs::read_to_string(csv_path).unwrap();
        assert_eq!(text.lines().count(), 61);
    }
}
