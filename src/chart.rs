use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::data::aggregate::{
    correlation_matrix, group_by_column, value_counts, AggValue, CorrelationMatrix, GroupOp,
};
use crate::data::model::{Dataset, Value};
use crate::error::DataError;

// ---------------------------------------------------------------------------
// ChartKind – the closed set of presentations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Bar,
    Pie,
    Histogram,
    Line,
    Scatter,
    Heatmap,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Bar,
        ChartKind::Pie,
        ChartKind::Histogram,
        ChartKind::Line,
        ChartKind::Scatter,
        ChartKind::Heatmap,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar Chart",
            ChartKind::Pie => "Pie Chart",
            ChartKind::Histogram => "Histogram",
            ChartKind::Line => "Line Chart",
            ChartKind::Scatter => "Scatter Plot",
            ChartKind::Heatmap => "Heatmap",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts the UI labels ("Bar Chart") and short names ("bar").
impl FromStr for ChartKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let kind = match normalized.as_str() {
            "bar" | "bar chart" => ChartKind::Bar,
            "pie" | "pie chart" => ChartKind::Pie,
            "histogram" => ChartKind::Histogram,
            "line" | "line chart" => ChartKind::Line,
            "scatter" | "scatter plot" | "scatter chart" => ChartKind::Scatter,
            "heatmap" | "correlation heatmap" => ChartKind::Heatmap,
            _ => return Err(DataError::UnsupportedChart(s.to_string())),
        };
        Ok(kind)
    }
}

// ---------------------------------------------------------------------------
// Chart configuration per page
// ---------------------------------------------------------------------------

/// Which columns feed each chart kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    /// Grouping column for bar / pie, and colour groups for scatter.
    pub category: Option<String>,
    /// Value column for bar (mean) and histogram.
    pub value: Option<String>,
    /// Summed per category in the pie chart; `None` counts rows instead.
    pub pie_value: Option<String>,
    pub scatter: Option<(String, String)>,
    /// Splits histogram counts by this column; `None` draws one series.
    pub histogram_color: Option<String>,
    pub line_columns: Vec<String>,
    pub correlation_columns: Vec<String>,
    pub bins: usize,
}

impl ChartConfig {
    pub fn sales(bins: usize) -> Self {
        ChartConfig {
            category: Some("Category".into()),
            value: Some("Sales".into()),
            pie_value: Some("Sales".into()),
            scatter: Some(("Sales".into(), "Rating".into())),
            histogram_color: None,
            line_columns: vec!["Sales".into(), "Rating".into()],
            correlation_columns: vec!["Sales".into(), "Rating".into()],
            bins,
        }
    }

    pub fn practice() -> Self {
        ChartConfig {
            category: Some("Fruit".into()),
            value: Some("Price".into()),
            pie_value: Some("Price".into()),
            scatter: Some(("Quantity".into(), "Price".into())),
            histogram_color: None,
            line_columns: vec!["Quantity".into(), "Price".into()],
            correlation_columns: vec!["Quantity".into(), "Price".into()],
            bins: 10,
        }
    }

    pub fn students(bins: usize, correlation_columns: Vec<String>) -> Self {
        ChartConfig {
            category: Some("department".into()),
            value: Some("grade".into()),
            pie_value: None,
            scatter: Some(("attendance".into(), "grade".into())),
            histogram_color: Some("department".into()),
            line_columns: vec!["grade".into(), "attendance".into()],
            correlation_columns,
            bins,
        }
    }

    fn require<'a>(field: &'a Option<String>, what: &str) -> Result<&'a str, DataError> {
        field
            .as_deref()
            .ok_or_else(|| DataError::InvalidSpec(format!("chart needs a {what} column")))
    }
}

// ---------------------------------------------------------------------------
// Prepared chart data (renderer input)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Per-bin counts for one category, aligned with the histogram's bins.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramGroup {
    pub name: String,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Bars {
        title: String,
        x_label: String,
        y_label: String,
        bars: Vec<(String, AggValue)>,
    },
    Pie {
        title: String,
        slices: Vec<(String, f64)>,
    },
    Histogram {
        title: String,
        x_label: String,
        bins: Vec<HistogramBin>,
        /// Stacked per-category counts; empty when the histogram is not split.
        groups: Vec<HistogramGroup>,
    },
    Lines {
        title: String,
        series: Vec<Series>,
    },
    Scatter {
        title: String,
        x_label: String,
        y_label: String,
        groups: Vec<Series>,
        /// Least-squares `(slope, intercept)` over all points.
        trend: Option<(f64, f64)>,
    },
    Heatmap {
        title: String,
        matrix: CorrelationMatrix,
    },
}

impl ChartData {
    pub fn title(&self) -> &str {
        match self {
            ChartData::Bars { title, .. }
            | ChartData::Pie { title, .. }
            | ChartData::Histogram { title, .. }
            | ChartData::Lines { title, .. }
            | ChartData::Scatter { title, .. }
            | ChartData::Heatmap { title, .. } => title,
        }
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Bars { bars, .. } => bars.is_empty(),
            ChartData::Pie { slices, .. } => slices.is_empty(),
            ChartData::Histogram { bins, .. } => bins.is_empty(),
            ChartData::Lines { series, .. } => series.iter().all(|s| s.points.is_empty()),
            ChartData::Scatter { groups, .. } => groups.iter().all(|s| s.points.is_empty()),
            ChartData::Heatmap { matrix, .. } => matrix.columns.is_empty(),
        }
    }
}

/// Build the renderer input for `kind`; each kind maps to one preparation.
pub fn prepare(kind: ChartKind, dataset: &Dataset, config: &ChartConfig) -> Result<ChartData, DataError> {
    match kind {
        ChartKind::Bar => prepare_bar(dataset, config),
        ChartKind::Pie => prepare_pie(dataset, config),
        ChartKind::Histogram => prepare_histogram(dataset, config),
        ChartKind::Line => prepare_lines(dataset, config),
        ChartKind::Scatter => prepare_scatter(dataset, config),
        ChartKind::Heatmap => prepare_heatmap(dataset, config),
    }
}

fn prepare_bar(dataset: &Dataset, config: &ChartConfig) -> Result<ChartData, DataError> {
    let category = ChartConfig::require(&config.category, "category")?;
    let value = ChartConfig::require(&config.value, "value")?;
    let grouped = group_by_column(dataset, GroupOp::Mean, category, value, None)?;
    Ok(ChartData::Bars {
        title: format!("Average {value} by {category}"),
        x_label: category.to_string(),
        y_label: value.to_string(),
        bars: grouped
            .groups
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    })
}

fn prepare_pie(dataset: &Dataset, config: &ChartConfig) -> Result<ChartData, DataError> {
    let category = ChartConfig::require(&config.category, "category")?;
    match config.pie_value.as_deref() {
        Some(value) => {
            let grouped = group_by_column(dataset, GroupOp::Sum, category, value, None)?;
            Ok(ChartData::Pie {
                title: format!("{value} Distribution by {category}"),
                slices: grouped
                    .groups
                    .into_iter()
                    .filter_map(|(k, v)| Some((k.to_string(), v.value()?)))
                    .collect(),
            })
        }
        None => {
            let counts = value_counts(dataset, category)?;
            Ok(ChartData::Pie {
                title: format!("Rows by {category}"),
                slices: counts
                    .into_iter()
                    .map(|(k, n)| (k.to_string(), n as f64))
                    .collect(),
            })
        }
    }
}

/// Equal-width bins over the observed range; the maximum falls in the last bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        return vec![HistogramBin {
            start: min - 0.5,
            end: max + 0.5,
            count: finite.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in finite {
        if let Some(idx) = bin_index(&out, v) {
            out[idx].count += 1;
        }
    }
    out
}

/// Bin holding `v`, clamped to the outer bins. `None` for non-finite values.
fn bin_index(bins: &[HistogramBin], v: f64) -> Option<usize> {
    let first = bins.first()?;
    if !v.is_finite() {
        return None;
    }
    let width = first.end - first.start;
    let idx = ((v - first.start) / width).floor().max(0.0) as usize;
    Some(idx.min(bins.len() - 1))
}

fn prepare_histogram(dataset: &Dataset, config: &ChartConfig) -> Result<ChartData, DataError> {
    let value = ChartConfig::require(&config.value, "value")?;
    let cells = dataset.numeric_column(value)?;
    let values: Vec<f64> = cells.iter().flatten().copied().collect();
    let bins = histogram(&values, config.bins);

    let mut groups: Vec<HistogramGroup> = Vec::new();
    if let Some(color) = config.histogram_color.as_deref() {
        let mut counts: BTreeMap<&Value, Vec<usize>> = BTreeMap::new();
        for (key, cell) in dataset.column(color)?.zip(&cells) {
            let Some(idx) = cell.and_then(|v| bin_index(&bins, v)) else {
                continue;
            };
            counts.entry(key).or_insert_with(|| vec![0; bins.len()])[idx] += 1;
        }
        groups = counts
            .into_iter()
            .map(|(key, counts)| HistogramGroup {
                name: key.to_string(),
                counts,
            })
            .collect();
    }

    let title = match config.histogram_color.as_deref() {
        Some(color) => format!("Distribution of {value} by {color}"),
        None => format!("Distribution of {value}"),
    };
    Ok(ChartData::Histogram {
        title,
        x_label: value.to_string(),
        bins,
        groups,
    })
}

fn prepare_lines(dataset: &Dataset, config: &ChartConfig) -> Result<ChartData, DataError> {
    let series = config
        .line_columns
        .iter()
        .map(|col| {
            let points = dataset
                .numeric_column(col)?
                .into_iter()
                .enumerate()
                .filter_map(|(i, v)| Some([i as f64, v?]))
                .collect();
            Ok::<_, DataError>(Series {
                name: col.clone(),
                points,
            })
        })
        .collect::<Result<Vec<_>, DataError>>()?;
    Ok(ChartData::Lines {
        title: format!("{} Over Rows", config.line_columns.join(" and ")),
        series,
    })
}

/// Ordinary least squares fit `y = slope * x + intercept`.
pub fn ols_fit(points: &[[f64; 2]]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p[0] - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points.iter().map(|p| (p[0] - mean_x) * (p[1] - mean_y)).sum();
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

fn prepare_scatter(dataset: &Dataset, config: &ChartConfig) -> Result<ChartData, DataError> {
    let (x_col, y_col) = config
        .scatter
        .as_ref()
        .ok_or_else(|| DataError::InvalidSpec("chart needs x and y columns".to_string()))?;
    let xs = dataset.numeric_column(x_col)?;
    let ys = dataset.numeric_column(y_col)?;
    let labels: Vec<Value> = match config.category.as_deref() {
        Some(cat) => dataset.column(cat)?.cloned().collect(),
        None => vec![Value::Null; dataset.len()],
    };

    // group order follows first appearance
    let mut groups: Vec<Series> = Vec::new();
    let mut all_points = Vec::new();
    for ((x, y), label) in xs.into_iter().zip(ys).zip(labels) {
        let (Some(x), Some(y)) = (x, y) else {
            continue;
        };
        let name = if label.is_null() {
            y_col.clone()
        } else {
            label.to_string()
        };
        match groups.iter_mut().find(|s| s.name == name) {
            Some(series) => series.points.push([x, y]),
            None => groups.push(Series {
                name,
                points: vec![[x, y]],
            }),
        }
        all_points.push([x, y]);
    }

    Ok(ChartData::Scatter {
        title: format!("{x_col} vs {y_col}"),
        x_label: x_col.clone(),
        y_label: y_col.clone(),
        trend: ols_fit(&all_points),
        groups,
    })
}

fn prepare_heatmap(dataset: &Dataset, config: &ChartConfig) -> Result<ChartData, DataError> {
    Ok(ChartData::Heatmap {
        title: "Correlation Heatmap".to_string(),
        matrix: correlation_matrix(dataset, &config.correlation_columns)?,
    })
}
