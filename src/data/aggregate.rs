use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::model::{Dataset, Value};
use crate::error::DataError;

// ---------------------------------------------------------------------------
// AggValue – a computed scalar or an explicit "undefined" marker
// ---------------------------------------------------------------------------

/// Result of one aggregate. `Undefined` marks an empty group, a column with
/// no variance, or any other statistic that cannot be computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggValue {
    Defined(f64),
    Undefined,
}

impl AggValue {
    fn from_option(v: Option<f64>) -> Self {
        match v {
            Some(v) if v.is_finite() => AggValue::Defined(v),
            _ => AggValue::Undefined,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            AggValue::Defined(v) => Some(v),
            AggValue::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, AggValue::Defined(_))
    }
}

/// Honors the formatter's precision (`{:.2}`) and sign (`{:+}`); undefined
/// renders as `n/a`.
impl fmt::Display for AggValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggValue::Defined(v) => match (f.precision(), f.sign_plus()) {
                (Some(p), true) => write!(f, "{v:+.p$}"),
                (Some(p), false) => write!(f, "{v:.p$}"),
                (None, true) => write!(f, "{v:+}"),
                (None, false) => write!(f, "{v}"),
            },
            AggValue::Undefined => write!(f, "n/a"),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate requests and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOp {
    Mean,
    Sum,
    /// Number of non-null values in the value column.
    Count,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateSpec {
    Group {
        op: GroupOp,
        group_by: String,
        value: String,
        /// Keys to report. When set, keys without rows still appear (as
        /// `Undefined`); when `None` the keys observed in the rows are used.
        domain: Option<BTreeSet<Value>>,
    },
    /// Pearson correlation over at least two numeric columns.
    Correlation { columns: Vec<String> },
    /// count / mean / std / min / quartiles / max for every numeric column.
    Describe,
}

impl AggregateSpec {
    pub fn group(op: GroupOp, group_by: &str, value: &str) -> Self {
        AggregateSpec::Group {
            op,
            group_by: group_by.to_string(),
            value: value.to_string(),
            domain: None,
        }
    }

    pub fn group_mean(group_by: &str, value: &str) -> Self {
        Self::group(GroupOp::Mean, group_by, value)
    }

    pub fn group_sum(group_by: &str, value: &str) -> Self {
        Self::group(GroupOp::Sum, group_by, value)
    }

    pub fn group_count(group_by: &str, value: &str) -> Self {
        Self::group(GroupOp::Count, group_by, value)
    }

    /// Report exactly these group keys.
    pub fn with_domain<I: IntoIterator<Item = Value>>(self, keys: I) -> Self {
        match self {
            AggregateSpec::Group {
                op,
                group_by,
                value,
                ..
            } => AggregateSpec::Group {
                op,
                group_by,
                value,
                domain: Some(keys.into_iter().collect()),
            },
            other => other,
        }
    }

    pub fn correlation<S: AsRef<str>>(columns: &[S]) -> Self {
        AggregateSpec::Correlation {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }
}

/// Group key → aggregate, sorted by group key.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedResult {
    pub op: GroupOp,
    pub group_by: String,
    pub value: String,
    pub groups: Vec<(Value, AggValue)>,
}

impl GroupedResult {
    pub fn get(&self, key: &Value) -> Option<AggValue> {
        self.groups
            .binary_search_by(|(k, _)| k.cmp(key))
            .ok()
            .map(|i| self.groups[i].1)
    }

    pub fn to_map(&self) -> BTreeMap<Value, AggValue> {
        self.groups.iter().cloned().collect()
    }
}

/// Square matrix of pairwise Pearson coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `values[i][j]` correlates `columns[i]` with `columns[j]`.
    pub values: Vec<Vec<AggValue>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<AggValue> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: AggValue,
    pub std: AggValue,
    pub min: AggValue,
    pub q25: AggValue,
    pub median: AggValue,
    pub q75: AggValue,
    pub max: AggValue,
}

impl ColumnSummary {
    pub const STAT_NAMES: [&'static str; 8] =
        ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

    /// Statistics in [`Self::STAT_NAMES`] order.
    pub fn stats(&self) -> [AggValue; 8] {
        [
            AggValue::Defined(self.count as f64),
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.median,
            self.q75,
            self.max,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub columns: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateResult {
    Grouped(GroupedResult),
    Correlation(CorrelationMatrix),
    Summary(Summary),
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Compute one aggregate over `dataset`. Pure; the result is a fresh value.
pub fn aggregate(dataset: &Dataset, spec: &AggregateSpec) -> Result<AggregateResult, DataError> {
    match spec {
        AggregateSpec::Group {
            op,
            group_by,
            value,
            domain,
        } => group_by_column(dataset, *op, group_by, value, domain.as_ref())
            .map(AggregateResult::Grouped),
        AggregateSpec::Correlation { columns } => {
            correlation_matrix(dataset, columns).map(AggregateResult::Correlation)
        }
        AggregateSpec::Describe => Ok(AggregateResult::Summary(describe(dataset))),
    }
}

pub fn group_by_column(
    dataset: &Dataset,
    op: GroupOp,
    group_by: &str,
    value: &str,
    domain: Option<&BTreeSet<Value>>,
) -> Result<GroupedResult, DataError> {
    let key_idx = dataset.schema().index_of(group_by)?;
    let value_idx = dataset.schema().index_of(value)?;
    let value_kind = dataset.schema().columns[value_idx].kind;
    if op != GroupOp::Count && !value_kind.is_numeric() {
        return Err(DataError::TypeMismatch {
            column: value.to_string(),
            expected: "a numeric column",
            actual: value_kind,
        });
    }

    // key → (non-null count, sum)
    let mut acc: BTreeMap<Value, (usize, f64)> = BTreeMap::new();
    if let Some(keys) = domain {
        for k in keys {
            acc.insert(k.clone(), (0, 0.0));
        }
    }
    for row in dataset.rows() {
        let key = &row[key_idx];
        if domain.is_some_and(|d| !d.contains(key)) {
            continue;
        }
        let entry = acc.entry(key.clone()).or_insert((0, 0.0));
        let cell = &row[value_idx];
        if cell.is_null() {
            continue;
        }
        entry.0 += 1;
        entry.1 += cell.as_f64().unwrap_or(0.0);
    }

    let groups = acc
        .into_iter()
        .map(|(key, (n, sum))| {
            let agg = if n == 0 {
                AggValue::Undefined
            } else {
                match op {
                    GroupOp::Mean => AggValue::from_option(Some(sum / n as f64)),
                    GroupOp::Sum => AggValue::from_option(Some(sum)),
                    GroupOp::Count => AggValue::Defined(n as f64),
                }
            };
            (key, agg)
        })
        .collect();

    Ok(GroupedResult {
        op,
        group_by: group_by.to_string(),
        value: value.to_string(),
        groups,
    })
}

pub fn correlation_matrix<S: AsRef<str>>(
    dataset: &Dataset,
    columns: &[S],
) -> Result<CorrelationMatrix, DataError> {
    if columns.len() < 2 {
        return Err(DataError::InvalidSpec(
            "correlation needs at least two columns".to_string(),
        ));
    }
    let series = columns
        .iter()
        .map(|c| dataset.numeric_column(c.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let n = series.len();
    let mut values = vec![vec![AggValue::Undefined; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&series[i], &series[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        values,
    })
}

/// Pearson's r over rows where both values are present.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> AggValue {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return AggValue::Undefined;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return AggValue::Undefined;
    }
    AggValue::from_option(Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)))
}

/// Descriptive statistics for every numeric column (primary key excluded).
pub fn describe(dataset: &Dataset) -> Summary {
    let columns = dataset
        .schema()
        .numeric_columns()
        .into_iter()
        .filter_map(|name| {
            let values = dataset.numeric_column(&name).ok()?;
            Some(summarize(&name, values.into_iter().flatten().collect()))
        })
        .collect();
    Summary { columns }
}

fn summarize(column: &str, mut values: Vec<f64>) -> ColumnSummary {
    values.sort_by(|a, b| a.total_cmp(b));
    let count = values.len();
    let mean = if count == 0 {
        None
    } else {
        Some(values.iter().sum::<f64>() / count as f64)
    };
    let std = match mean {
        Some(m) if count > 1 => {
            let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
            Some((ss / (count - 1) as f64).sqrt())
        }
        _ => None,
    };
    ColumnSummary {
        column: column.to_string(),
        count,
        mean: AggValue::from_option(mean),
        std: AggValue::from_option(std),
        min: AggValue::from_option(values.first().copied()),
        q25: AggValue::from_option(quantile(&values, 0.25)),
        median: AggValue::from_option(quantile(&values, 0.5)),
        q75: AggValue::from_option(quantile(&values, 0.75)),
        max: AggValue::from_option(values.last().copied()),
    }
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

// ---------------------------------------------------------------------------
// Key metrics and value counts
// ---------------------------------------------------------------------------

/// Mean of a numeric column over all rows, nulls ignored.
pub fn column_mean(dataset: &Dataset, column: &str) -> Result<AggValue, DataError> {
    let values: Vec<f64> = dataset.numeric_column(column)?.into_iter().flatten().collect();
    if values.is_empty() {
        return Ok(AggValue::Undefined);
    }
    Ok(AggValue::from_option(Some(
        values.iter().sum::<f64>() / values.len() as f64,
    )))
}

/// A headline number and its difference from the unfiltered dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyMetric {
    pub value: AggValue,
    pub delta: AggValue,
}

pub fn mean_metric(filtered: &Dataset, full: &Dataset, column: &str) -> Result<KeyMetric, DataError> {
    let value = column_mean(filtered, column)?;
    let baseline = column_mean(full, column)?;
    let delta = match (value, baseline) {
        (AggValue::Defined(v), AggValue::Defined(b)) => AggValue::Defined(v - b),
        _ => AggValue::Undefined,
    };
    Ok(KeyMetric { value, delta })
}

pub fn row_count_metric(filtered: &Dataset, full: &Dataset) -> KeyMetric {
    KeyMetric {
        value: AggValue::Defined(filtered.len() as f64),
        delta: AggValue::Defined(filtered.len() as f64 - full.len() as f64),
    }
}

/// Occurrences per distinct non-null value, most frequent first (ties by key).
pub fn value_counts(dataset: &Dataset, column: &str) -> Result<Vec<(Value, usize)>, DataError> {
    let mut counts: BTreeMap<Value, usize> = BTreeMap::new();
    for v in dataset.column(column)? {
        if !v.is_null() {
            *counts.entry(v.clone()).or_default() += 1;
        }
    }
    let mut out: Vec<(Value, usize)> = counts.into_iter().collect();
    // stable sort keeps key order within equal counts
    out.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(out)
}
