use std::collections::BTreeSet;

use super::model::{Dataset, Value};
use crate::error::DataError;

// ---------------------------------------------------------------------------
// Filter criteria: per-column constraints, combined with AND
// ---------------------------------------------------------------------------

/// A single per-column inclusion constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Keep a row iff its value is in `allowed`. An empty set keeps nothing.
    Membership {
        column: String,
        allowed: BTreeSet<Value>,
    },
    /// Keep a row iff `low <= value <= high`. An inverted range keeps nothing.
    Range { column: String, low: f64, high: f64 },
}

impl Constraint {
    pub fn column(&self) -> &str {
        match self {
            Constraint::Membership { column, .. } | Constraint::Range { column, .. } => column,
        }
    }
}

/// Conjunctive set of constraints supplied by the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub constraints: Vec<Constraint>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn with_membership<I>(mut self, column: &str, allowed: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.constraints.push(Constraint::Membership {
            column: column.to_string(),
            allowed: allowed.into_iter().collect(),
        });
        self
    }

    pub fn with_range(mut self, column: &str, low: f64, high: f64) -> Self {
        self.constraints.push(Constraint::Range {
            column: column.to_string(),
            low,
            high,
        });
        self
    }

    /// Membership constraints with every observed value selected (i.e., show everything).
    pub fn full_domain(dataset: &Dataset, columns: &[&str]) -> Self {
        let constraints = columns
            .iter()
            .filter_map(|col| {
                dataset.unique_values(col).map(|vals| Constraint::Membership {
                    column: col.to_string(),
                    allowed: vals.clone(),
                })
            })
            .collect();
        FilterCriteria { constraints }
    }
}

/// Observed `(min, max)` of a numeric column, ignoring nulls.
/// `None` when the column has no non-null values.
pub fn numeric_bounds(dataset: &Dataset, column: &str) -> Result<Option<(f64, f64)>, DataError> {
    let bounds = dataset
        .numeric_column(column)?
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        });
    Ok(bounds)
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// A constraint resolved against the schema: column position plus predicate.
enum Resolved<'a> {
    /// Nothing selected for this column → hide everything.
    Reject,
    /// Everything selected, no filtering needed.
    Pass,
    Membership(usize, &'a BTreeSet<Value>),
    Range(usize, f64, f64),
}

fn resolve<'a>(dataset: &Dataset, constraint: &'a Constraint) -> Result<Resolved<'a>, DataError> {
    let idx = dataset.schema().index_of(constraint.column())?;
    match constraint {
        Constraint::Membership { column, allowed } => {
            if allowed.is_empty() {
                return Ok(Resolved::Reject);
            }
            let covers_domain = dataset
                .unique_values(column)
                .is_some_and(|all_vals| all_vals.is_subset(allowed));
            if covers_domain {
                Ok(Resolved::Pass)
            } else {
                Ok(Resolved::Membership(idx, allowed))
            }
        }
        Constraint::Range { column, low, high } => {
            let kind = dataset.schema().columns[idx].kind;
            if !kind.is_numeric() {
                return Err(DataError::TypeMismatch {
                    column: column.clone(),
                    expected: "a numeric column",
                    actual: kind,
                });
            }
            if low > high || low.is_nan() || high.is_nan() {
                Ok(Resolved::Reject)
            } else {
                Ok(Resolved::Range(idx, *low, *high))
            }
        }
    }
}

/// Return indices of rows that pass all constraints, in input order.
///
/// A row passes a constraint when:
/// * membership: its value is in the selected set (an empty set fails every row)
/// * range: its value is numeric and `low <= value <= high` (nulls fail)
pub fn filtered_indices(dataset: &Dataset, criteria: &FilterCriteria) -> Result<Vec<usize>, DataError> {
    let resolved = criteria
        .constraints
        .iter()
        .map(|c| resolve(dataset, c))
        .collect::<Result<Vec<_>, _>>()?;

    let indices = dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            resolved.iter().all(|r| match r {
                Resolved::Reject => false,
                Resolved::Pass => true,
                Resolved::Membership(idx, allowed) => allowed.contains(&row[*idx]),
                Resolved::Range(idx, low, high) => row[*idx]
                    .as_f64()
                    .is_some_and(|v| *low <= v && v <= *high),
            })
        })
        .map(|(i, _)| i)
        .collect();
    Ok(indices)
}

/// Stable filter: the rows of `dataset` satisfying every constraint.
pub fn filter(dataset: &Dataset, criteria: &FilterCriteria) -> Result<Dataset, DataError> {
    if criteria.is_empty() {
        return Ok(dataset.clone());
    }
    let indices = filtered_indices(dataset, criteria)?;
    if indices.is_empty() {
        log::warn!("filter matched no rows ({} constraints)", criteria.constraints.len());
    }
    Ok(dataset.select_rows(&indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ColumnDef, ColumnType, Schema};

    fn students() -> Dataset {
        let schema = Schema::new(vec![
            ColumnDef::new("dept", ColumnType::Text),
            ColumnDef::new("grade", ColumnType::Float),
            ColumnDef::new("age", ColumnType::Integer),
        ]);
        let rows = vec![
            vec![Value::from("A"), Value::Float(3.0), Value::Integer(20)],
            vec![Value::from("B"), Value::Float(2.0), Value::Integer(22)],
            vec![Value::from("A"), Value::Float(4.0), Value::Integer(19)],
            vec![Value::from("C"), Value::Null, Value::Integer(25)],
            vec![Value::from("B"), Value::Float(3.5), Value::Integer(30)],
        ];
        Dataset::new(schema, rows).unwrap()
    }

    #[test]
    fn empty_criteria_is_identity() {
        let ds = students();
        assert_eq!(filter(&ds, &FilterCriteria::new()).unwrap(), ds);
    }

    #[test]
    fn membership_keeps_order() {
        let ds = students();
        let criteria = FilterCriteria::new().with_membership("dept", [Value::from("A"), Value::from("B")]);
        assert_eq!(filtered_indices(&ds, &criteria).unwrap(), vec![0, 1, 2, 4]);
    }

    #[test]
    fn full_domain_membership_is_a_noop() {
        let ds = students();
        let criteria = FilterCriteria::full_domain(&ds, &["dept"]);
        assert_eq!(filter(&ds, &criteria).unwrap(), ds);
    }

    #[test]
    fn selected_rows_carry_their_own_value_index() {
        let ds = students();
        let subset = ds.select_rows(&[0, 1]);
        let depts: Vec<Value> = subset.unique_values("dept").unwrap().iter().cloned().collect();
        assert_eq!(depts, vec![Value::from("A"), Value::from("B")]);

        let only_a = FilterCriteria::new().with_membership("dept", [Value::from("A")]);
        let kept = filter(&subset, &only_a).unwrap();
        assert_eq!(kept.rows(), &ds.rows()[..1]);

        let parent_domain = FilterCriteria::full_domain(&ds, &["dept"]);
        assert_eq!(filter(&subset, &parent_domain).unwrap(), subset);
    }

    #[test]
    fn empty_membership_matches_nothing() {
        let ds = students();
        let criteria = FilterCriteria::new().with_membership("dept", []);
        assert!(filter(&ds, &criteria).unwrap().is_empty());
    }

    #[test]
    fn range_is_inclusive_and_skips_nulls() {
        let ds = students();
        let criteria = FilterCriteria::new().with_range("grade", 2.0, 3.5);
        assert_eq!(filtered_indices(&ds, &criteria).unwrap(), vec![0, 1, 4]);
    }

    #[test]
    fn observed_bounds_keep_every_integer_row() {
        let ds = students();
        let (lo, hi) = numeric_bounds(&ds, "age").unwrap().unwrap();
        let criteria = FilterCriteria::new().with_range("age", lo, hi);
        assert_eq!(filter(&ds, &criteria).unwrap().len(), ds.len());
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let ds = students();
        let criteria = FilterCriteria::new().with_range("grade", 4.0, 1.0);
        assert!(filtered_indices(&ds, &criteria).unwrap().is_empty());
    }

    #[test]
    fn unknown_column_is_an_error() {
        let ds = students();
        let criteria = FilterCriteria::new().with_range("height", 0.0, 1.0);
        assert_eq!(
            filter(&ds, &criteria).unwrap_err(),
            DataError::UnknownColumn("height".into())
        );
    }

    #[test]
    fn range_over_text_is_a_type_mismatch() {
        let ds = students();
        let criteria = FilterCriteria::new().with_range("dept", 0.0, 1.0);
        assert!(matches!(
            filter(&ds, &criteria),
            Err(DataError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn adding_constraints_never_grows_the_result() {
        let ds = students();
        let one = FilterCriteria::new().with_membership("dept", [Value::from("A"), Value::from("B")]);
        let two = one.clone().with_range("grade", 3.0, 4.0);
        let n1 = filter(&ds, &one).unwrap().len();
        let n2 = filter(&ds, &two).unwrap().len();
        assert!(n2 <= n1);
        assert_eq!(n2, 3);
    }
}
