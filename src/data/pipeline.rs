use super::aggregate::{aggregate, AggregateResult, AggregateSpec};
use super::filter::{filter, FilterCriteria};
use super::model::Dataset;
use crate::error::DataError;

/// Everything one dashboard refresh needs: the filtered rows (shown as a
/// table) and the aggregates computed over them, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub filtered: Dataset,
    pub aggregates: Vec<AggregateResult>,
}

/// Filter then aggregate, from scratch. Nothing is retained between runs.
pub fn run(
    dataset: &Dataset,
    criteria: &FilterCriteria,
    specs: &[AggregateSpec],
) -> Result<PipelineOutput, DataError> {
    let filtered = filter(dataset, criteria)?;
    let aggregates = specs
        .iter()
        .map(|spec| aggregate(&filtered, spec))
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!(
        "pipeline: {} of {} rows kept, {} aggregates",
        filtered.len(),
        dataset.len(),
        aggregates.len()
    );
    Ok(PipelineOutput {
        filtered,
        aggregates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::AggValue;
    use crate::data::loader::DatasetKind;

    #[test]
    fn filtered_out_department_reports_undefined_mean() {
        let ds = DatasetKind::Students.generate(42).unwrap();
        let all_depts = ds.unique_values("department").unwrap().clone();
        let chosen = ds.column("department").unwrap().next().unwrap().clone();
        let criteria = FilterCriteria::new().with_membership("department", [chosen.clone()]);
        let spec = AggregateSpec::group_mean("department", "grade").with_domain(all_depts.clone());

        let out = run(&ds, &criteria, &[spec]).unwrap();
        let AggregateResult::Grouped(g) = &out.aggregates[0] else {
            panic!("expected grouped result");
        };
        assert_eq!(g.groups.len(), all_depts.len());
        for (dept, mean) in &g.groups {
            if *dept == chosen {
                assert!(mean.is_defined());
            } else {
                assert_eq!(*mean, AggValue::Undefined);
            }
        }
    }

    #[test]
    fn bad_spec_aborts_the_run() {
        let ds = DatasetKind::Sales.generate(42).unwrap();
        let err = run(
            &ds,
            &FilterCriteria::new(),
            &[AggregateSpec::correlation(&["Sales", "Product"])],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::TypeMismatch { .. }));
    }
}
