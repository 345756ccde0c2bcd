//! Cross-dataset overview for one user's retained history.
//!
//! Derived fresh on each call; the retained set changes with every upload.

use crate::model::{Dashboard, DashboardRecord, Dataset, Insights, Parameter, TypeDistribution};
use crate::stats;

/// Rows further than this many population deviations from the mean count as outliers.
pub const OUTLIER_SIGMA: f64 = 2.0;

pub const EFFICIENCY_CEILING: f64 = 100.0;

/// Aggregate `datasets` in the order given (newest first from the store).
pub fn aggregate(datasets: &[Dataset]) -> Dashboard {
    if datasets.is_empty() {
        return Dashboard::NoData;
    }

    let mut type_distribution = TypeDistribution::new();
    let mut total_count = 0u64;
    let mut flowrates = Vec::new();
    let mut pressures = Vec::new();
    let mut temperatures = Vec::new();
    for ds in datasets {
        total_count += ds.summary.total_count;
        type_distribution.merge(&ds.summary.type_distribution);
        flowrates.extend(ds.table.iter().map(|r| r.value(Parameter::Flowrate)));
        pressures.extend(ds.table.iter().map(|r| r.value(Parameter::Pressure)));
        temperatures.extend(ds.table.iter().map(|r| r.value(Parameter::Temperature)));
    }

    let insights = Insights {
        most_common_type: type_distribution.most_common().map(str::to_string),
        efficiency_score: efficiency_score(&flowrates),
        outlier_count: stats::count_beyond_sigma(&flowrates, OUTLIER_SIGMA),
    };

    Dashboard::Ready(DashboardRecord {
        dataset_count: datasets.len(),
        total_count,
        avg_flowrate: stats::mean(&flowrates),
        avg_pressure: stats::mean(&pressures),
        avg_temperature: stats::mean(&temperatures),
        type_distribution,
        insights,
    })
}

/// `clamp(100 - σ(flowrate), 0, 100)` with population σ.
///
/// A dashboard heuristic: lower flowrate dispersion reads as "more
/// efficient". It is not a physical efficiency.
pub fn efficiency_score(flowrates: &[f64]) -> Option<f64> {
    stats::population_std(flowrates).map(|sd| (EFFICIENCY_CEILING - sd).clamp(0.0, EFFICIENCY_CEILING))
}
