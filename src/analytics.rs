//! Extended per-dataset analytics: parameter statistics and trend arrays.
//!
//! Means and the type distribution come from the stored summary, never from
//! a recount, so analytics cannot disagree with the summary they sit beside.

use crate::error::Result;
use crate::model::{AnalyticsRecord, Dataset, Parameter, ParameterStats, ParameterTrends, Statistics};
use crate::stats;
use crate::verify::invariants::{assert_dataset_pairing, assert_trends_aligned};

pub fn analyze(ds: &Dataset) -> Result<AnalyticsRecord> {
    assert_dataset_pairing(ds)?;

    let table = &ds.table;
    let parameter_trends = ParameterTrends {
        equipment_names: table.names(),
        flowrates: table.column(Parameter::Flowrate),
        pressures: table.column(Parameter::Pressure),
        temperatures: table.column(Parameter::Temperature),
    };

    let stats_for = |param: Parameter, values: &[f64]| {
        let mean = ds.summary.average(param);
        ParameterStats {
            min: stats::min(values),
            max: stats::max(values),
            mean,
            std: mean.and_then(|m| stats::sample_std_about(values, m)),
        }
    };
    let statistics = Statistics {
        flowrate_stats: stats_for(Parameter::Flowrate, &parameter_trends.flowrates),
        pressure_stats: stats_for(Parameter::Pressure, &parameter_trends.pressures),
        temperature_stats: stats_for(Parameter::Temperature, &parameter_trends.temperatures),
    };

    let record = AnalyticsRecord {
        type_distribution: ds.summary.type_distribution.clone(),
        parameter_trends,
        statistics,
    };
    assert_trends_aligned(&record, table.len()).map_err(|v| v.into_error(Some(ds.id)))?;
    Ok(record)
}
