//! Compact per-upload summary: row count, parameter means, type counts.

use crate::model::{EquipmentTable, Parameter, SummaryRecord, TypeDistribution};
use crate::stats;

/// Reduce a validated table to its summary.
///
/// Means are `None` for an empty table; an empty upload still gets a
/// serializable summary.
pub fn summarize(table: &EquipmentTable) -> SummaryRecord {
    let mut type_distribution = TypeDistribution::new();
    for rec in table.iter() {
        type_distribution.increment(&rec.equipment_type);
    }

    let avg = |param: Parameter| stats::mean(&table.column(param));
    SummaryRecord {
        total_count: table.len() as u64,
        avg_flowrate: avg(Parameter::Flowrate),
        avg_pressure: avg(Parameter::Pressure),
        avg_temperature: avg(Parameter::Temperature),
        type_distribution,
    }
}
