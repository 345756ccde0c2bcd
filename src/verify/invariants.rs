use crate::error::EngineError;
use crate::model::{AnalyticsRecord, Dataset, DatasetId, EquipmentTable, SummaryRecord};

#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub msg: String,
}

impl InvariantViolation {
    pub fn into_error(self, id: Option<DatasetId>) -> EngineError {
        EngineError::consistency(id, self.msg)
    }
}

pub fn assert_distribution_total(summary: &SummaryRecord) -> Result<(), InvariantViolation> {
    let total = summary.type_distribution.total();
    if total != summary.total_count {
        return Err(InvariantViolation {
            msg: format!(
                "type_distribution sums to {} but total_count is {}",
                total, summary.total_count
            ),
        });
    }
    Ok(())
}

/// The summary must describe this table: same row count, same type counts.
pub fn assert_summary_matches(table: &EquipmentTable, summary: &SummaryRecord) -> Result<(), InvariantViolation> {
    if table.len() as u64 != summary.total_count {
        return Err(InvariantViolation {
            msg: format!(
                "table has {} rows but summary total_count is {}",
                table.len(),
                summary.total_count
            ),
        });
    }
    assert_distribution_total(summary)?;
    for (label, count) in summary.type_distribution.iter() {
        let seen = table.iter().filter(|r| r.equipment_type == label).count() as u64;
        if seen != count {
            return Err(InvariantViolation {
                msg: format!("type '{}' counted {} in summary, {} in table", label, count, seen),
            });
        }
    }
    Ok(())
}

pub fn assert_dataset_pairing(ds: &Dataset) -> Result<(), EngineError> {
    assert_summary_matches(&ds.table, &ds.summary).map_err(|v| v.into_error(Some(ds.id)))
}

pub fn assert_trends_aligned(rec: &AnalyticsRecord, rows: usize) -> Result<(), InvariantViolation> {
    let trends = &rec.parameter_trends;
    if !trends.is_aligned() || trends.len() != rows {
        return Err(InvariantViolation {
            msg: format!(
                "trend lengths names={} flow={} pressure={} temp={} expected {}",
                trends.equipment_names.len(),
                trends.flowrates.len(),
                trends.pressures.len(),
                trends.temperatures.len(),
                rows
            ),
        });
    }
    Ok(())
}
