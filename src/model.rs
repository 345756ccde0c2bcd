//! Value types for uploaded equipment tables and everything derived from them.
//!
//! Derived records (summary, analytics, dashboard) are immutable once built.
//! Undefined statistics are `None` and serialize as JSON `null`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Identity
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub i64);

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Rows and tables
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl EquipmentRecord {
    pub fn new(
        name: impl Into<String>,
        equipment_type: impl Into<String>,
        flowrate: f64,
        pressure: f64,
        temperature: f64,
    ) -> Self {
        Self {
            name: name.into(),
            equipment_type: equipment_type.into(),
            flowrate,
            pressure,
            temperature,
        }
    }

    pub fn value(&self, param: Parameter) -> f64 {
        match param {
            Parameter::Flowrate => self.flowrate,
            Parameter::Pressure => self.pressure,
            Parameter::Temperature => self.temperature,
        }
    }
}

/// The three numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    Flowrate,
    Pressure,
    Temperature,
}

impl Parameter {
    pub const ALL: [Parameter; 3] = [Parameter::Flowrate, Parameter::Pressure, Parameter::Temperature];

    /// Column label in uploaded files.
    pub fn column(&self) -> &'static str {
        match self {
            Parameter::Flowrate => "Flowrate",
            Parameter::Pressure => "Pressure",
            Parameter::Temperature => "Temperature",
        }
    }
}

/// Rows in upload order. Order matters for trends, not for statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquipmentTable {
    records: Vec<EquipmentRecord>,
}

impl EquipmentTable {
    pub fn new(records: Vec<EquipmentRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EquipmentRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &EquipmentRecord> {
        self.records.iter()
    }

    pub fn column(&self, param: Parameter) -> Vec<f64> {
        self.records.iter().map(|r| r.value(param)).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.name.clone()).collect()
    }
}

impl FromIterator<EquipmentRecord> for EquipmentTable {
    fn from_iter<I: IntoIterator<Item = EquipmentRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// =============================================================================
// Type distribution
// =============================================================================

/// Label → count, iterated in first-seen order.
///
/// Serializes as a JSON object whose key order is the insertion order, so
/// report lines stay stable across a store round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDistribution {
    entries: Vec<(String, u64)>,
}

impl TypeDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: &str, count: u64) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, c)) => *c += count,
            None => self.entries.push((label.to_string(), count)),
        }
    }

    pub fn increment(&mut self, label: &str) {
        self.add(label, 1);
    }

    /// Sum counts per shared label; new labels append in `other`'s order.
    pub fn merge(&mut self, other: &TypeDistribution) {
        for (label, count) in other.iter() {
            self.add(label, count);
        }
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.entries.iter().find(|(l, _)| l == label).map(|(_, c)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(l, c)| (l.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| *c).sum()
    }

    /// Label with the highest count; ties go to the label seen first.
    pub fn most_common(&self) -> Option<&str> {
        let mut best: Option<(&str, u64)> = None;
        for (label, count) in self.iter() {
            match best {
                Some((_, c)) if count <= c => {}
                _ => best = Some((label, count)),
            }
        }
        best.map(|(l, _)| l)
    }
}

impl<'a> FromIterator<(&'a str, u64)> for TypeDistribution {
    fn from_iter<I: IntoIterator<Item = (&'a str, u64)>>(iter: I) -> Self {
        let mut dist = TypeDistribution::new();
        for (label, count) in iter {
            dist.add(label, count);
        }
        dist
    }
}

impl Serialize for TypeDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, count) in &self.entries {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TypeDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DistVisitor;

        impl<'de> Visitor<'de> for DistVisitor {
            type Value = TypeDistribution;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of type label to count")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut dist = TypeDistribution::new();
                while let Some((label, count)) = access.next_entry::<String, u64>()? {
                    dist.add(&label, count);
                }
                Ok(dist)
            }
        }

        deserializer.deserialize_map(DistVisitor)
    }
}

// =============================================================================
// Summary and datasets
// =============================================================================

/// Computed once at ingestion and stored beside its table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub total_count: u64,
    pub avg_flowrate: Option<f64>,
    pub avg_pressure: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub type_distribution: TypeDistribution,
}

impl SummaryRecord {
    pub fn average(&self, param: Parameter) -> Option<f64> {
        match param {
            Parameter::Flowrate => self.avg_flowrate,
            Parameter::Pressure => self.avg_pressure,
            Parameter::Temperature => self.avg_temperature,
        }
    }
}

/// A validated upload that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDataset {
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    pub fingerprint: String,
    pub table: EquipmentTable,
    pub summary: SummaryRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub owner: String,
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    pub fingerprint: String,
    pub table: EquipmentTable,
    pub summary: SummaryRecord,
}

impl Dataset {
    pub fn from_new(id: DatasetId, owner: &str, new: NewDataset) -> Self {
        Self {
            id,
            owner: owner.to_string(),
            name: new.name,
            uploaded_at: new.uploaded_at,
            fingerprint: new.fingerprint,
            table: new.table,
            summary: new.summary,
        }
    }
}

/// One row of a user's upload history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: DatasetId,
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    pub summary: SummaryRecord,
}

impl From<&Dataset> for HistoryEntry {
    fn from(ds: &Dataset) -> Self {
        Self {
            id: ds.id,
            name: ds.name.clone(),
            uploaded_at: ds.uploaded_at,
            summary: ds.summary.clone(),
        }
    }
}

// =============================================================================
// Analytics
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

/// Index-aligned projections of the source table, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterTrends {
    pub equipment_names: Vec<String>,
    pub flowrates: Vec<f64>,
    pub pressures: Vec<f64>,
    pub temperatures: Vec<f64>,
}

impl ParameterTrends {
    pub fn len(&self) -> usize {
        self.equipment_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equipment_names.is_empty()
    }

    pub fn is_aligned(&self) -> bool {
        let n = self.equipment_names.len();
        self.flowrates.len() == n && self.pressures.len() == n && self.temperatures.len() == n
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub flowrate_stats: ParameterStats,
    pub pressure_stats: ParameterStats,
    pub temperature_stats: ParameterStats,
}

impl Statistics {
    pub fn get(&self, param: Parameter) -> &ParameterStats {
        match param {
            Parameter::Flowrate => &self.flowrate_stats,
            Parameter::Pressure => &self.pressure_stats,
            Parameter::Temperature => &self.temperature_stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub type_distribution: TypeDistribution,
    pub parameter_trends: ParameterTrends,
    pub statistics: Statistics,
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub most_common_type: Option<String>,
    /// Heuristic: 100 minus flowrate dispersion, clamped to [0, 100].
    pub efficiency_score: Option<f64>,
    pub outlier_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRecord {
    pub dataset_count: usize,
    pub total_count: u64,
    pub avg_flowrate: Option<f64>,
    pub avg_pressure: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub type_distribution: TypeDistribution,
    pub insights: Insights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Dashboard {
    NoData,
    Ready(DashboardRecord),
}

impl Dashboard {
    pub fn record(&self) -> Option<&DashboardRecord> {
        match self {
            Dashboard::NoData => None,
            Dashboard::Ready(rec) => Some(rec),
        }
    }
}
