use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use time::Date;
use time::macros::date;
use tracing::warn;

/// Addressable collections of a report, named as they are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    KeyFindings,
    Metrics,
    NevComparison,
    InfrastructureData,
    EnergyConsumption,
    PolicyRecommendations,
    ImplementationStatus,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::KeyFindings => "key_findings",
            Table::Metrics => "metrics",
            Table::NevComparison => "nev_comparison",
            Table::InfrastructureData => "infrastructure_data",
            Table::EnergyConsumption => "energy_consumption",
            Table::PolicyRecommendations => "policy_recommendations",
            Table::ImplementationStatus => "implementation_status",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('-', "_");
        let table = match norm.as_str() {
            "key_findings" | "findings" => Table::KeyFindings,
            "metrics" => Table::Metrics,
            "nev_comparison" => Table::NevComparison,
            "infrastructure_data" | "infrastructure" => Table::InfrastructureData,
            "energy_consumption" | "energy" => Table::EnergyConsumption,
            "policy_recommendations" | "recommendations" => Table::PolicyRecommendations,
            "implementation_status" | "implementation" => Table::ImplementationStatus,
            _ => {
                return Err(StoreError::UnknownTable {
                    name: s.to_string(),
                });
            }
        };
        Ok(table)
    }
}

/// One row kind. Each kind lives in exactly one collection of a report.
pub trait Record: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned {
    const TABLE: Table;

    /// Row appended by an "add new" action before the user edits it.
    fn placeholder() -> Self;

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Ordered rows addressed by position.
///
/// The revision counter only moves when content changes; it is neither
/// persisted nor part of equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordCollection<T> {
    items: Vec<T>,
    #[serde(skip)]
    revision: u64,
}

impl<T> Default for RecordCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            revision: 0,
        }
    }
}

impl<T: PartialEq> PartialEq for RecordCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Record> RecordCollection<T> {
    pub fn from_records(items: Vec<T>) -> Self {
        Self { items, revision: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn append(&mut self, record: T) -> StoreResult<()> {
        check(&record)?;
        self.items.push(record);
        self.revision += 1;
        Ok(())
    }

    /// Returns whether the row actually changed.
    pub fn update_at(&mut self, index: usize, record: T) -> StoreResult<bool> {
        let len = self.items.len();
        let slot = self.items.get_mut(index).ok_or(StoreError::OutOfRange {
            table: T::TABLE,
            index,
            len,
        })?;
        check(&record)?;
        if *slot == record {
            return Ok(false);
        }
        *slot = record;
        self.revision += 1;
        Ok(true)
    }

    pub fn remove_at(&mut self, index: usize) -> StoreResult<T> {
        if index >= self.items.len() {
            return Err(StoreError::OutOfRange {
                table: T::TABLE,
                index,
                len: self.items.len(),
            });
        }
        self.revision += 1;
        Ok(self.items.remove(index))
    }

    /// Swaps in a full revised table; nothing is applied if any row is invalid.
    pub fn replace_all(&mut self, records: Vec<T>) -> StoreResult<bool> {
        for r in &records {
            check(r)?;
        }
        if self.items == records {
            return Ok(false);
        }
        self.items = records;
        self.revision += 1;
        Ok(true)
    }
}

fn check<T: Record>(record: &T) -> StoreResult<()> {
    record.validate().map_err(|reason| StoreError::InvalidRecord {
        table: T::TABLE,
        reason,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Level {
    High,
    #[default]
    Medium,
    Low,
}

impl<'de> Deserialize<'de> for Level {
    /// Case-insensitive; anything unrecognised loads as `Medium`.
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = crate::lenient::string_value(d)?;
        let level = match raw.as_deref().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("high") => Level::High,
            Some("medium") => Level::Medium,
            Some("low") => Level::Low,
            _ => {
                warn!("unknown level {raw:?}; using Medium");
                Level::Medium
            }
        };
        Ok(level)
    }
}

/// Row structs load missing fields from their placeholder.
macro_rules! default_from_placeholder {
    ($($ty:ty),+ $(,)?) => {
        $(impl Default for $ty {
            fn default() -> Self {
                <$ty as Record>::placeholder()
            }
        })+
    };
}

default_from_placeholder!(
    Metric,
    VehicleComparison,
    InfrastructureRow,
    EnergySample,
    PolicyRecommendation,
    ImplementationItem,
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    #[serde(deserialize_with = "crate::lenient::text")]
    pub label: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub value: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub trend: String,
}

impl Record for Metric {
    const TABLE: Table = Table::Metrics;

    fn placeholder() -> Self {
        Self {
            label: "New Metric".into(),
            value: "0".into(),
            trend: "+0%".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleComparison {
    #[serde(deserialize_with = "crate::lenient::text")]
    pub vehicle_type: String,
    #[serde(deserialize_with = "crate::lenient::number")]
    pub energy_efficiency: f64,
    #[serde(deserialize_with = "crate::lenient::number")]
    pub carbon_reduction: f64,
    #[serde(deserialize_with = "crate::lenient::number")]
    pub cost_effectiveness: f64,
}

impl Record for VehicleComparison {
    const TABLE: Table = Table::NevComparison;

    fn placeholder() -> Self {
        Self {
            vehicle_type: "New Vehicle Type".into(),
            energy_efficiency: 0.0,
            carbon_reduction: 0.0,
            cost_effectiveness: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfrastructureRow {
    #[serde(deserialize_with = "crate::lenient::text")]
    pub infrastructure_type: String,
    #[serde(deserialize_with = "crate::lenient::number")]
    pub current: f64,
    #[serde(deserialize_with = "crate::lenient::number")]
    pub required: f64,
    /// Billions of HKD.
    #[serde(deserialize_with = "crate::lenient::number")]
    pub investment_hkd: f64,
}

impl Record for InfrastructureRow {
    const TABLE: Table = Table::InfrastructureData;

    fn placeholder() -> Self {
        Self {
            infrastructure_type: "New Infrastructure".into(),
            current: 0.0,
            required: 0.0,
            investment_hkd: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergySample {
    #[serde(deserialize_with = "crate::lenient::text")]
    pub month: String,
    #[serde(deserialize_with = "crate::lenient::number")]
    pub ev_consumption: f64,
    #[serde(deserialize_with = "crate::lenient::number")]
    pub hfcv_consumption: f64,
    #[serde(deserialize_with = "crate::lenient::number")]
    pub ice_consumption: f64,
}

impl Record for EnergySample {
    const TABLE: Table = Table::EnergyConsumption;

    fn placeholder() -> Self {
        Self {
            month: "New".into(),
            ev_consumption: 0.0,
            hfcv_consumption: 0.0,
            ice_consumption: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRecommendation {
    #[serde(deserialize_with = "crate::lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub description: String,
    pub priority: Level,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub timeline: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub budget: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub expected_impact: String,
}

impl Record for PolicyRecommendation {
    const TABLE: Table = Table::PolicyRecommendations;

    fn placeholder() -> Self {
        Self {
            title: "New Recommendation".into(),
            description: "Recommendation description".into(),
            priority: Level::Medium,
            timeline: "6 months".into(),
            budget: "HK$100 million".into(),
            expected_impact: "Expected impact description".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImplementationItem {
    #[serde(deserialize_with = "crate::lenient::text")]
    pub policy: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub status: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub budget: String,
    pub impact: Level,
    /// Percent, 0..=100. Stored values outside the range are clamped on load.
    #[serde(deserialize_with = "crate::lenient::percent")]
    pub completion: u8,
    #[serde(with = "crate::util::date_serde")]
    pub target_date: Date,
}

impl Record for ImplementationItem {
    const TABLE: Table = Table::ImplementationStatus;

    fn placeholder() -> Self {
        Self {
            policy: "New Policy".into(),
            status: "Planning".into(),
            budget: "HK$100 million".into(),
            impact: Level::Medium,
            completion: 0,
            target_date: date!(2025 - 12 - 31),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.completion > 100 {
            return Err(format!("completion {} exceeds 100", self.completion));
        }
        Ok(())
    }
}
