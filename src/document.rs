use crate::error::{StoreError, StoreResult};
use crate::images::ImageCatalog;
use crate::records::{
    EnergySample, ImplementationItem, InfrastructureRow, Metric, PolicyRecommendation, Record,
    RecordCollection, Table, VehicleComparison,
};
use crate::util::{now_timestamp, today};
use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    #[serde(deserialize_with = "crate::lenient::text")]
    pub content: String,
    #[serde(deserialize_with = "crate::lenient::text_list")]
    pub key_findings: Vec<String>,
}

/// One research report.
///
/// Scalar setters compare before writing; only a real change refreshes
/// `last_modified` and advances the in-memory revision the store watches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportDocument {
    /// Key of the owning store map; not repeated inside the stored document.
    #[serde(skip)]
    pub(crate) id: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    title: String,
    #[serde(with = "crate::util::date_serde")]
    created_date: Date,
    #[serde(with = "crate::util::timestamp_serde")]
    last_modified: PrimitiveDateTime,
    summary: Summary,
    metrics: RecordCollection<Metric>,
    nev_comparison: RecordCollection<VehicleComparison>,
    infrastructure_data: RecordCollection<InfrastructureRow>,
    energy_consumption: RecordCollection<EnergySample>,
    policy_recommendations: RecordCollection<PolicyRecommendation>,
    implementation_status: RecordCollection<ImplementationItem>,
    images: ImageCatalog,
    #[serde(skip)]
    revision: u64,
}

impl Default for ReportDocument {
    fn default() -> Self {
        Self::new("Untitled Report")
    }
}

impl PartialEq for ReportDocument {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.created_date == other.created_date
            && self.last_modified == other.last_modified
            && self.summary == other.summary
            && self.metrics == other.metrics
            && self.nev_comparison == other.nev_comparison
            && self.infrastructure_data == other.infrastructure_data
            && self.energy_consumption == other.energy_consumption
            && self.policy_recommendations == other.policy_recommendations
            && self.implementation_status == other.implementation_status
            && self.images == other.images
    }
}

/// Binds a row kind to the collection that holds it.
pub trait Section: Record {
    fn collection(doc: &ReportDocument) -> &RecordCollection<Self>;
    fn collection_mut(doc: &mut ReportDocument) -> &mut RecordCollection<Self>;
}

impl Section for Metric {
    fn collection(doc: &ReportDocument) -> &RecordCollection<Self> {
        &doc.metrics
    }
    fn collection_mut(doc: &mut ReportDocument) -> &mut RecordCollection<Self> {
        &mut doc.metrics
    }
}

impl Section for VehicleComparison {
    fn collection(doc: &ReportDocument) -> &RecordCollection<Self> {
        &doc.nev_comparison
    }
    fn collection_mut(doc: &mut ReportDocument) -> &mut RecordCollection<Self> {
        &mut doc.nev_comparison
    }
}

impl Section for InfrastructureRow {
    fn collection(doc: &ReportDocument) -> &RecordCollection<Self> {
        &doc.infrastructure_data
    }
    fn collection_mut(doc: &mut ReportDocument) -> &mut RecordCollection<Self> {
        &mut doc.infrastructure_data
    }
}

impl Section for EnergySample {
    fn collection(doc: &ReportDocument) -> &RecordCollection<Self> {
        &doc.energy_consumption
    }
    fn collection_mut(doc: &mut ReportDocument) -> &mut RecordCollection<Self> {
        &mut doc.energy_consumption
    }
}

impl Section for PolicyRecommendation {
    fn collection(doc: &ReportDocument) -> &RecordCollection<Self> {
        &doc.policy_recommendations
    }
    fn collection_mut(doc: &mut ReportDocument) -> &mut RecordCollection<Self> {
        &mut doc.policy_recommendations
    }
}

impl Section for ImplementationItem {
    fn collection(doc: &ReportDocument) -> &RecordCollection<Self> {
        &doc.implementation_status
    }
    fn collection_mut(doc: &mut ReportDocument) -> &mut RecordCollection<Self> {
        &mut doc.implementation_status
    }
}

impl ReportDocument {
    /// An empty document created today.
    pub fn new(title: &str) -> Self {
        Self {
            id: String::new(),
            title: title.to_string(),
            created_date: today(),
            last_modified: now_timestamp(),
            summary: Summary::default(),
            metrics: RecordCollection::default(),
            nev_comparison: RecordCollection::default(),
            infrastructure_data: RecordCollection::default(),
            energy_consumption: RecordCollection::default(),
            policy_recommendations: RecordCollection::default(),
            implementation_status: RecordCollection::default(),
            images: ImageCatalog::default(),
            revision: 0,
        }
    }

    pub fn with_summary(mut self, summary: Summary) -> Self {
        self.summary = summary;
        self
    }

    /// Seeds a collection without validation; meant for building templates.
    pub fn with_records<T: Section>(mut self, rows: Vec<T>) -> Self {
        *T::collection_mut(&mut self) = RecordCollection::from_records(rows);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_date(&self) -> Date {
        self.created_date
    }

    pub fn last_modified(&self) -> PrimitiveDateTime {
        self.last_modified
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn images(&self) -> &ImageCatalog {
        &self.images
    }

    pub fn records<T: Section>(&self) -> &RecordCollection<T> {
        T::collection(self)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.last_modified = now_timestamp();
        self.revision += 1;
    }

    pub fn set_title(&mut self, title: &str) -> bool {
        if self.title == title {
            return false;
        }
        self.title = title.to_string();
        self.touch();
        true
    }

    pub fn set_summary_content(&mut self, content: &str) -> bool {
        if self.summary.content == content {
            return false;
        }
        self.summary.content = content.to_string();
        self.touch();
        true
    }

    pub fn add_finding(&mut self, finding: &str) {
        self.summary.key_findings.push(finding.to_string());
        self.touch();
    }

    pub fn update_finding(&mut self, index: usize, finding: &str) -> StoreResult<bool> {
        let len = self.summary.key_findings.len();
        let slot = self
            .summary
            .key_findings
            .get_mut(index)
            .ok_or(StoreError::OutOfRange {
                table: Table::KeyFindings,
                index,
                len,
            })?;
        if slot.as_str() == finding {
            return Ok(false);
        }
        *slot = finding.to_string();
        self.touch();
        Ok(true)
    }

    pub fn remove_finding(&mut self, index: usize) -> StoreResult<String> {
        let len = self.summary.key_findings.len();
        if index >= len {
            return Err(StoreError::OutOfRange {
                table: Table::KeyFindings,
                index,
                len,
            });
        }
        let removed = self.summary.key_findings.remove(index);
        self.touch();
        Ok(removed)
    }

    /// Runs `f` on one collection; a successful change refreshes `last_modified`.
    pub fn edit_records<T, R, F>(&mut self, f: F) -> StoreResult<R>
    where
        T: Section,
        F: FnOnce(&mut RecordCollection<T>) -> StoreResult<R>,
    {
        let coll = T::collection_mut(self);
        let before = coll.revision();
        let out = f(coll)?;
        let changed = coll.revision() != before;
        if changed {
            self.touch();
        }
        Ok(out)
    }

    pub fn edit_images<R, F>(&mut self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut ImageCatalog) -> StoreResult<R>,
    {
        let before = self.images.revision();
        let out = f(&mut self.images)?;
        if self.images.revision() != before {
            self.touch();
        }
        Ok(out)
    }
}
