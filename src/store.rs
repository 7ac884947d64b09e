use crate::document::ReportDocument;
use crate::error::{StoreError, StoreResult};
use crate::export::{ArchiveEntry, ImageArchive};
use crate::storage::Storage;
use crate::template::create_default_report;
use crate::util::sha256_hex;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Nothing persisted yet.
    Fresh,
    Loaded { reports: usize },
    /// Some reports could not be read and were left out.
    Partial { reports: usize, skipped: Vec<String> },
    /// Storage was unreadable or corrupt; treated as no prior state.
    Recovered { reason: String },
}

/// All reports plus the current selection, persisted as one blob.
///
/// Every mutation that changes a document rewrites the whole store. Reports
/// keep insertion order, which is also their display order.
pub struct ReportStore<S: Storage> {
    reports: IndexMap<String, ReportDocument>,
    selected: Option<String>,
    storage: S,
    skip_unchanged_writes: bool,
    last_digest: Option<String>,
    /// Set when load dropped stored data; the next write keeps a copy first.
    preserve_pending: bool,
}

impl<S: Storage> ReportStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            reports: IndexMap::new(),
            selected: None,
            storage,
            skip_unchanged_writes: true,
            last_digest: None,
            preserve_pending: false,
        }
    }

    /// `new` followed by `load`.
    pub fn open(storage: S) -> Self {
        let mut store = Self::new(storage);
        store.load();
        store
    }

    pub fn skip_unchanged_writes(mut self, skip: bool) -> Self {
        self.skip_unchanged_writes = skip;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.reports.keys().map(String::as_str)
    }

    pub fn reports(&self) -> impl Iterator<Item = &ReportDocument> {
        self.reports.values()
    }

    pub fn get(&self, id: &str) -> Option<&ReportDocument> {
        self.reports.get(id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&ReportDocument> {
        self.selected.as_deref().and_then(|id| self.reports.get(id))
    }

    /// Replaces in-memory state with what storage holds. Never fails: an
    /// unreadable blob leaves an empty store and an unreadable report is left
    /// out. Either way the stored text is preserved before the next write.
    pub fn load(&mut self) -> LoadOutcome {
        let location = self.storage.describe();
        let previous = self.selected.take();
        self.reports.clear();
        self.last_digest = None;
        self.preserve_pending = false;

        let raw = match self.storage.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("no stored reports at {location}; starting empty");
                return LoadOutcome::Fresh;
            }
            Err(err) => {
                warn!("{err}; starting empty");
                self.preserve_pending = true;
                return LoadOutcome::Recovered {
                    reason: err.to_string(),
                };
            }
        };

        let stored: IndexMap<String, Value> = match serde_json::from_str(&raw) {
            Ok(r) => r,
            Err(err) => {
                warn!("stored reports at {location} are unreadable: {err}; starting empty");
                self.preserve_pending = true;
                return LoadOutcome::Recovered {
                    reason: err.to_string(),
                };
            }
        };
        let mut reports = IndexMap::with_capacity(stored.len());
        let mut skipped = Vec::new();
        for (id, value) in stored {
            match serde_json::from_value::<ReportDocument>(value) {
                Ok(mut doc) => {
                    doc.id = id.clone();
                    reports.insert(id, doc);
                }
                Err(err) => {
                    warn!(report_id = %id, "skipping unreadable report: {err}");
                    skipped.push(id);
                }
            }
        }

        self.selected = previous
            .filter(|id| reports.contains_key(id))
            .or_else(|| reports.keys().next().cloned());
        self.reports = reports;

        if !skipped.is_empty() {
            self.preserve_pending = true;
            warn!(
                "loaded {} reports from {location}; skipped {}",
                self.reports.len(),
                skipped.len()
            );
            return LoadOutcome::Partial {
                reports: self.reports.len(),
                skipped,
            };
        }
        self.last_digest = Some(sha256_hex(raw.as_bytes()));
        info!("loaded {} reports from {location}", self.reports.len());
        LoadOutcome::Loaded {
            reports: self.reports.len(),
        }
    }

    fn preserve_before_write(&mut self) -> StoreResult<()> {
        if !self.preserve_pending {
            return Ok(());
        }
        if let Some(backup) = self.storage.preserve()? {
            warn!("kept unreadable store as {backup} before overwriting it");
        }
        self.preserve_pending = false;
        Ok(())
    }

    /// Same text that `save` writes.
    pub fn export_store(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(&self.reports)?)
    }

    /// Unconditional full rewrite.
    pub fn save(&mut self) -> StoreResult<()> {
        let text = self.export_store()?;
        let digest = sha256_hex(text.as_bytes());
        self.preserve_before_write()?;
        self.storage.write(&text)?;
        debug!(
            "saved {} reports to {} sha256={digest}",
            self.reports.len(),
            self.storage.describe()
        );
        self.last_digest = Some(digest);
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        if self.skip_unchanged_writes {
            let text = self.export_store()?;
            let digest = sha256_hex(text.as_bytes());
            if self.last_digest.as_deref() == Some(digest.as_str()) {
                debug!("store unchanged; skipping write");
                return Ok(());
            }
            self.preserve_before_write()?;
            self.storage.write(&text)?;
            debug!("saved store sha256={digest}");
            self.last_digest = Some(digest);
            return Ok(());
        }
        self.save()
    }

    fn next_report_id(&self) -> String {
        let mut n = self.reports.len() + 1;
        loop {
            let id = format!("report_{n}");
            if !self.reports.contains_key(&id) {
                return id;
            }
            n += 1;
        }
    }

    /// Inserts `template` at the end under a fresh id and selects it.
    pub fn create_report(&mut self, mut template: ReportDocument) -> StoreResult<String> {
        let id = self.next_report_id();
        template.id = id.clone();
        self.reports.insert(id.clone(), template);
        self.selected = Some(id.clone());
        info!("created report {id}");
        self.flush()?;
        Ok(id)
    }

    pub fn create_default_report(&mut self) -> StoreResult<String> {
        self.create_report(create_default_report())
    }

    /// Seeds the default report when the store is empty.
    pub fn ensure_report(&mut self) -> StoreResult<Option<String>> {
        if !self.reports.is_empty() {
            return Ok(None);
        }
        self.create_default_report().map(Some)
    }

    pub fn select_report(&mut self, id: &str) -> StoreResult<()> {
        if !self.reports.contains_key(id) {
            return Err(StoreError::report_not_found(id));
        }
        self.selected = Some(id.to_string());
        Ok(())
    }

    /// Refuses to remove the last report. A removed selection moves to the
    /// first remaining report.
    pub fn delete_report(&mut self, id: &str) -> StoreResult<()> {
        if !self.reports.contains_key(id) {
            return Err(StoreError::report_not_found(id));
        }
        if self.reports.len() == 1 {
            return Err(StoreError::LastReport);
        }
        self.reports.shift_remove(id);
        if self.selected.as_deref() == Some(id) {
            self.selected = self.reports.keys().next().cloned();
        }
        info!("deleted report {id}");
        self.flush()
    }

    /// Applies `f` to one report and persists if it changed anything, even
    /// when `f` itself reports an error afterwards.
    pub fn update_report<R, F>(&mut self, id: &str, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut ReportDocument) -> StoreResult<R>,
    {
        let doc = self
            .reports
            .get_mut(id)
            .ok_or_else(|| StoreError::report_not_found(id))?;
        let before = doc.revision();
        let out = f(doc);
        if doc.revision() != before {
            self.flush()?;
        }
        out
    }

    pub fn update_selected<R, F>(&mut self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut ReportDocument) -> StoreResult<R>,
    {
        let id = self.selected.clone().ok_or(StoreError::NoSelection)?;
        self.update_report(&id, f)
    }

    pub fn export_images(&self, id: &str) -> StoreResult<ImageArchive> {
        let doc = self
            .reports
            .get(id)
            .ok_or_else(|| StoreError::report_not_found(id))?;
        Ok(ImageArchive::from_catalog(doc.images()))
    }

    /// One image under its safe file name, with its own content type.
    pub fn export_image(&self, report_id: &str, image_id: &str) -> StoreResult<ArchiveEntry> {
        let doc = self
            .reports
            .get(report_id)
            .ok_or_else(|| StoreError::report_not_found(report_id))?;
        let (index, img) = doc
            .images()
            .iter()
            .enumerate()
            .find(|(_, img)| img.id == image_id)
            .ok_or_else(|| StoreError::image_not_found(image_id))?;
        Ok(ArchiveEntry::from_image(img, index))
    }
}
