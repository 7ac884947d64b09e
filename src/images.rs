use crate::codec::{self, ImageFormat};
use crate::error::{StoreError, StoreResult};
use crate::util::{self, now_timestamp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::PrimitiveDateTime;
use tracing::warn;

pub const DEFAULT_CATEGORY: &str = "General";
/// Filter sentinel matching every category.
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    pub id: String,
    pub filename: String,
    pub payload: Vec<u8>,
    pub caption: String,
    pub category: String,
    pub uploaded_date: PrimitiveDateTime,
    pub format: ImageFormat,
}

impl ImageEntry {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn metadata(&self) -> ImageMetadata<'_> {
        ImageMetadata {
            id: &self.id,
            filename: &self.filename,
            caption: &self.caption,
            category: &self.category,
            uploaded_date: util::format_timestamp(&self.uploaded_date),
            content_type: self.content_type(),
            size_bytes: self.payload.len(),
        }
    }
}

/// Payload-free view for listings.
#[derive(Debug, Serialize)]
pub struct ImageMetadata<'a> {
    pub id: &'a str,
    pub filename: &'a str,
    pub caption: &'a str,
    pub category: &'a str,
    pub uploaded_date: String,
    pub content_type: &'static str,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ImageCatalog {
    entries: Vec<ImageEntry>,
    revision: u64,
}

impl PartialEq for ImageCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl ImageCatalog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageEntry> {
        self.entries.iter()
    }

    pub fn get(&self, id: &str) -> Option<&ImageEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn add(&mut self, filename: &str, payload: Vec<u8>, caption: &str, category: &str) -> String {
        let mut id = util::new_id();
        while self.get(&id).is_some() {
            id = util::new_id();
        }
        let category = if category.trim().is_empty() {
            DEFAULT_CATEGORY
        } else {
            category
        };
        self.entries.push(ImageEntry {
            id: id.clone(),
            filename: filename.to_string(),
            format: ImageFormat::detect(filename, &payload),
            payload,
            caption: caption.to_string(),
            category: category.to_string(),
            uploaded_date: now_timestamp(),
        });
        self.revision += 1;
        id
    }

    /// Idempotent: an absent id is not an error. Returns whether anything was removed.
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(pos) => {
                self.entries.remove(pos);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Returns how many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        if n > 0 {
            self.revision += 1;
        }
        n
    }

    pub fn update_metadata(
        &mut self,
        id: &str,
        caption: Option<&str>,
        category: Option<&str>,
    ) -> StoreResult<bool> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::image_not_found(id))?;

        let mut changed = false;
        if let Some(c) = caption {
            if entry.caption != c {
                entry.caption = c.to_string();
                changed = true;
            }
        }
        if let Some(c) = category {
            if entry.category != c {
                entry.category = c.to_string();
                changed = true;
            }
        }
        if changed {
            self.revision += 1;
        }
        Ok(changed)
    }

    /// Re-evaluated on every call.
    pub fn filter_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a ImageEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| category == ALL_CATEGORIES || e.category == category)
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in &self.entries {
            if !out.contains(&e.category.as_str()) {
                out.push(&e.category);
            }
        }
        out
    }

    pub fn export_all(&self) -> Vec<(&str, &[u8])> {
        self.entries
            .iter()
            .map(|e| (e.filename.as_str(), e.payload.as_slice()))
            .collect()
    }
}

#[derive(Serialize)]
struct StoredImageRef<'a> {
    id: &'a str,
    filename: &'a str,
    data: String,
    caption: &'a str,
    category: &'a str,
    #[serde(with = "crate::util::timestamp_serde")]
    uploaded_date: PrimitiveDateTime,
    content_type: &'static str,
}

#[derive(Deserialize)]
struct StoredImage {
    #[serde(default, deserialize_with = "crate::lenient::text")]
    id: String,
    #[serde(default, deserialize_with = "crate::lenient::text")]
    filename: String,
    #[serde(default, deserialize_with = "crate::lenient::text")]
    data: String,
    #[serde(default, deserialize_with = "crate::lenient::text")]
    caption: String,
    #[serde(default = "default_category", deserialize_with = "crate::lenient::text")]
    category: String,
    #[serde(default = "now_timestamp", with = "crate::util::timestamp_serde")]
    uploaded_date: PrimitiveDateTime,
    #[serde(default, deserialize_with = "crate::lenient::string_value")]
    content_type: Option<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Serialize for ImageCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter().map(|e| StoredImageRef {
            id: &e.id,
            filename: &e.filename,
            data: codec::encode(&e.payload),
            caption: &e.caption,
            category: &e.category,
            uploaded_date: e.uploaded_date,
            content_type: e.content_type(),
        }))
    }
}

impl<'de> Deserialize<'de> for ImageCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = Vec::<StoredImage>::deserialize(deserializer)?;
        let mut entries = Vec::with_capacity(stored.len());
        for s in stored {
            // One bad payload drops that image only.
            let payload = match codec::decode(&s.data) {
                Ok(p) => p,
                Err(err) => {
                    warn!(image_id = %s.id, filename = %s.filename, "skipping image: {err}");
                    continue;
                }
            };
            let format = match s.content_type.as_deref().map(ImageFormat::from_content_type) {
                Some(f) if f != ImageFormat::Unknown => f,
                _ => ImageFormat::detect(&s.filename, &payload),
            };
            let id = if s.id.is_empty() { util::new_id() } else { s.id };
            entries.push(ImageEntry {
                id,
                filename: s.filename,
                payload,
                caption: s.caption,
                category: if s.category.is_empty() {
                    default_category()
                } else {
                    s.category
                },
                uploaded_date: s.uploaded_date,
                format,
            });
        }
        Ok(ImageCatalog {
            entries,
            revision: 0,
        })
    }
}
