use crate::images::{ImageCatalog, ImageEntry};
use crate::util::ensure_dir;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\x00-\x1f<>:"|?*]+"#).expect("static pattern"));

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ArchiveEntry {
    /// `index` names the file when the stored name has nothing usable.
    pub fn from_image(img: &ImageEntry, index: usize) -> Self {
        Self {
            name: safe_name(&img.filename, index),
            content_type: img.content_type(),
            bytes: img.payload.clone(),
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }
        std::fs::write(path, &self.bytes).with_context(|| format!("write {}", path.display()))
    }
}

/// Flat name -> bytes bundle of one report's images, ready for an archiver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageArchive {
    pub entries: Vec<ArchiveEntry>,
}

impl ImageArchive {
    pub fn from_catalog(catalog: &ImageCatalog) -> Self {
        let mut used = HashSet::new();
        let entries = catalog
            .iter()
            .enumerate()
            .map(|(i, img)| {
                let mut entry = ArchiveEntry::from_image(img, i);
                entry.name = unique_name(&entry.name, &mut used);
                entry
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|e| e.bytes.len()).sum()
    }

    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        ensure_dir(dir)?;
        for e in &self.entries {
            let path = dir.join(&e.name);
            std::fs::write(&path, &e.bytes)
                .with_context(|| format!("write {}", path.display()))?;
        }
        Ok(())
    }
}

/// Basename only, NFKC-normalized, with characters unsafe in file names replaced.
pub fn safe_name(filename: &str, index: usize) -> String {
    let normalized: String = filename.nfkc().collect();
    let base = normalized
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned = UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        format!("image_{}", index + 1)
    } else {
        cleaned.to_string()
    }
}

fn unique_name(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_lowercase()) {
        return base.to_string();
    }
    let (stem, ext) = match base.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() => (s, Some(e)),
        _ => (base, None),
    };
    let mut n = 2;
    loop {
        let candidate = match ext {
            Some(e) => format!("{stem} ({n}).{e}"),
            None => format!("{stem} ({n})"),
        };
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}
