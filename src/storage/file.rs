use super::Storage;
use crate::error::{StoreError, StoreResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileStorage {
    path: PathBuf,
    atomic: bool,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>, atomic: bool) -> Self {
        Self {
            path: path.into(),
            atomic,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<data_file>.corrupt`, where an unreadable store is kept.
    pub fn preserved_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn write_err(&self, source: std::io::Error) -> StoreError {
        StoreError::StorageWrite {
            location: self.describe(),
            source,
        }
    }

    /// Write a `.tmp` sibling, then rename over the target.
    fn atomic_write(&self, contents: &str) -> StoreResult<()> {
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents).map_err(|e| self.write_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            self.write_err(e)
        })
    }
}

impl Storage for FileStorage {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> StoreResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::StorageRead {
                location: self.describe(),
                message: e.to_string(),
            }),
        }
    }

    fn write(&mut self, contents: &str) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;
            }
        }
        debug!(
            "write {} bytes to {} atomic={}",
            contents.len(),
            self.path.display(),
            self.atomic
        );
        if self.atomic {
            self.atomic_write(contents)
        } else {
            std::fs::write(&self.path, contents).map_err(|e| self.write_err(e))
        }
    }

    fn preserve(&mut self) -> StoreResult<Option<String>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let backup = self.preserved_path();
        std::fs::copy(&self.path, &backup).map_err(|e| self.write_err(e))?;
        Ok(Some(backup.display().to_string()))
    }
}
