use super::Storage;
use crate::error::{StoreError, StoreResult};

/// In-process blob; handy for callers that only need a scratch store.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    contents: Option<String>,
    preserved: Option<String>,
    writes: usize,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    /// Blob set aside by the last `preserve`.
    pub fn preserved(&self) -> Option<&str> {
        self.preserved.as_deref()
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl Storage for MemoryStorage {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn read(&self) -> StoreResult<Option<String>> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, contents: &str) -> StoreResult<()> {
        if self.fail_writes {
            return Err(StoreError::StorageWrite {
                location: self.describe(),
                source: std::io::Error::other("writes disabled"),
            });
        }
        self.contents = Some(contents.to_string());
        self.writes += 1;
        Ok(())
    }

    fn preserve(&mut self) -> StoreResult<Option<String>> {
        if self.contents.is_none() {
            return Ok(None);
        }
        self.preserved = self.contents.clone();
        Ok(Some("memory.corrupt".to_string()))
    }
}
