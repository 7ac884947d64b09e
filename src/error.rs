use crate::records::Table;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{table} index {index} out of range (len {len})")]
    OutOfRange { table: Table, index: usize, len: usize },

    #[error("malformed asset payload: {0}")]
    Codec(#[from] base64::DecodeError),

    #[error("at least one report must be retained")]
    LastReport,

    #[error("no report selected")]
    NoSelection,

    #[error("invalid {table} row: {reason}")]
    InvalidRecord { table: Table, reason: String },

    #[error("unknown table: {name}")]
    UnknownTable { name: String },

    #[error("storage read failed ({location}): {message}")]
    StorageRead { location: String, message: String },

    #[error("storage write failed ({location})")]
    StorageWrite {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn report_not_found(id: &str) -> Self {
        StoreError::NotFound {
            kind: "report",
            id: id.to_string(),
        }
    }

    pub(crate) fn image_not_found(id: &str) -> Self {
        StoreError::NotFound {
            kind: "image",
            id: id.to_string(),
        }
    }

    /// Id lookups and positional lookups both count as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. } | StoreError::OutOfRange { .. }
        )
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
