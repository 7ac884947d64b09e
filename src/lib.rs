pub mod cli;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod images;
mod lenient;
pub mod records;
pub mod storage;
pub mod store;
pub mod template;
pub mod util;

pub use document::{ReportDocument, Section, Summary};
pub use error::{StoreError, StoreResult};
pub use images::{ImageCatalog, ImageEntry};
pub use records::{Record, RecordCollection, Table};
pub use store::{LoadOutcome, ReportStore};
