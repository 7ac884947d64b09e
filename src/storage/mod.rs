pub mod file;
pub mod memory;

use crate::error::StoreResult;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// A single durable text blob holding the whole store.
pub trait Storage {
    /// Human-readable location, used in logs and errors.
    fn describe(&self) -> String;
    /// `Ok(None)` means nothing has been persisted yet.
    fn read(&self) -> StoreResult<Option<String>>;
    fn write(&mut self, contents: &str) -> StoreResult<()>;
    /// Copies what is currently stored aside so the next write cannot
    /// destroy data that failed to load. Returns where the copy went.
    fn preserve(&mut self) -> StoreResult<Option<String>>;
}
