//! Snapshot persistence: a key-value blob store holding serialized cases.

mod error;
mod file;
mod memory;
pub mod snapshot;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use snapshot::{SNAPSHOT_KEY, load_case, save_case};

/// A key-value store for whole serialized snapshots.
///
/// No partial or incremental writes: `save` replaces whatever blob the key
/// held before.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError>;

    /// `Ok(None)` when nothing has been saved under `key`.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for &T {
    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        (**self).save(key, blob)
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(key)
    }
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for Box<T> {
    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        (**self).save(key, blob)
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(key)
    }
}
