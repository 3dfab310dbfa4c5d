use thiserror::Error;

mod memory;

pub use memory::MemoryStorage;

/// Failure reported by the storage backend for a read or write.
///
/// Never surfaced as a `Result` past the [`crate::PieceStore`] boundary;
/// the store funnels these into its `failed` hook.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct StorageError(#[from] pub std::io::Error);

/// Byte-addressed backing store for one transfer.
///
/// The store assumes exclusive, serialized access for the lifetime of the
/// transfer; implementations do not need to be thread safe.
pub trait Storage {
    /// Total byte length of the content, fixed for the transfer's lifetime.
    fn total_length(&self) -> u64;

    /// Whether content already existed before this transfer started. When
    /// true, construction scans and verifies every piece already on disk.
    fn was_preexisting(&self) -> bool;

    fn read(&self, offset: u64, length: u32) -> Result<Vec<u8>, StorageError>;

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<(), StorageError>;
}
