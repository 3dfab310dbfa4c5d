use std::io;

use super::{Storage, StorageError};

/// Stores the whole transfer in a contiguous chunk of memory.
///
/// Mainly useful for tests and for small transfers that never need to touch
/// the filesystem.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    data: Vec<u8>,
    preexisting: bool,
}

impl MemoryStorage {
    /// Zero-filled storage for a fresh transfer of `total_length` bytes.
    pub fn empty(total_length: u64) -> Self {
        Self {
            data: vec![0; total_length as usize],
            preexisting: false,
        }
    }

    /// Storage seeded with content left over from an earlier transfer.
    pub fn preexisting(data: Vec<u8>) -> Self {
        Self {
            data,
            preexisting: true,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

fn out_of_bounds(kind: io::ErrorKind) -> StorageError {
    StorageError(io::Error::new(kind, "access past end of storage"))
}

impl Storage for MemoryStorage {
    fn total_length(&self) -> u64 {
        self.data.len() as u64
    }

    fn was_preexisting(&self) -> bool {
        self.preexisting
    }

    fn read(&self, offset: u64, length: u32) -> Result<Vec<u8>, StorageError> {
        let begin = offset as usize;
        let end = begin + length as usize;
        if end > self.data.len() {
            return Err(out_of_bounds(io::ErrorKind::UnexpectedEof));
        }
        Ok(self.data[begin..end].to_vec())
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<(), StorageError> {
        let begin = offset as usize;
        let end = begin + data.len();
        if end > self.data.len() {
            return Err(out_of_bounds(io::ErrorKind::WriteZero));
        }
        self.data[begin..end].copy_from_slice(data);
        Ok(())
    }
}
