mod piece;
mod store;

use thiserror::Error;

pub use store::PieceStore;

pub type PieceIndex = usize;
pub type PieceLength = u32;
pub type BlockOffset = u32;
pub type BlockLength = u32;

/// One sub-block of a piece, the unit actually requested from a data source.
///
/// `begin` is relative to the start of the piece. A request handed out by
/// [`PieceStore::new_request`] never overlaps any other pending or
/// outstanding request for the same piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRequest {
    pub begin: BlockOffset,
    pub length: BlockLength,
}

/// Fixed parameters for one transfer.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Nominal piece size; the final piece may be shorter.
    pub piece_length: PieceLength,
    /// Nominal sub-block size pieces are split into for requesting; the final
    /// block of a piece absorbs the remainder.
    pub request_size: BlockLength,
    /// When false, existing content is trusted outright and no digests are
    /// checked, not even for delivered blocks.
    pub verify_hashes: bool,
}

impl StoreConfig {
    pub fn new(piece_length: PieceLength, request_size: BlockLength) -> Self {
        Self {
            piece_length,
            request_size,
            verify_hashes: true,
        }
    }
}

/// Construction-time validation failure. The piece list and the storage
/// length disagree about how much content there is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("total length {total_length} too small for {piece_count} pieces of {piece_length} bytes")]
    TotalTooSmall {
        total_length: u64,
        piece_count: usize,
        piece_length: PieceLength,
    },
    #[error("total length {total_length} too large for {piece_count} pieces of {piece_length} bytes")]
    TotalTooBig {
        total_length: u64,
        piece_count: usize,
        piece_length: PieceLength,
    },
    #[error("request size must be non-zero")]
    ZeroRequestSize,
}
