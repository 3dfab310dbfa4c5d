//! Piece-level download state for content fetched in digest-verified chunks.
//!
//! [`PieceStore`] sits between a block-request scheduler and a [`Storage`]
//! backend: it tracks which sub-blocks of which pieces still need fetching,
//! verifies assembled pieces against their expected SHA-1 digests, and fires
//! a one-shot completion notification once every byte has been verified.
//! Piece *selection* policy and the peer wire protocol live above this crate.

mod digest;
mod hooks;
mod storage;
mod store;

pub use digest::{piece_digest, PieceHash};
pub use hooks::Hooks;
pub use storage::{MemoryStorage, Storage, StorageError};
pub use store::{
    BlockLength, BlockOffset, BlockRequest, ConfigError, PieceIndex, PieceLength, PieceStore,
    StoreConfig,
};

/// Per-piece have flags in torrent wire bit order.
pub type Bitfield = bitvec::vec::BitVec<u8, bitvec::order::Msb0>;
