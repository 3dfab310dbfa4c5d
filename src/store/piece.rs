use std::collections::BTreeMap;

use crate::digest::PieceHash;
use super::{BlockLength, BlockOffset, BlockRequest, PieceLength};

/// Per-piece bookkeeping slot. Created once when the store is built and
/// addressed by index for the transfer's lifetime; only the mutable fields
/// change, the slot itself never moves.
#[derive(Debug)]
pub(super) struct Piece {
    pub(super) hash: PieceHash,
    pub(super) length: PieceLength,
    /// Monotonic: set when the piece verifies, never cleared.
    pub(super) have: bool,
    /// Sub-blocks handed out via `new_request` and not yet returned.
    pub(super) active_requests: u32,
    /// Not-yet-requested sub-blocks, keyed by begin offset so the lowest
    /// offset is always handed out first. Ranges are pairwise disjoint.
    pub(super) pending: BTreeMap<BlockOffset, BlockLength>,
    /// False until the piece has either been verified or split into its
    /// pending pool. A cancelled initial scan leaves trailing pieces
    /// unscanned: not have, and with nothing to request.
    pub(super) scanned: bool,
}

impl Piece {
    pub(super) fn new(hash: PieceHash, length: PieceLength) -> Self {
        Self {
            hash,
            length,
            have: false,
            active_requests: 0,
            pending: BTreeMap::new(),
            scanned: false,
        }
    }

    /// Partitions `[0, length)` into consecutive `request_size` blocks, the
    /// final block absorbing the remainder so its length is in
    /// `(0, request_size]`. Returns the number of blocks queued.
    pub(super) fn split_into_blocks(&mut self, request_size: BlockLength) -> u64 {
        debug_assert!(self.pending.is_empty() && self.active_requests == 0);
        let mut begin = 0;
        while (begin as u64 + request_size as u64) < self.length as u64 {
            self.pending.insert(begin, request_size);
            begin += request_size;
        }
        self.pending.insert(begin, self.length - begin);
        self.scanned = true;
        self.pending.len() as u64
    }

    /// Checks out the pending sub-block with the lowest begin offset.
    pub(super) fn take_lowest(&mut self) -> Option<BlockRequest> {
        let (begin, length) = self.pending.pop_first()?;
        self.active_requests += 1;
        Some(BlockRequest { begin, length })
    }

    /// Returns a checked-out sub-block to the pending pool.
    pub(super) fn put_back(&mut self, request: BlockRequest) {
        self.pending.insert(request.begin, request.length);
        self.active_requests -= 1;
    }

    /// No pending and no outstanding sub-blocks; the piece is either fully
    /// delivered (ready to verify), already have, or unscanned.
    pub(super) fn idle(&self) -> bool {
        self.pending.is_empty() && self.active_requests == 0
    }
}
