use std::cmp::min;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::digest::{piece_digest, PieceHash};
use crate::hooks::Hooks;
use crate::storage::{Storage, StorageError};
use crate::Bitfield;

use super::piece::Piece;
use super::{BlockOffset, BlockRequest, ConfigError, PieceIndex, StoreConfig};

/// Tracks the download state of digest-verified pieces over a [`Storage`]
/// backend.
///
/// The store is driven sequentially by one owner (the block-request
/// scheduler): it hands out sub-block requests, accepts delivered blocks,
/// and re-verifies a piece whenever its last outstanding block comes in.
/// Storage I/O failures never surface as return values from the mutating
/// operations; they are funneled to the `failed` hook with the tracking
/// state left untouched, so the same offsets remain valid for a retry.
pub struct PieceStore<S: Storage> {
    storage: S,
    piece_length: u32,
    request_size: u32,
    total_length: u64,
    /// Bytes not yet verified. Strictly non-increasing, hits zero once.
    amount_left: u64,
    pieces: Vec<Piece>,
    /// Pending sub-blocks across all pieces.
    pending_total: u64,
    verify_hashes: bool,
    /// Gates `data_flunked`: digest failures during the initial scan are the
    /// normal state of a half-finished file and are not reported.
    scan_complete: bool,
    hooks: Hooks,
}

impl<S: Storage> PieceStore<S> {
    /// Builds the piece table and scans pre-existing storage content.
    ///
    /// When the storage reports pre-existing content, every piece is checked
    /// against its digest in index order (unless `verify_hashes` is off, in
    /// which case content is trusted outright). `cancel` is polled between
    /// pieces; cancelling leaves the remaining pieces unscanned — neither
    /// have nor requestable — which [`Self::scan_complete`] reports, and such
    /// a partially scanned store should be discarded and rebuilt.
    ///
    /// An empty piece list fires `finished` immediately.
    pub fn new(
        storage: S,
        hashes: Vec<PieceHash>,
        config: StoreConfig,
        hooks: Hooks,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        let total_length = storage.total_length();
        let piece_count = hashes.len();
        validate(total_length, piece_count, &config)?;

        let piece_length = config.piece_length;
        let pieces = hashes
            .into_iter()
            .enumerate()
            .map(|(index, hash)| {
                let length = if index + 1 == piece_count {
                    (total_length - piece_length as u64 * (piece_count as u64 - 1)) as u32
                } else {
                    piece_length
                };
                Piece::new(hash, length)
            })
            .collect();

        let mut store = Self {
            storage,
            piece_length,
            request_size: config.request_size,
            total_length,
            amount_left: total_length,
            pieces,
            pending_total: 0,
            verify_hashes: config.verify_hashes,
            scan_complete: false,
            hooks,
        };

        if store.pieces.is_empty() {
            store.scan_complete = true;
            (store.hooks.finished)();
            return Ok(store);
        }

        if store.storage.was_preexisting() {
            store.scan_existing(&cancel);
        } else {
            for index in 0..store.pieces.len() {
                store.reset_piece(index);
            }
            store.scan_complete = true;
        }
        Ok(store)
    }

    fn scan_existing(&mut self, cancel: &CancellationToken) {
        let piece_count = self.pieces.len();
        info!(piece_count, "checking existing content");
        (self.hooks.status)(Some(0.0), Some("checking existing file"));
        for index in 0..piece_count {
            self.check_single(index, true);
            if cancel.is_cancelled() {
                warn!(
                    checked = index + 1,
                    piece_count, "integrity scan cancelled, remaining pieces left unscanned"
                );
                return;
            }
            (self.hooks.status)(Some((index + 1) as f64 / piece_count as f64), None);
        }
        self.scan_complete = true;
    }

    /// Decides the fate of a piece with no pending and no outstanding
    /// sub-blocks: verified complete, or re-split for another round.
    fn check_single(&mut self, index: PieceIndex, check: bool) {
        if check {
            match self.verify_piece(index) {
                Ok(true) => {
                    let piece = &mut self.pieces[index];
                    piece.have = true;
                    piece.scanned = true;
                    self.amount_left -= piece.length as u64;
                    debug!(index, "piece verified");
                    if self.amount_left == 0 {
                        info!("all pieces verified, transfer complete");
                        (self.hooks.finished)();
                    }
                    return;
                }
                Ok(false) => {
                    let length = self.pieces[index].length;
                    if self.scan_complete {
                        warn!(index, length, "piece failed digest check, discarding");
                        (self.hooks.data_flunked)(length);
                    }
                }
                Err(err) => {
                    // Piece stays unsplit; the failure hook owns recovery.
                    warn!(index, %err, "storage read failed during verification");
                    (self.hooks.failed)(&format!("IO error: {err}"));
                    return;
                }
            }
        }
        self.reset_piece(index);
    }

    fn verify_piece(&self, index: PieceIndex) -> Result<bool, StorageError> {
        if !self.verify_hashes {
            return Ok(true);
        }
        let piece = &self.pieces[index];
        let offset = index as u64 * self.piece_length as u64;
        let data = self.storage.read(offset, piece.length)?;
        Ok(piece_digest(&data) == piece.hash)
    }

    /// Splits the piece back into its full sub-block pool.
    fn reset_piece(&mut self, index: PieceIndex) {
        self.pending_total += self.pieces[index].split_into_blocks(self.request_size);
    }

    /// Checks out the lowest-offset pending sub-block of `index`.
    ///
    /// Callers are expected to have confirmed [`Self::has_pending_requests`];
    /// returns `None` when the pool is empty. The returned range stays
    /// checked out until it is delivered via [`Self::piece_came_in`] or given
    /// back via [`Self::request_lost`].
    pub fn new_request(&mut self, index: PieceIndex) -> Option<BlockRequest> {
        let request = self.pieces[index].take_lowest()?;
        self.pending_total -= 1;
        debug!(index, begin = request.begin, length = request.length, "handed out request");
        Some(request)
    }

    /// Accepts a delivered block, writing it through to storage.
    ///
    /// `begin` and `data.len()` must match a previously checked-out request.
    /// When the last outstanding block of a piece arrives the piece is
    /// re-verified: on a digest match it becomes have (firing `finished` if
    /// it was the last piece), otherwise its pool is regenerated and the
    /// flunked byte count reported.
    pub fn piece_came_in(&mut self, index: PieceIndex, begin: BlockOffset, data: &[u8]) {
        let offset = index as u64 * self.piece_length as u64 + begin as u64;
        if let Err(err) = self.storage.write(offset, data) {
            warn!(index, begin, %err, "storage write failed, block stays checked out");
            (self.hooks.failed)(&format!("IO error: {err}"));
            return;
        }
        let piece = &mut self.pieces[index];
        piece.active_requests -= 1;
        if piece.idle() && !piece.have {
            self.check_single(index, true);
        }
    }

    /// Returns a checked-out request to the pending pool, e.g. after the
    /// peer holding it disconnected. Never triggers re-verification; only
    /// the delivery path does.
    pub fn request_lost(&mut self, index: PieceIndex, request: BlockRequest) {
        debug!(index, begin = request.begin, "request returned to pool");
        self.pieces[index].put_back(request);
        self.pending_total += 1;
    }

    /// Reads back a range of a verified piece.
    ///
    /// Returns `None` — never an error — when the piece is unknown or not
    /// yet have, or the range runs past the piece's end (clamped to the
    /// total length for the final piece). Storage read failures go to the
    /// `failed` hook and also yield `None`.
    pub fn get_piece(
        &mut self,
        index: PieceIndex,
        begin: BlockOffset,
        length: u32,
    ) -> Option<Vec<u8>> {
        if !self.pieces.get(index)?.have {
            return None;
        }
        let low = index as u64 * self.piece_length as u64 + begin as u64;
        let piece_end = min(
            self.total_length,
            (index as u64 + 1) * self.piece_length as u64,
        );
        if low + length as u64 > piece_end {
            return None;
        }
        match self.storage.read(low, length) {
            Ok(data) => Some(data),
            Err(err) => {
                (self.hooks.failed)(&format!("IO error: {err}"));
                None
            }
        }
    }

    /// Bytes not yet verified complete.
    pub fn amount_left(&self) -> u64 {
        self.amount_left
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// True once at least one piece has verified.
    pub fn have_anything(&self) -> bool {
        self.amount_left < self.total_length
    }

    pub fn have(&self, index: PieceIndex) -> bool {
        self.pieces.get(index).is_some_and(|piece| piece.have)
    }

    pub fn have_list(&self) -> Bitfield {
        self.pieces.iter().map(|piece| piece.have).collect()
    }

    /// Whether `index` has sub-blocks left to hand out.
    pub fn has_pending_requests(&self, index: PieceIndex) -> bool {
        !self.pieces[index].pending.is_empty()
    }

    /// True when every remaining sub-block has been handed out, i.e. all
    /// outstanding work is in flight and there is nothing left to allocate.
    pub fn everything_pending(&self) -> bool {
        self.pending_total == 0
    }

    /// Whether the initial integrity scan ran to completion. False after a
    /// cancelled scan; such a store has unscanned pieces and should be
    /// rebuilt rather than driven.
    pub fn scan_complete(&self) -> bool {
        self.scan_complete
    }
}

fn validate(
    total_length: u64,
    piece_count: usize,
    config: &StoreConfig,
) -> Result<(), ConfigError> {
    if config.request_size == 0 {
        return Err(ConfigError::ZeroRequestSize);
    }
    let piece_length = config.piece_length;
    if piece_count == 0 {
        if total_length > 0 {
            return Err(ConfigError::TotalTooBig {
                total_length,
                piece_count,
                piece_length,
            });
        }
        return Ok(());
    }
    if total_length <= (piece_count as u64 - 1) * piece_length as u64 {
        return Err(ConfigError::TotalTooSmall {
            total_length,
            piece_count,
            piece_length,
        });
    }
    if total_length > piece_count as u64 * piece_length as u64 {
        return Err(ConfigError::TotalTooBig {
            total_length,
            piece_count,
            piece_length,
        });
    }
    Ok(())
}
