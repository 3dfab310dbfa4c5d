use sha1_smol::Sha1;

/// Expected SHA-1 digest of a fully assembled piece, as carried in the
/// metainfo piece list.
pub type PieceHash = [u8; 20];

/// Digest of a piece's raw bytes, comparable against its [`PieceHash`].
pub fn piece_digest(data: &[u8]) -> PieceHash {
    Sha1::from(data).digest().bytes()
}
