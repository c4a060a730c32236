//! Digest and hex-encode collaborators: pure, deterministic per-item functions.

use clap::ValueEnum;
use sha1::{Digest, Sha1};

/// Digest algorithm applied to fetched resource bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum DigestKind {
    /// SHA-1, 20-byte digest (the reference algorithm).
    #[default]
    Sha1,
    /// Blake3, 32-byte digest.
    Blake3,
}

/// Hash `bytes` with the selected algorithm.
pub fn digest_bytes(kind: DigestKind, bytes: &[u8]) -> Vec<u8> {
    match kind {
        DigestKind::Sha1 => Sha1::digest(bytes).to_vec(),
        DigestKind::Blake3 => blake3::hash(bytes).as_bytes().to_vec(),
    }
}

/// Lowercase hexadecimal, no separators.
pub fn to_hex(digest: &[u8]) -> String {
    hex::encode(digest)
}
