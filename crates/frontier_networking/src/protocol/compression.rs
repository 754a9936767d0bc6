//! # Frame Compression
//!
//! LZ4 block compression for large frames. The uncompressed length is
//! prepended (little-endian `u32`) so the receiver can size its buffer and
//! refuse absurd frames before allocating.

use crate::error::{NetworkError, NetworkResult};

/// Largest decompressed frame a receiver accepts (64 MiB).
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Compresses a frame body.
#[must_use]
pub fn compress(bytes: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(bytes)
}

/// Decompresses a frame produced by [`compress`].
///
/// # Errors
///
/// [`NetworkError::Compression`] for a truncated or corrupt frame, or one
/// that would exceed [`MAX_FRAME_BYTES`].
pub fn decompress(bytes: &[u8]) -> NetworkResult<Vec<u8>> {
    let Some(header) = bytes.get(..4) else {
        return Err(NetworkError::Compression("frame shorter than its header".into()));
    };
    let mut len = [0u8; 4];
    len.copy_from_slice(header);
    let len = u32::from_le_bytes(len) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(NetworkError::Compression(format!(
            "frame of {len} bytes exceeds the {MAX_FRAME_BYTES} byte limit"
        )));
    }
    lz4_flex::decompress_size_prepended(bytes).map_err(|e| NetworkError::Compression(e.to_string()))
}

/// Compressed size as a fraction of the original.
#[must_use]
pub fn ratio(original: usize, compressed: usize) -> f64 {
    if original == 0 {
        return 1.0;
    }
    compressed as f64 / original as f64
}
