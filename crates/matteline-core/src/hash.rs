//! Content hashing for deterministic rendering verification.
//!
//! Produces a SHA-256 hash of frame and matte data, so two renders of the same
//! document can be compared bit for bit.

use sha2::{Digest, Sha256};

use crate::frame::{FrameBuffer, MatteBuffer};

/// A content hash digest (SHA-256, 32 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

fn update_frame(hasher: &mut Sha256, frame: &FrameBuffer) {
    // Dimensions and format are part of the digest so differently shaped
    // buffers with identical bytes hash differently.
    hasher.update(frame.width.to_le_bytes());
    hasher.update(frame.height.to_le_bytes());
    hasher.update([frame.format as u8]);
    hasher.update(&frame.data);
}

fn update_matte(hasher: &mut Sha256, matte: &MatteBuffer) {
    hasher.update(matte.width.to_le_bytes());
    hasher.update(matte.height.to_le_bytes());
    hasher.update(&matte.data);
}

fn finish(hasher: Sha256) -> ContentHash {
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    ContentHash::from_bytes(bytes)
}

/// Compute the content hash of a single frame buffer.
pub fn hash_frame(frame: &FrameBuffer) -> ContentHash {
    let mut hasher = Sha256::new();
    update_frame(&mut hasher, frame);
    finish(hasher)
}

/// Compute the content hash of a single matte.
pub fn hash_matte(matte: &MatteBuffer) -> ContentHash {
    let mut hasher = Sha256::new();
    update_matte(&mut hasher, matte);
    finish(hasher)
}

/// Compute the content hash of a whole render: every frame, then every matte.
pub fn hash_sequence(frames: &[FrameBuffer], mattes: &[MatteBuffer]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update((frames.len() as u64).to_le_bytes());
    for frame in frames {
        update_frame(&mut hasher, frame);
    }
    hasher.update((mattes.len() as u64).to_le_bytes());
    for matte in mattes {
        update_matte(&mut hasher, matte);
    }
    finish(hasher)
}
