//! Deterministic placeholder embedding.
//!
//! Not a semantic embedding: a fixed-length feature vector hashed from the
//! text. Same text always yields the same vector, different text very likely
//! differs, and the dimensionality stays small and fixed — enough for the
//! vector store to key and rank documents until a real embedding model is
//! plugged in.

use sha2::{Digest, Sha256};

/// Fixed output dimensionality.
pub const EMBEDDING_DIM: usize = 10;

/// Hash `text` into a fixed-length vector with values in [-1, 1].
///
/// Three hex characters of the sha256 digest feed each dimension, scaled
/// from [0, 4095] onto [-1, 1].
pub fn embed_text(text: &str) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();

    let mut embedding = Vec::with_capacity(EMBEDDING_DIM);
    for chunk in hex.as_bytes().chunks(3) {
        if chunk.len() < 3 {
            break;
        }
        let value = u32::from_str_radix(std::str::from_utf8(chunk).unwrap_or("0"), 16)
            .unwrap_or(0) as f32;
        embedding.push(value / 4095.0 * 2.0 - 1.0);
        if embedding.len() >= EMBEDDING_DIM {
            break;
        }
    }
    embedding
}
