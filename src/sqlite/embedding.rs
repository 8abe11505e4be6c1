//! Vector BLOB encoding and cosine similarity.

use super::Error;
use crate::embedding::EMBEDDING_DIMS;

pub type Result<T> = std::result::Result<T, Error>;

const EMBEDDING_BLOB_SIZE: usize = EMBEDDING_DIMS * std::mem::size_of::<f32>();

/// Encode an embedding as little-endian f32 bytes.
///
/// # Errors
///
/// Returns `Error::MismatchedDimensions` unless the vector has `EMBEDDING_DIMS` values.
pub fn vec_to_blob(vec: &[f32]) -> Result<Vec<u8>> {
    if vec.len() != EMBEDDING_DIMS {
        return Err(Error::MismatchedDimensions {
            expected: EMBEDDING_DIMS,
            actual: vec.len(),
        });
    }
    Ok(vec.iter().flat_map(|x| x.to_le_bytes()).collect())
}

/// Decode a BLOB written by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() != EMBEDDING_BLOB_SIZE {
        return Err(Error::InvalidBlobSize {
            expected: EMBEDDING_BLOB_SIZE,
            actual: blob.len(),
        });
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity in f64, 0.0 when either side has zero norm.
///
/// # Errors
///
/// Empty vectors, length mismatch, or any NaN/infinite component.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(Error::EmptyVector);
    }
    if a.len() != b.len() {
        return Err(Error::MismatchedDimensions {
            expected: a.len(),
            actual: b.len(),
        });
    }
    if a.iter().chain(b.iter()).any(|x| !x.is_finite()) {
        return Err(Error::InvalidEmbedding(
            "Vector contains NaN or infinite values".to_string(),
        ));
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0, 0.0, 0.0), |acc, (&x, &y)| {
        let (x, y) = (x as f64, y as f64);
        (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
    });

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}
