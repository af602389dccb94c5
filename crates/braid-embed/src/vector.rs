//! Shared vector math.

use sha2::{Digest, Sha256};

/// Norm below which a vector counts as zero.
pub(crate) const NORM_EPSILON: f32 = 1e-9;

/// Dot product over the common prefix of `a` and `b`.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Unit-normalized copy of `v`, or None when its norm is effectively zero.
pub fn unit_norm(v: &[f32]) -> Option<Vec<f32>> {
    let norm = dot(v, v).sqrt();
    if norm <= NORM_EPSILON {
        return None;
    }
    Some(v.iter().map(|x| x / norm).collect())
}

/// Unit-normalized mean of the given vectors. None when the input is empty
/// or the mean collapses to zero.
pub fn mean_unit(vectors: &[&[f32]], dim: usize) -> Option<Vec<f32>> {
    if vectors.is_empty() || dim == 0 {
        return None;
    }
    let mut acc = vec![0f32; dim];
    for v in vectors {
        for (slot, x) in acc.iter_mut().zip(v.iter()) {
            *slot += x;
        }
    }
    let count = vectors.len() as f32;
    for slot in acc.iter_mut() {
        *slot /= count;
    }
    unit_norm(&acc)
}

/// Deterministic lexical embedding: each whitespace token of the lowercased
/// text is hashed into a dimension slot with a hash-derived sign, then the
/// accumulated vector is unit-normalized.
///
/// Returns None for blank text, a zero dimension, or when token signs
/// cancel out completely.
pub fn lexical_vector(text: &str, dim: usize) -> Option<Vec<f32>> {
    if dim == 0 {
        return None;
    }
    let lowered = text.to_lowercase();
    let mut acc = vec![0f32; dim];
    let mut any = false;
    for token in lowered.split_whitespace() {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let h = u64::from_be_bytes(head);
        let idx = (h % dim as u64) as usize;
        let sign = if h & 1 == 1 { -1.0 } else { 1.0 };
        acc[idx] += sign;
        any = true;
    }
    if !any {
        return None;
    }
    unit_norm(&acc)
}
