//! Hamming distance over hex-encoded perceptual hashes.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HashParseError {
    #[error("hash is empty")]
    Empty,
    #[error("hash {0:?} is not hexadecimal")]
    NotHex(String),
}

/// Number of differing bits between two hex hashes, read as unsigned
/// integers. The shorter hash is zero-extended on the left.
pub fn hamming_distance(a: &str, b: &str) -> Result<u32, HashParseError> {
    let a = nibbles(a)?;
    let b = nibbles(b)?;
    let width = a.len().max(b.len());
    Ok(padded(&a, width)
        .zip(padded(&b, width))
        .map(|(x, y)| (x ^ y).count_ones())
        .sum())
}

/// Unparseable hashes are never similar to anything.
pub fn are_similar(a: &str, b: &str, threshold: u32) -> bool {
    matches!(hamming_distance(a, b), Ok(d) if d <= threshold)
}

fn nibbles(hash: &str) -> Result<Vec<u8>, HashParseError> {
    if hash.is_empty() {
        return Err(HashParseError::Empty);
    }
    hash.chars()
        .map(|c| {
            c.to_digit(16)
                .map(|d| d as u8)
                .ok_or_else(|| HashParseError::NotHex(hash.to_string()))
        })
        .collect()
}

fn padded(nibbles: &[u8], width: usize) -> impl Iterator<Item = u8> + '_ {
    std::iter::repeat(0)
        .take(width - nibbles.len())
        .chain(nibbles.iter().copied())
}
