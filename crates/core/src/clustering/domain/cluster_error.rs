use thiserror::Error;

/// Failure of one clustering pass. Contained to that pass.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClusterError {
    #[error("embedding dimensions differ: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Checks that every vector has the length of the first one.
pub fn ensure_same_dimension<'a, I>(vectors: I) -> Result<(), ClusterError>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut iter = vectors.into_iter();
    let Some(first) = iter.next() else {
        return Ok(());
    };
    let expected = first.len();
    match iter.find(|v| v.len() != expected) {
        Some(v) => Err(ClusterError::DimensionMismatch {
            expected,
            found: v.len(),
        }),
        None => Ok(()),
    }
}
