//! Fixed-size splitting of byte buffers

use crate::errors::{SeedKeepError, Result};

/// Split a buffer into pieces of at most `chunk_size` bytes
///
/// Yields `ceil(len / chunk_size)` pieces, none for an empty buffer.
pub fn split(blob: &[u8], chunk_size: usize) -> Result<Vec<&[u8]>> {
    if chunk_size == 0 {
        return Err(SeedKeepError::InvalidInput(
            "chunk size must be at least 1".to_string(),
        ));
    }
    Ok(blob.chunks(chunk_size).collect())
}

/// Concatenate pieces back into one buffer
pub fn merge<I, C>(chunks: I) -> Vec<u8>
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    chunks.into_iter().fold(Vec::new(), |mut acc, chunk| {
        acc.extend_from_slice(chunk.as_ref());
        acc
    })
}
