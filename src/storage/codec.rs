//! Keyed chunk codec
//!
//! A blob too large for one generic storage slot is spread over slots named
//! `<prefix>0`, `<prefix>1`, ... each holding the base64 text of one chunk.
//! Gluing sorts the slots by their numeric suffix, so the layout of the map
//! the slots come back in has no influence on the result.

use crate::errors::{SeedKeepError, Result};
use crate::storage::chunker;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::collections::BTreeMap;
use tracing::trace;

/// Default bytes per slot
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// Slot key -> base64 encoded chunk
pub type ChunkMap = BTreeMap<String, String>;

/// Spread `blob` over `<prefix><index>` slots of at most `chunk_size` bytes
pub fn chunk_data(prefix: &str, blob: impl AsRef<[u8]>, chunk_size: usize) -> Result<ChunkMap> {
    let chunks = chunker::split(blob.as_ref(), chunk_size)?;

    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| (format!("{}{}", prefix, index), STANDARD.encode(chunk)))
        .collect())
}

/// Reassemble the blob stored under `prefix`
///
/// Keys whose suffix is not a canonical decimal index are not slots and are
/// ignored. Fails with `NoData` when no slot matches, and with
/// `InvalidInput` when the indices have a gap or a chunk is not base64.
pub fn glue_data<'a, I, K, V>(prefix: &str, entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a K, &'a V)>,
    K: AsRef<str> + ?Sized + 'a,
    V: AsRef<str> + ?Sized + 'a,
{
    let mut slots: Vec<(usize, &str)> = entries
        .into_iter()
        .filter_map(|(key, value)| {
            let index = slot_index(prefix, key.as_ref())?;
            Some((index, value.as_ref()))
        })
        .collect();

    if slots.is_empty() {
        return Err(SeedKeepError::NoData(prefix.to_string()));
    }

    slots.sort_unstable_by_key(|(index, _)| *index);

    let mut chunks = Vec::with_capacity(slots.len());
    for (expected, (index, value)) in slots.into_iter().enumerate() {
        if index != expected {
            return Err(SeedKeepError::InvalidInput(format!(
                "chunk {}{} is missing",
                prefix, expected
            )));
        }
        chunks.push(STANDARD.decode(value)?);
    }

    trace!("Glued {} chunks under {}", chunks.len(), prefix);
    Ok(chunker::merge(chunks))
}

/// Whether `key` names one of the slots under `prefix`
pub fn is_slot_key(prefix: &str, key: &str) -> bool {
    slot_index(prefix, key).is_some()
}

fn slot_index(prefix: &str, key: &str) -> Option<usize> {
    let suffix = key.strip_prefix(prefix)?;
    let index: usize = suffix.parse().ok()?;
    // "01" or "+1" would alias "1"
    (index.to_string() == suffix).then_some(index)
}
