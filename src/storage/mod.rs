//! Chunked storage of opaque blobs in bounded key-value slots
//!
//! This module provides:
//! - Splitting and merging of byte buffers into fixed-size pieces
//! - A codec mapping a blob onto `<prefix><index>` keys and back

pub mod chunker;
pub mod codec;

pub use chunker::{merge, split};
pub use codec::{chunk_data, glue_data, is_slot_key, ChunkMap, DEFAULT_CHUNK_SIZE};
