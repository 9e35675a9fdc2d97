//! Ed25519 identities and payload signatures

pub mod keys;
pub mod signature;

pub use keys::{Identity, Keypair, PublicId, Seed, KEY_LEN};
pub use signature::{canonical_bytes, sign, verify};
