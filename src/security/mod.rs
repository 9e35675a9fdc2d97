//! Secret material handling
//!
//! Plaintext never outlives the call that needed it: decrypted bytes and
//! seed text are wiped when dropped.

pub mod secret;

pub use secret::{Plaintext, SecretText};
