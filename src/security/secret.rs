//! Holders for secret material that wipe themselves on drop
//!
//! Decrypted seed bytes and the hex text of a seed pass through these
//! types. The `zeroize` derive keeps the wipe from being optimized away.

use std::fmt;
use std::ops::Deref;
use zeroize::ZeroizeOnDrop;

/// Output of a decryption
#[derive(ZeroizeOnDrop)]
pub struct Plaintext(Vec<u8>);

impl Plaintext {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Deref for Plaintext {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Plaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plaintext({} bytes)", self.0.len())
    }
}

/// Text rendering of a secret, such as a hex seed
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct SecretText(String);

impl SecretText {
    pub fn new(text: String) -> Self {
        Self(text)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretText(..)")
    }
}
