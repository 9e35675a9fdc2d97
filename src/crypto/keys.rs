//! Network identities
//!
//! Provides:
//! - Ed25519 key generation
//! - Public identifiers (base58) and secret seeds (hex)
//! - The `Identity` variant that separates signing-capable identities
//!   from public-only ones

use crate::errors::{SeedKeepError, Result};
use crate::security::SecretText;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of a seed and of a public key in bytes
pub const KEY_LEN: usize = 32;

/// Public identifier of an account (Ed25519 verifying key)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicId([u8; KEY_LEN]);

impl PublicId {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Last four bytes, used as signature hint on envelopes
    pub fn hint(&self) -> [u8; 4] {
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&self.0[KEY_LEN - 4..]);
        hint
    }

    /// Check an Ed25519 signature made by this identity
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let verifying_key = VerifyingKey::from_bytes(&self.0)
            .map_err(|e| SeedKeepError::InvalidKeyFormat(e.to_string()))?;

        let signature = Signature::from_slice(signature).map_err(|_| {
            SeedKeepError::Unauthorized(format!("Malformed signature for {}", self))
        })?;

        verifying_key
            .verify(message, &signature)
            .map_err(|_| SeedKeepError::Unauthorized(format!("Invalid signature for {}", self)))
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicId({})", self)
    }
}

impl FromStr for PublicId {
    type Err = SeedKeepError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s).into_vec()?;
        if bytes.len() != KEY_LEN {
            return Err(SeedKeepError::InvalidKeyFormat(format!(
                "Public id must be {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            )));
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        VerifyingKey::from_bytes(&key)
            .map_err(|e| SeedKeepError::InvalidKeyFormat(e.to_string()))?;
        Ok(Self(key))
    }
}

impl Serialize for PublicId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Secret seed of an identity, zeroized on drop
pub struct Seed(Secret<[u8; KEY_LEN]>);

impl Seed {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Secret::new(bytes))
    }

    /// Create from a slice, rejecting anything that is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LEN {
            return Err(SeedKeepError::InvalidKeyFormat(format!(
                "Expected {} bytes seed, got {}",
                KEY_LEN,
                bytes.len()
            )));
        }

        let mut seed = [0u8; KEY_LEN];
        seed.copy_from_slice(bytes);
        Ok(Self::from_bytes(seed))
    }

    /// Parse the hex text form
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = zeroize::Zeroizing::new(hex::decode(s.trim())?);
        Self::from_slice(&bytes)
    }

    /// Hex text form - use with caution!
    pub fn to_hex(&self) -> SecretText {
        SecretText::new(hex::encode(self.expose()))
    }

    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.0.expose_secret()
    }
}

impl Clone for Seed {
    fn clone(&self) -> Self {
        Self::from_bytes(*self.expose())
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed([REDACTED])")
    }
}

/// Ed25519 key pair able to sign on behalf of its public id
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Create a new random key pair
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Reconstruct the key pair a seed belongs to
    pub fn from_seed(seed: &Seed) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed.expose()),
        }
    }

    pub fn public_id(&self) -> PublicId {
        PublicId(self.signing_key.verifying_key().to_bytes())
    }

    /// Export the secret seed - use with caution!
    pub fn seed(&self) -> Seed {
        Seed::from_bytes(self.signing_key.to_bytes())
    }

    /// Sign raw bytes, returning the 64-byte signature
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_id", &self.public_id())
            .finish_non_exhaustive()
    }
}

/// An account identity, with or without the ability to sign
#[derive(Debug, Clone)]
pub enum Identity {
    /// Seed is held, the identity can sign
    FullKeypair(Keypair),
    /// Only the public identifier is known
    PublicOnly(PublicId),
}

impl Identity {
    pub fn public_id(&self) -> PublicId {
        match self {
            Identity::FullKeypair(keypair) => keypair.public_id(),
            Identity::PublicOnly(id) => *id,
        }
    }

    pub fn keypair(&self) -> Option<&Keypair> {
        match self {
            Identity::FullKeypair(keypair) => Some(keypair),
            Identity::PublicOnly(_) => None,
        }
    }

    /// The key pair, or `BadParameters` when this identity cannot sign
    pub fn require_keypair(&self) -> Result<&Keypair> {
        self.keypair().ok_or_else(|| {
            SeedKeepError::BadParameters(format!(
                "Identity {} has no seed and cannot sign",
                self.public_id()
            ))
        })
    }
}

impl From<Keypair> for Identity {
    fn from(keypair: Keypair) -> Self {
        Identity::FullKeypair(keypair)
    }
}

impl From<PublicId> for Identity {
    fn from(id: PublicId) -> Self {
        Identity::PublicOnly(id)
    }
}
