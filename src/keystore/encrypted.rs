//! Encrypted seed records
//!
//! Handles encryption/decryption of seeds using AES-256-GCM with Argon2id
//! key derivation. The record is a flat byte string so it can be spread
//! over generic storage slots:
//!
//! ```text
//! version(1) | memory_kib(4) | iterations(4) | parallelism(4) | salt(16) | nonce(12) | ciphertext
//! ```
//!
//! KDF parameters travel with the record, so changing the configured
//! parameters never strands records written earlier.

use crate::config::KdfConfig;
use crate::crypto::keys::{Seed, KEY_LEN};
use crate::errors::{SeedKeepError, Result};
use crate::security::Plaintext;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Version};
use rand::RngCore;
use zeroize::Zeroizing;

/// Record format version
pub const RECORD_VERSION: u8 = 1;

/// Salt size for Argon2
const SALT_SIZE: usize = 16;

/// Nonce size for AES-GCM
const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size
const TAG_SIZE: usize = 16;

const HEADER_SIZE: usize = 1 + 4 * 3 + SALT_SIZE + NONCE_SIZE;

/// Upper bounds accepted from a stored header (1 GiB, 64 passes)
const MAX_MEMORY_KIB: u32 = 1 << 20;
const MAX_ITERATIONS: u32 = 64;

/// Encoded size of a record holding one seed
pub const RECORD_SIZE: usize = HEADER_SIZE + KEY_LEN + TAG_SIZE;

/// A seed encrypted under a password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSeedRecord {
    kdf: KdfConfig,
    salt: [u8; SALT_SIZE],
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl EncryptedSeedRecord {
    /// Encrypt a seed under `password`
    pub fn seal(seed: &Seed, password: &str, kdf: &KdfConfig) -> Result<Self> {
        let mut salt = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let params = kdf.params()?;
        let encryption_key = derive_key(password, &salt, params)
            .map_err(|e| SeedKeepError::EncryptionFailed(e.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(encryption_key.as_slice())
            .map_err(|e| SeedKeepError::EncryptionFailed(e.to_string()))?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), seed.expose().as_slice())
            .map_err(|e| SeedKeepError::EncryptionFailed(e.to_string()))?;

        Ok(Self {
            kdf: *kdf,
            salt,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt the seed
    ///
    /// A wrong password and a tampered record are indistinguishable here,
    /// both fail with `DecryptionFailed`.
    pub fn open(&self, password: &str) -> Result<Seed> {
        let params = self
            .kdf
            .params()
            .map_err(|e| SeedKeepError::DecryptionFailed(e.to_string()))?;
        let decryption_key = derive_key(password, &self.salt, params)
            .map_err(|e| SeedKeepError::DecryptionFailed(e.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(decryption_key.as_slice())
            .map_err(|e| SeedKeepError::DecryptionFailed(e.to_string()))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map(Plaintext::new)
            .map_err(|_| {
                SeedKeepError::DecryptionFailed("Decryption failed - wrong password?".to_string())
            })?;

        Seed::from_slice(&plaintext)
            .map_err(|e| SeedKeepError::DecryptionFailed(e.to_string()))
    }

    /// KDF parameters the record was sealed with
    pub fn kdf(&self) -> &KdfConfig {
        &self.kdf
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.ciphertext.len());
        out.push(RECORD_VERSION);
        out.extend_from_slice(&self.kdf.memory_kib.to_le_bytes());
        out.extend_from_slice(&self.kdf.iterations.to_le_bytes());
        out.extend_from_slice(&self.kdf.parallelism.to_le_bytes());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE + TAG_SIZE {
            return Err(SeedKeepError::DecryptionFailed(format!(
                "Record too short: {} bytes",
                bytes.len()
            )));
        }

        if bytes[0] != RECORD_VERSION {
            return Err(SeedKeepError::DecryptionFailed(format!(
                "Unsupported record version {}",
                bytes[0]
            )));
        }

        let read_u32 = |offset: usize| {
            let mut word = [0u8; 4];
            word.copy_from_slice(&bytes[offset..offset + 4]);
            u32::from_le_bytes(word)
        };

        let kdf = KdfConfig {
            memory_kib: read_u32(1),
            iterations: read_u32(5),
            parallelism: read_u32(9),
        };

        if kdf.memory_kib > MAX_MEMORY_KIB || kdf.iterations > MAX_ITERATIONS {
            return Err(SeedKeepError::DecryptionFailed(
                "Record KDF parameters out of range".to_string(),
            ));
        }

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&bytes[13..13 + SALT_SIZE]);

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[13 + SALT_SIZE..HEADER_SIZE]);

        Ok(Self {
            kdf,
            salt,
            nonce,
            ciphertext: bytes[HEADER_SIZE..].to_vec(),
        })
    }
}

/// Derive an encryption key from a password using Argon2id
fn derive_key(
    password: &str,
    salt: &[u8],
    params: argon2::Params,
) -> std::result::Result<Zeroizing<[u8; 32]>, argon2::Error> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; 32]);
    argon2.hash_password_into(password.as_bytes(), salt, output.as_mut_slice())?;

    Ok(output)
}
