//! Transaction envelopes
//!
//! An envelope is bound to one network: its hash covers the network id
//! (SHA-256 of the network passphrase), an envelope type tag and the
//! canonical bytes of the transaction. Signatures are Ed25519 over that
//! hash, decorated with the signer's key hint.

use crate::crypto::keys::{Keypair, PublicId};
use crate::crypto::signature::canonical_bytes;
use crate::errors::{SeedKeepError, Result};
use crate::ledger::operations::{Memo, Operation};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Fee charged per operation, in stroops
pub const BASE_FEE: u32 = 100;

/// Envelope type tag mixed into the signature base
const ENVELOPE_TYPE_TX: [u8; 4] = [0, 0, 0, 2];

/// Identity of a network, derived from its passphrase
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NetworkId([u8; 32]);

impl NetworkId {
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self(Sha256::digest(passphrase.as_bytes()).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetworkId({})", hex::encode(self.0))
    }
}

/// Unsigned transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub source: PublicId,
    pub sequence: i64,
    pub fee: u32,
    pub operations: Vec<Operation>,
    pub memo: Option<Memo>,
}

impl TransactionEnvelope {
    /// Build the next transaction for an account whose current sequence is
    /// `current_sequence`
    pub fn new(
        source: PublicId,
        current_sequence: i64,
        operations: Vec<Operation>,
        memo: Option<Memo>,
    ) -> Result<Self> {
        if operations.is_empty() {
            return Err(SeedKeepError::BadParameters(
                "a transaction needs at least one operation".to_string(),
            ));
        }

        let sequence = current_sequence.checked_add(1).ok_or_else(|| {
            SeedKeepError::InvalidInput(format!("sequence of {} exhausted", source))
        })?;
        let fee = BASE_FEE.saturating_mul(operations.len() as u32);

        Ok(Self {
            source,
            sequence,
            fee,
            operations,
            memo,
        })
    }

    /// Bytes covered by the transaction hash
    pub fn signature_base(&self, network: &NetworkId) -> Result<Vec<u8>> {
        let body = canonical_bytes(self)?;
        let mut base = Vec::with_capacity(32 + ENVELOPE_TYPE_TX.len() + body.len());
        base.extend_from_slice(network.as_bytes());
        base.extend_from_slice(&ENVELOPE_TYPE_TX);
        base.extend_from_slice(&body);
        Ok(base)
    }

    pub fn hash(&self, network: &NetworkId) -> Result<[u8; 32]> {
        Ok(Sha256::digest(self.signature_base(network)?).into())
    }

    /// Sign with the source account's key
    pub fn sign(self, keypair: &Keypair, network: &NetworkId) -> Result<SignedEnvelope> {
        if keypair.public_id() != self.source {
            return Err(SeedKeepError::BadParameters(format!(
                "{} cannot sign for source {}",
                keypair.public_id(),
                self.source
            )));
        }

        let hash = self.hash(network)?;
        let signature = DecoratedSignature {
            hint: hex::encode(keypair.public_id().hint()),
            signature: STANDARD.encode(keypair.sign(&hash)),
        };

        Ok(SignedEnvelope {
            hash: hex::encode(hash),
            envelope: self,
            signatures: vec![signature],
        })
    }
}

/// Signature plus the hint of the key that made it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratedSignature {
    /// Last four bytes of the signer's public key, hex
    pub hint: String,
    /// Ed25519 signature over the envelope hash, base64
    pub signature: String,
}

/// Envelope ready for submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub envelope: TransactionEnvelope,
    /// Transaction hash, hex
    pub hash: String,
    pub signatures: Vec<DecoratedSignature>,
}

impl SignedEnvelope {
    /// Check that `signer` signed this envelope for `network`
    pub fn verify_signer(&self, signer: &PublicId, network: &NetworkId) -> Result<()> {
        let hash = self.envelope.hash(network)?;
        let hint = hex::encode(signer.hint());

        let decorated = self
            .signatures
            .iter()
            .find(|s| s.hint == hint)
            .ok_or_else(|| SeedKeepError::Unauthorized(format!("No signature from {}", signer)))?;

        let signature = STANDARD.decode(&decorated.signature).map_err(|_| {
            SeedKeepError::Unauthorized(format!("Malformed signature from {}", signer))
        })?;
        signer.verify(&hash, &signature)
    }
}
