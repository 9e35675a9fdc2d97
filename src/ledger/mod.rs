//! Ledger-facing types
//!
//! Operations, transaction envelopes and the traits through which the
//! external ledger client and address resolver are consumed.

pub mod client;
pub mod envelope;
pub mod operations;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{
    is_federation_address, resolve_address, with_timeout, AccountRecord, AddressResolver, Balance,
    LedgerClient, ResolvedAddress, TransactionResult,
};
pub use envelope::{DecoratedSignature, NetworkId, SignedEnvelope, TransactionEnvelope, BASE_FEE};
pub use operations::{Amount, Asset, Memo, Operation};
