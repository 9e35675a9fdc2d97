//! External collaborators
//!
//! The ledger network client and the address-resolution service live
//! outside this crate. They are consumed through these traits; any error
//! meaning "no such account / address" must be reported as
//! `SeedKeepError::NotFound`.

use crate::crypto::keys::PublicId;
use crate::errors::{SeedKeepError, Result};
use crate::ledger::envelope::SignedEnvelope;
use crate::ledger::operations::{Amount, Asset};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Balance line of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: Asset,
    pub balance: Amount,
}

/// Account state as reported by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_id: PublicId,
    /// Current sequence number; the next transaction uses `sequence + 1`
    pub sequence: i64,
    /// Generic key-value storage, values base64 encoded
    #[serde(default)]
    pub data: HashMap<String, String>,
    #[serde(default)]
    pub balances: Vec<Balance>,
}

impl AccountRecord {
    pub fn new(account_id: PublicId, sequence: i64) -> Self {
        Self {
            account_id,
            sequence,
            data: HashMap::new(),
            balances: Vec::new(),
        }
    }

    pub fn balance_of(&self, asset: &Asset) -> Option<Amount> {
        self.balances
            .iter()
            .find(|b| &b.asset == asset)
            .map(|b| b.balance)
    }
}

/// Outcome of an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Transaction hash, hex
    pub hash: String,
    /// Ledger the transaction was included in, when reported
    pub ledger: Option<u64>,
}

/// Result of resolving a human-readable address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub account_id: PublicId,
    /// Federation address the id was resolved from, if any
    pub stellar_address: Option<String>,
}

/// Ledger network client
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetch an account; unknown accounts fail with `NotFound`
    async fn get_account(&self, account_id: &PublicId) -> Result<AccountRecord>;

    /// Submit a signed transaction
    async fn submit_transaction(&self, envelope: &SignedEnvelope) -> Result<TransactionResult>;
}

/// Federation address resolver
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve `name*domain`; unknown addresses fail with `NotFound`
    async fn resolve(&self, address: &str) -> Result<ResolvedAddress>;
}

/// Whether `address` has the `name*domain` federation shape
pub fn is_federation_address(address: &str) -> bool {
    match address.split_once('*') {
        Some((name, domain)) => {
            !name.is_empty() && !domain.is_empty() && !domain.contains('*') && domain.contains('.')
        }
        None => false,
    }
}

/// Resolve an address to an account id
///
/// A plain public id resolves to itself without calling the resolver.
pub async fn resolve_address(
    resolver: &dyn AddressResolver,
    address: &str,
    timeout: Duration,
) -> Result<ResolvedAddress> {
    let address = address.trim();
    if let Ok(account_id) = address.parse::<PublicId>() {
        return Ok(ResolvedAddress {
            account_id,
            stellar_address: None,
        });
    }

    if !is_federation_address(address) {
        return Err(SeedKeepError::BadParameters(format!(
            "{:?} is neither an account id nor a federation address",
            address
        )));
    }

    debug!("Resolving federation address {}", address);
    with_timeout(timeout, "address resolution", resolver.resolve(address)).await
}

/// Bound an external call; expiry fails with `Timeout`
pub async fn with_timeout<T, F>(timeout: Duration, what: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| SeedKeepError::Timeout(format!("{} after {:?}", what, timeout)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{Keypair, Seed};
    use crate::ledger::testing::MemoryLedger;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_federation_address_shape() {
        assert!(is_federation_address("roberto*ngfar.io"));
        assert!(!is_federation_address("roberto"));
        assert!(!is_federation_address("*ngfar.io"));
        assert!(!is_federation_address("a*b*c.io"));
        assert!(!is_federation_address("roberto*localhost"));
    }

    #[tokio::test]
    async fn test_public_id_short_circuits() {
        let ledger = MemoryLedger::new();
        let id = Keypair::from_seed(&Seed::from_bytes([4u8; 32])).public_id();

        let resolved = resolve_address(&ledger, &id.to_string(), TIMEOUT).await.unwrap();
        assert_eq!(resolved.account_id, id);
        assert_eq!(ledger.resolve_calls(), 0);
    }

    #[tokio::test]
    async fn test_federation_lookup() {
        let ledger = MemoryLedger::new();
        let id = Keypair::from_seed(&Seed::from_bytes([4u8; 32])).public_id();
        ledger.register_address("alice*example.org", id);

        let resolved = resolve_address(&ledger, "alice*example.org", TIMEOUT).await.unwrap();
        assert_eq!(resolved.account_id, id);
        assert_eq!(ledger.resolve_calls(), 1);

        assert!(matches!(
            resolve_address(&ledger, "bob*example.org", TIMEOUT).await,
            Err(SeedKeepError::NotFound(_))
        ));
        assert!(matches!(
            resolve_address(&ledger, "garbage", TIMEOUT).await,
            Err(SeedKeepError::BadParameters(_))
        ));
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: Result<()> = with_timeout(Duration::from_millis(10), "nothing", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(SeedKeepError::Timeout(_))));
    }
}
