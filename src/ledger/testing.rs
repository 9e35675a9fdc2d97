//! In-memory ledger and resolver for tests

use crate::config::TEST_NETWORK_PASSPHRASE;
use crate::crypto::keys::PublicId;
use crate::errors::{SeedKeepError, Result};
use crate::ledger::client::{
    AccountRecord, AddressResolver, Balance, LedgerClient, ResolvedAddress, TransactionResult,
};
use crate::ledger::envelope::{NetworkId, SignedEnvelope};
use crate::ledger::operations::{Amount, Asset, Memo, Operation};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Ledger double that behaves like a single validating node
///
/// Submissions are checked the way the network checks them: the source must
/// exist, the envelope must carry its signature for this network and the
/// sequence must be exactly one past the account's. Accepted transactions
/// apply `CreateAccount` and `ManageData`; other operations are recorded
/// without effect.
pub(crate) struct MemoryLedger {
    network: NetworkId,
    accounts: Mutex<HashMap<PublicId, AccountRecord>>,
    addresses: Mutex<HashMap<String, PublicId>>,
    submitted: Mutex<Vec<SignedEnvelope>>,
    resolve_calls: AtomicUsize,
    ledger_seq: AtomicU64,
    fetch_delay: Duration,
    failing_memo: Mutex<Option<String>>,
    hang: AtomicBool,
    reject_data: AtomicBool,
}

impl MemoryLedger {
    pub(crate) fn new() -> Self {
        Self {
            network: NetworkId::from_passphrase(TEST_NETWORK_PASSPHRASE),
            accounts: Mutex::new(HashMap::new()),
            addresses: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            resolve_calls: AtomicUsize::new(0),
            ledger_seq: AtomicU64::new(1),
            fetch_delay: Duration::ZERO,
            failing_memo: Mutex::new(None),
            hang: AtomicBool::new(false),
            reject_data: AtomicBool::new(false),
        }
    }

    /// Delay every account fetch, widening the window for sequence races
    pub(crate) fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub(crate) fn network(&self) -> NetworkId {
        self.network
    }

    /// Create an account holding `balance` lumens
    pub(crate) fn fund_account(&self, id: PublicId, balance: Amount) {
        let mut record = AccountRecord::new(id, self.next_starting_sequence());
        record.balances.push(Balance {
            asset: Asset::Native,
            balance,
        });
        self.accounts.lock().unwrap().insert(id, record);
    }

    pub(crate) fn account(&self, id: &PublicId) -> Option<AccountRecord> {
        self.accounts.lock().unwrap().get(id).cloned()
    }

    /// Overwrite one generic storage entry directly
    pub(crate) fn put_data(&self, id: &PublicId, name: &str, value: &str) {
        if let Some(record) = self.accounts.lock().unwrap().get_mut(id) {
            record.data.insert(name.to_string(), value.to_string());
        }
    }

    pub(crate) fn register_address(&self, address: &str, id: PublicId) {
        self.addresses
            .lock()
            .unwrap()
            .insert(address.to_string(), id);
    }

    pub(crate) fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    /// Accepted envelopes, in acceptance order
    pub(crate) fn submitted(&self) -> Vec<SignedEnvelope> {
        self.submitted.lock().unwrap().clone()
    }

    /// Reject every submission whose memo is `Text(text)`
    pub(crate) fn fail_memo(&self, text: &str) {
        *self.failing_memo.lock().unwrap() = Some(text.to_string());
    }

    /// Make submissions never complete
    pub(crate) fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    /// Reject every transaction that touches generic storage
    pub(crate) fn set_reject_data(&self, reject: bool) {
        self.reject_data.store(reject, Ordering::SeqCst);
    }

    fn next_starting_sequence(&self) -> i64 {
        (self.ledger_seq.load(Ordering::SeqCst) as i64) << 32
    }

    fn apply(
        accounts: &mut HashMap<PublicId, AccountRecord>,
        source: &PublicId,
        operation: &Operation,
        starting_sequence: i64,
    ) -> Result<()> {
        match operation {
            Operation::CreateAccount {
                destination,
                starting_balance,
            } => {
                if accounts.contains_key(destination) {
                    return Err(failed("op_already_exists"));
                }
                debit(accounts, source, *starting_balance)?;

                let mut record = AccountRecord::new(*destination, starting_sequence);
                record.balances.push(Balance {
                    asset: Asset::Native,
                    balance: *starting_balance,
                });
                accounts.insert(*destination, record);
            }
            Operation::ManageData { name, value } => {
                let record = accounts
                    .get_mut(source)
                    .ok_or_else(|| failed("tx_no_source_account"))?;
                match value {
                    Some(value) => {
                        record.data.insert(name.clone(), value.clone());
                    }
                    None => {
                        record.data.remove(name);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn failed(code: &str) -> SeedKeepError {
    SeedKeepError::TransactionFailed(code.to_string())
}

fn debit(
    accounts: &mut HashMap<PublicId, AccountRecord>,
    source: &PublicId,
    amount: Amount,
) -> Result<()> {
    let record = accounts
        .get_mut(source)
        .ok_or_else(|| failed("tx_no_source_account"))?;
    let native = record
        .balances
        .iter_mut()
        .find(|b| b.asset.is_native())
        .ok_or_else(|| failed("op_underfunded"))?;

    if native.balance.stroops() < amount.stroops() {
        return Err(failed("op_underfunded"));
    }
    native.balance = Amount::from_stroops(native.balance.stroops() - amount.stroops());
    Ok(())
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn get_account(&self, account_id: &PublicId) -> Result<AccountRecord> {
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.account(account_id)
            .ok_or_else(|| SeedKeepError::NotFound(format!("Account {}", account_id)))
    }

    async fn submit_transaction(&self, signed: &SignedEnvelope) -> Result<TransactionResult> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let failing = self.failing_memo.lock().unwrap().clone();
        if let (Some(failing), Some(Memo::Text(text))) = (failing, &signed.envelope.memo) {
            if &failing == text {
                return Err(SeedKeepError::InternalError(format!(
                    "injected failure for memo {}",
                    text
                )));
            }
        }

        let envelope = &signed.envelope;
        if self.reject_data.load(Ordering::SeqCst)
            && envelope
                .operations
                .iter()
                .any(|op| matches!(op, Operation::ManageData { .. }))
        {
            return Err(failed("op_low_reserve"));
        }

        let mut accounts = self.accounts.lock().unwrap();
        let current = accounts
            .get(&envelope.source)
            .ok_or_else(|| failed("tx_no_source_account"))?
            .sequence;

        signed
            .verify_signer(&envelope.source, &self.network)
            .map_err(|_| failed("tx_bad_auth"))?;

        if envelope.sequence != current + 1 {
            return Err(failed("tx_bad_seq"));
        }

        let ledger = self.ledger_seq.fetch_add(1, Ordering::SeqCst);
        let starting_sequence = ((ledger + 1) as i64) << 32;

        // Operations apply all-or-nothing
        let mut staged = accounts.clone();
        for operation in &envelope.operations {
            Self::apply(&mut staged, &envelope.source, operation, starting_sequence)?;
        }
        if let Some(record) = staged.get_mut(&envelope.source) {
            record.sequence = envelope.sequence;
        }
        *accounts = staged;
        drop(accounts);

        self.submitted.lock().unwrap().push(signed.clone());

        Ok(TransactionResult {
            hash: signed.hash.clone(),
            ledger: Some(ledger),
        })
    }
}

#[async_trait]
impl AddressResolver for MemoryLedger {
    async fn resolve(&self, address: &str) -> Result<ResolvedAddress> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let account_id = self
            .addresses
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .ok_or_else(|| SeedKeepError::NotFound(format!("Address {}", address)))?;

        Ok(ResolvedAddress {
            account_id,
            stellar_address: Some(address.to_string()),
        })
    }
}
