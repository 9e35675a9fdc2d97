//! Encrypted seed store
//!
//! A custodial account keeps its own seed, encrypted under the owner's
//! password, in its generic storage. The encrypted record is spread over
//! `password_<n>` slots, so logging in only needs the account address and
//! the password.

use crate::config::{Config, SecurityConfig, StorageConfig};
use crate::crypto::keys::{Identity, Keypair, PublicId, Seed};
use crate::errors::{SeedKeepError, Result};
use crate::keystore::encrypted::EncryptedSeedRecord;
use crate::ledger::client::{
    resolve_address, with_timeout, AccountRecord, AddressResolver, LedgerClient, TransactionResult,
};
use crate::ledger::operations::{Amount, Operation};
use crate::storage::{chunk_data, glue_data, is_slot_key, ChunkMap};
use crate::submission::SubmissionQueue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Encrypt the seed of `identity` and lay it out as storage slots
///
/// The returned map is meant to be merged into the account's generic
/// storage; nothing is written here.
pub fn set_seed(
    identity: &Identity,
    password: &str,
    storage: &StorageConfig,
    security: &SecurityConfig,
) -> Result<ChunkMap> {
    let keypair = identity.require_keypair()?;

    if password.len() < security.min_password_len.max(1) {
        return Err(SeedKeepError::BadParameters(format!(
            "password must be at least {} bytes",
            security.min_password_len.max(1)
        )));
    }

    let record = EncryptedSeedRecord::seal(&keypair.seed(), password, &security.kdf)?;
    chunk_data(&storage.seed_prefix, record.to_bytes(), storage.chunk_size)
}

/// Recover the seed stored in the slots of `account`
///
/// No slots at all fails with `AccountNoSeedData`. A wrong password and a
/// damaged record cannot be told apart, both fail with `InvalidPassword`.
/// Records whose KDF costs exceed `security.kdf_limit()` are refused
/// before any key derivation runs.
pub fn extract_seed(
    account: &AccountRecord,
    password: &str,
    storage: &StorageConfig,
    security: &SecurityConfig,
) -> Result<Seed> {
    let account_id = account.account_id.to_string();

    let blob = glue_data(&storage.seed_prefix, &account.data).map_err(|e| match e {
        SeedKeepError::NoData(_) => SeedKeepError::AccountNoSeedData(account_id.clone()),
        other => {
            debug!("Seed slots of {} are damaged: {}", account_id, other);
            SeedKeepError::InvalidPassword(account_id.clone())
        }
    })?;

    let record = EncryptedSeedRecord::from_bytes(&blob)
        .map_err(|_| SeedKeepError::InvalidPassword(account_id.clone()))?;

    if !record.kdf().within(&security.kdf_limit()) {
        warn!(
            "Seed record of {} asks for KDF costs {:?}, above the accepted limit",
            account_id,
            record.kdf()
        );
        return Err(SeedKeepError::InvalidPassword(account_id));
    }

    record
        .open(password)
        .map_err(|_| SeedKeepError::InvalidPassword(account_id))
}

/// Password-protected custody of account seeds
pub struct SeedStore {
    ledger: Arc<dyn LedgerClient>,
    resolver: Arc<dyn AddressResolver>,
    queue: Arc<SubmissionQueue>,
    storage: StorageConfig,
    security: SecurityConfig,
    call_timeout: Duration,
}

impl SeedStore {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        resolver: Arc<dyn AddressResolver>,
        queue: Arc<SubmissionQueue>,
        config: &Config,
    ) -> Self {
        Self {
            ledger,
            resolver,
            queue,
            storage: config.storage.clone(),
            security: config.security.clone(),
            call_timeout: config.submission.call_timeout(),
        }
    }

    pub fn set_seed(&self, identity: &Identity, password: &str) -> Result<ChunkMap> {
        set_seed(identity, password, &self.storage, &self.security)
    }

    pub fn extract_seed(&self, account: &AccountRecord, password: &str) -> Result<Seed> {
        extract_seed(account, password, &self.storage, &self.security)
    }

    /// `set_seed` on the blocking pool
    async fn seal_slots(&self, keypair: &Keypair, password: &str) -> Result<ChunkMap> {
        let identity = Identity::from(keypair.clone());
        let password = Zeroizing::new(password.to_string());
        let storage = self.storage.clone();
        let security = self.security.clone();

        run_blocking(move || set_seed(&identity, &password, &storage, &security)).await
    }

    /// `extract_seed` on the blocking pool
    async fn open_slots(&self, account: &AccountRecord, password: &str) -> Result<Seed> {
        let account = account.clone();
        let password = Zeroizing::new(password.to_string());
        let storage = self.storage.clone();
        let security = self.security.clone();

        run_blocking(move || extract_seed(&account, &password, &storage, &security)).await
    }

    /// Store the seed of `keypair` in its own account
    pub async fn protect_account(
        &self,
        keypair: &Keypair,
        password: &str,
    ) -> Result<TransactionResult> {
        let slots = self.seal_slots(keypair, password).await?;
        self.write_slots(keypair, slots, &[]).await
    }

    /// Resolve `address`, fetch its account and decrypt the stored seed
    pub async fn get_keypair_from_login(&self, address: &str, password: &str) -> Result<Keypair> {
        let (keypair, _) = self.login(address, password).await?;
        Ok(keypair)
    }

    /// Create and fund a fresh account, then protect its seed
    ///
    /// If funding succeeds but storing the seed fails, the new account
    /// exists without a stored seed and the error is returned as is.
    pub async fn create_account_funded(
        &self,
        funding_seed: &Seed,
        funding_initial_amount: Amount,
        password: &str,
    ) -> Result<Keypair> {
        let funder = Identity::from(Keypair::from_seed(funding_seed));
        let keypair = Keypair::generate();

        // Encrypt before funding so a bad password never creates an account
        let slots = self.seal_slots(&keypair, password).await?;

        let funding = vec![Operation::create_account(
            keypair.public_id(),
            funding_initial_amount,
        )];
        self.queue.submit(&funder, funding, None).await?;
        info!(
            "Funded {} with {} from {}",
            keypair.public_id(),
            funding_initial_amount,
            funder.public_id()
        );

        if let Err(e) = self.write_slots(&keypair, slots, &[]).await {
            warn!(
                "Account {} was funded but its seed could not be stored: {}",
                keypair.public_id(),
                e
            );
            return Err(e);
        }

        Ok(keypair)
    }

    /// Re-encrypt the stored seed under a new password
    pub async fn change_password(
        &self,
        address: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<Keypair> {
        let (keypair, account) = self.login(address, old_password).await?;
        let slots = self.seal_slots(&keypair, new_password).await?;

        let stale: Vec<String> = account
            .data
            .keys()
            .filter(|key| is_slot_key(&self.storage.seed_prefix, key) && !slots.contains_key(*key))
            .cloned()
            .collect();

        self.write_slots(&keypair, slots, &stale).await?;
        info!("Password changed for {}", keypair.public_id());
        Ok(keypair)
    }

    async fn login(&self, address: &str, password: &str) -> Result<(Keypair, AccountRecord)> {
        let resolved = resolve_address(self.resolver.as_ref(), address, self.call_timeout)
            .await
            .map_err(|e| not_found_as_missing(e, address))?;

        let account = self
            .fetch_account(&resolved.account_id)
            .await
            .map_err(|e| not_found_as_missing(e, address))?;

        let seed = self.open_slots(&account, password).await?;
        let keypair = Keypair::from_seed(&seed);

        // A record copied from another account decrypts fine but signs for
        // the wrong identity
        if keypair.public_id() != account.account_id {
            return Err(SeedKeepError::InvalidPassword(account.account_id.to_string()));
        }

        debug!("Login succeeded for {}", account.account_id);
        Ok((keypair, account))
    }

    async fn fetch_account(&self, account_id: &PublicId) -> Result<AccountRecord> {
        with_timeout(
            self.call_timeout,
            "account fetch",
            self.ledger.get_account(account_id),
        )
        .await
    }

    async fn write_slots(
        &self,
        keypair: &Keypair,
        slots: ChunkMap,
        stale: &[String],
    ) -> Result<TransactionResult> {
        let mut operations = Operation::manage_data(&slots);
        operations.extend(stale.iter().map(|name| Operation::ManageData {
            name: name.clone(),
            value: None,
        }));

        debug!(
            "Writing {} seed slots for {} ({} removed)",
            slots.len(),
            keypair.public_id(),
            stale.len()
        );
        self.queue
            .submit(&Identity::from(keypair.clone()), operations, None)
            .await
    }
}

/// Run key derivation work off the async worker threads
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| SeedKeepError::InternalError(format!("KDF worker failed: {}", e)))?
}

fn not_found_as_missing(error: SeedKeepError, address: &str) -> SeedKeepError {
    if error.is_not_found() {
        SeedKeepError::AccountNotExist(address.to_string())
    } else {
        error
    }
}
