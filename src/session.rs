//! Client session
//!
//! Owns the submission lane registry and the seed store for one set of
//! external collaborators. Lanes live exactly as long as the session.

use crate::config::Config;
use crate::crypto::keys::Identity;
use crate::errors::Result;
use crate::keystore::SeedStore;
use crate::ledger::client::{
    resolve_address, AddressResolver, LedgerClient, ResolvedAddress, TransactionResult,
};
use crate::ledger::envelope::NetworkId;
use crate::ledger::operations::{Memo, Operation};
use crate::submission::SubmissionQueue;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::info;

pub struct Session {
    config: Config,
    network: NetworkId,
    resolver: Arc<dyn AddressResolver>,
    queue: Arc<SubmissionQueue>,
    seed_store: SeedStore,
}

impl Session {
    /// Validate `config` and wire the session around the given collaborators
    pub fn new(
        config: Config,
        ledger: Arc<dyn LedgerClient>,
        resolver: Arc<dyn AddressResolver>,
    ) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(SubmissionQueue::new(
            ledger.clone(),
            &config.network,
            &config.submission,
        ));
        let seed_store = SeedStore::new(ledger, resolver.clone(), queue.clone(), &config);

        info!(
            "Session ready (network {:?}, timeout {:?})",
            config.network.passphrase,
            config.submission.call_timeout()
        );

        Ok(Self {
            network: NetworkId::from_passphrase(&config.network.passphrase),
            config,
            resolver,
            queue,
            seed_store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn queue(&self) -> &Arc<SubmissionQueue> {
        &self.queue
    }

    pub fn seed_store(&self) -> &SeedStore {
        &self.seed_store
    }

    /// Queue operations on the lane of `source`
    pub fn submit(
        &self,
        source: &Identity,
        operations: Vec<Operation>,
        memo: Option<Memo>,
    ) -> BoxFuture<'static, Result<TransactionResult>> {
        self.queue.submit(source, operations, memo)
    }

    pub async fn resolve_address(&self, address: &str) -> Result<ResolvedAddress> {
        resolve_address(
            self.resolver.as_ref(),
            address,
            self.config.submission.call_timeout(),
        )
        .await
    }

    /// Drop all submission lanes
    pub fn reset(&self) {
        self.queue.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;
    use crate::errors::SeedKeepError;
    use crate::keystore::encrypted::tests::light_kdf;
    use crate::ledger::operations::{Amount, Asset};
    use crate::ledger::testing::MemoryLedger;

    fn session_with(ledger: &Arc<MemoryLedger>) -> Session {
        let mut config = Config::default();
        config.security.kdf = light_kdf();
        Session::new(config, ledger.clone(), ledger.clone()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let ledger = Arc::new(MemoryLedger::new());
        let mut config = Config::default();
        config.storage.chunk_size = 0;

        assert!(matches!(
            Session::new(config, ledger.clone(), ledger),
            Err(SeedKeepError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_signup_login_and_pay() {
        let ledger = Arc::new(MemoryLedger::new());
        let session = session_with(&ledger);
        assert_eq!(session.network(), ledger.network());

        let bank = Keypair::generate();
        ledger.fund_account(bank.public_id(), "1000".parse::<Amount>().unwrap());

        let created = session
            .seed_store()
            .create_account_funded(&bank.seed(), "20".parse().unwrap(), "correct horse")
            .await
            .unwrap();
        ledger.register_address("roberto*ngfar.io", created.public_id());

        let resolved = session.resolve_address("roberto*ngfar.io").await.unwrap();
        assert_eq!(resolved.account_id, created.public_id());

        let keypair = session
            .seed_store()
            .get_keypair_from_login("roberto*ngfar.io", "correct horse")
            .await
            .unwrap();

        let payment = Operation::payment(bank.public_id(), Asset::Native, "1".parse().unwrap());
        let outcome = session
            .submit(&Identity::from(keypair), vec![payment], Some(Memo::Id(1)))
            .await
            .unwrap();

        let last = ledger.submitted().pop().unwrap();
        assert_eq!(outcome.hash, last.hash);
        assert!(last
            .verify_signer(&created.public_id(), &session.network())
            .is_ok());
    }

    #[tokio::test]
    async fn test_reset_drops_lanes() {
        let ledger = Arc::new(MemoryLedger::new());
        let session = session_with(&ledger);
        let keypair = Keypair::generate();
        ledger.fund_account(keypair.public_id(), "10".parse::<Amount>().unwrap());

        session
            .seed_store()
            .protect_account(&keypair, "pw")
            .await
            .unwrap();
        assert_eq!(session.queue().lane_count(), 1);

        session.reset();
        assert_eq!(session.queue().lane_count(), 0);
    }
}
