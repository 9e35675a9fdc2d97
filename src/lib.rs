//! seedkeep - Custodial seed storage for a federated payment network
//!
//! Accounts on the network carry a small key-value store. seedkeep uses it
//! to keep each account's signing seed, encrypted under the owner's
//! password, so a user can log in from anywhere with an address and a
//! password:
//! - Blobs are spread over bounded `<prefix><index>` storage slots
//! - Seeds are encrypted with AES-256-GCM under an Argon2id-derived key
//! - Arbitrary JSON payloads are signed and verified with Ed25519
//! - Transactions from one account are submitted strictly one at a time,
//!   so its sequence number never races
//!
//! The ledger client and the federation resolver are external; they are
//! consumed through [`LedgerClient`] and [`AddressResolver`].
//!
//! # Usage
//!
//! ```ignore
//! let config = Config::load(None)?;
//! init_logging(&config.logging)?;
//!
//! let session = Session::new(config, ledger, resolver)?;
//! let keypair = session
//!     .seed_store()
//!     .get_keypair_from_login("roberto*ngfar.io", &password)
//!     .await?;
//! ```

pub mod config;
pub mod crypto;
pub mod errors;
pub mod keystore;
pub mod ledger;
pub mod logging;
pub mod security;
pub mod session;
pub mod storage;
pub mod submission;

pub use config::Config;
pub use crypto::{Identity, Keypair, PublicId, Seed};
pub use errors::{Result, SeedKeepError};
pub use keystore::SeedStore;
pub use ledger::{AddressResolver, LedgerClient};
pub use logging::init_logging;
pub use session::Session;
pub use submission::SubmissionQueue;
