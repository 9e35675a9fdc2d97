//! Seed custody
//!
//! This module provides:
//! - Password-encrypted seed records
//! - Storage of those records in account generic storage, and login

pub mod encrypted;
pub mod seed_store;

pub use encrypted::{EncryptedSeedRecord, RECORD_SIZE, RECORD_VERSION};
pub use seed_store::{extract_seed, set_seed, SeedStore};
