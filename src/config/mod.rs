//! Configuration management for seedkeep
//!
//! Supports loading configuration from:
//! - Compiled defaults
//! - Config file (seedkeep.toml)
//! - Environment variables (SEEDKEEP_*)

use crate::errors::{SeedKeepError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Passphrase of the public test network
pub const TEST_NETWORK_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Largest value a single generic storage slot can hold, in bytes
pub const MAX_SLOT_SIZE: usize = 64;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Network configuration
    pub network: NetworkConfig,

    /// Account storage layout
    pub storage: StorageConfig,

    /// Security configuration
    pub security: SecurityConfig,

    /// Submission lane configuration
    pub submission: SubmissionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Passphrase that transaction signatures are bound to
    pub passphrase: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            passphrase: TEST_NETWORK_PASSPHRASE.to_string(),
        }
    }
}

/// Layout of the encrypted seed inside account generic storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key prefix of the seed slots
    pub seed_prefix: String,

    /// Bytes per slot
    pub chunk_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            seed_prefix: "password_".to_string(),
            chunk_size: MAX_SLOT_SIZE,
        }
    }
}

/// Argon2id parameters used to derive the seed encryption key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfConfig {
    /// Build the argon2 parameter set, rejecting out-of-range values
    pub fn params(&self) -> Result<argon2::Params> {
        argon2::Params::new(self.memory_kib, self.iterations, self.parallelism, Some(32))
            .map_err(|e| SeedKeepError::ConfigError(format!("Invalid KDF parameters: {}", e)))
    }

    /// Every cost multiplied by `factor`
    pub fn scaled(&self, factor: u32) -> KdfConfig {
        KdfConfig {
            memory_kib: self.memory_kib.saturating_mul(factor),
            iterations: self.iterations.saturating_mul(factor),
            parallelism: self.parallelism.saturating_mul(factor),
        }
    }

    /// Whether no cost exceeds the matching cost of `limit`
    pub fn within(&self, limit: &KdfConfig) -> bool {
        self.memory_kib <= limit.memory_kib
            && self.iterations <= limit.iterations
            && self.parallelism <= limit.parallelism
    }
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Key derivation parameters for new records
    pub kdf: KdfConfig,

    /// Minimum accepted password length in bytes
    pub min_password_len: usize,

    /// How far a stored record's KDF costs may exceed `kdf` before the
    /// record is refused
    pub kdf_headroom: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            kdf: KdfConfig::default(),
            min_password_len: 1,
            kdf_headroom: 2,
        }
    }
}

impl SecurityConfig {
    /// Highest KDF costs accepted from a stored record
    pub fn kdf_limit(&self) -> KdfConfig {
        self.kdf.scaled(self.kdf_headroom)
    }
}

/// Submission lane configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Upper bound for every external call, in milliseconds
    pub call_timeout_ms: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 30_000,
        }
    }
}

impl SubmissionConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults = config::Config::try_from(&Config::default())
            .map_err(|e| SeedKeepError::ConfigError(e.to_string()))?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("seedkeep").required(false));
        }

        // SEEDKEEP_SUBMISSION__CALL_TIMEOUT_MS, etc.
        builder = builder.add_source(
            config::Environment::with_prefix("SEEDKEEP")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| SeedKeepError::ConfigError(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| SeedKeepError::ConfigError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.network.passphrase.is_empty() {
            return Err(SeedKeepError::ConfigError(
                "network passphrase must not be empty".to_string(),
            ));
        }

        if self.storage.seed_prefix.is_empty() {
            return Err(SeedKeepError::ConfigError(
                "seed prefix must not be empty".to_string(),
            ));
        }

        if self.storage.chunk_size == 0 || self.storage.chunk_size > MAX_SLOT_SIZE {
            return Err(SeedKeepError::ConfigError(format!(
                "chunk size must be between 1 and {}, got {}",
                MAX_SLOT_SIZE, self.storage.chunk_size
            )));
        }

        self.security.kdf.params()?;

        if self.security.kdf_headroom == 0 {
            return Err(SeedKeepError::ConfigError(
                "kdf headroom must be at least 1".to_string(),
            ));
        }

        if self.submission.call_timeout_ms == 0 {
            return Err(SeedKeepError::ConfigError(
                "call timeout must be greater than zero".to_string(),
            ));
        }

        match self.logging.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(SeedKeepError::ConfigError(format!(
                "unknown log format: {}",
                other
            ))),
        }
    }
}
