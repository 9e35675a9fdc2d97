//! Ledger operations
//!
//! The operation set a submission may carry, with the amount, asset and
//! memo types they use. Validation runs before anything is queued.

use crate::crypto::keys::PublicId;
use crate::errors::{SeedKeepError, Result};
use crate::storage::ChunkMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Smallest amount unit per whole unit (one stroop = 0.0000001)
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Maximum byte length of a data entry name and of its decoded value
pub const MAX_DATA_LEN: usize = 64;

/// Maximum byte length of a text memo
pub const MAX_MEMO_TEXT_LEN: usize = 28;

/// Fixed-point amount with seven decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_stroops(stroops: i64) -> Self {
        Self(stroops)
    }

    pub fn stroops(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl FromStr for Amount {
    type Err = SeedKeepError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SeedKeepError::BadParameters(format!("Invalid amount: {:?}", s));

        let text = s.trim();
        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
        if (whole.is_empty() && frac.is_empty())
            || frac.len() > 7
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac: i64 = format!("{:0<7}", frac).parse().map_err(|_| invalid())?;

        whole
            .checked_mul(STROOPS_PER_UNIT)
            .and_then(|v| v.checked_add(frac))
            .map(Amount)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let stroops = self.0.unsigned_abs();
        let unit = STROOPS_PER_UNIT as u64;
        let (whole, frac) = (stroops / unit, stroops % unit);
        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }
        let frac = format!("{:07}", frac);
        write!(f, "{}{}.{}", sign, whole, frac.trim_end_matches('0'))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Asset held or transferred on the network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "asset_type", rename_all = "snake_case")]
pub enum Asset {
    Native,
    Credit { code: String, issuer: PublicId },
}

impl Asset {
    pub fn credit(code: &str, issuer: PublicId) -> Result<Self> {
        validate_asset_code(code)?;
        Ok(Asset::Credit {
            code: code.to_string(),
            issuer,
        })
    }

    /// Stable identifier: `native` or `custom:CODE:ISSUER`
    pub fn uid(&self) -> String {
        match self {
            Asset::Native => "native".to_string(),
            Asset::Credit { code, issuer } => format!("custom:{}:{}", code, issuer),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }

    fn validate(&self) -> Result<()> {
        match self {
            Asset::Native => Ok(()),
            Asset::Credit { code, .. } => validate_asset_code(code),
        }
    }
}

fn validate_asset_code(code: &str) -> Result<()> {
    if code.is_empty() || code.len() > 12 || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(SeedKeepError::BadParameters(format!(
            "Invalid asset code: {:?}",
            code
        )));
    }
    Ok(())
}

/// Memo attached to a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Memo {
    Text(String),
    Id(u64),
    /// 32-byte hash, hex encoded
    Hash(String),
    /// 32-byte hash of a refunded transaction, hex encoded
    Return(String),
}

impl Memo {
    pub fn validate(&self) -> Result<()> {
        match self {
            Memo::Text(text) if text.len() > MAX_MEMO_TEXT_LEN => {
                Err(SeedKeepError::BadParameters(format!(
                    "Memo text exceeds {} bytes",
                    MAX_MEMO_TEXT_LEN
                )))
            }
            Memo::Hash(hash) | Memo::Return(hash) => match hex::decode(hash) {
                Ok(bytes) if bytes.len() == 32 => Ok(()),
                _ => Err(SeedKeepError::BadParameters(
                    "Memo hash must be 32 hex-encoded bytes".to_string(),
                )),
            },
            _ => Ok(()),
        }
    }
}

/// A single ledger operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    CreateAccount {
        destination: PublicId,
        starting_balance: Amount,
    },
    Payment {
        destination: PublicId,
        asset: Asset,
        amount: Amount,
    },
    /// Sets (`Some`) or deletes (`None`) a generic storage entry
    ManageData {
        name: String,
        value: Option<String>,
    },
    ChangeTrust {
        asset: Asset,
        limit: Option<Amount>,
    },
    AllowTrust {
        trustor: PublicId,
        asset_code: String,
        authorize: bool,
    },
    AccountMerge {
        destination: PublicId,
    },
}

impl Operation {
    pub fn create_account(destination: PublicId, starting_balance: Amount) -> Self {
        Operation::CreateAccount {
            destination,
            starting_balance,
        }
    }

    pub fn payment(destination: PublicId, asset: Asset, amount: Amount) -> Self {
        Operation::Payment {
            destination,
            asset,
            amount,
        }
    }

    pub fn change_trust(asset: Asset, limit: Option<Amount>) -> Self {
        Operation::ChangeTrust { asset, limit }
    }

    pub fn allow_trust(trustor: PublicId, asset_code: &str, authorize: bool) -> Self {
        Operation::AllowTrust {
            trustor,
            asset_code: asset_code.to_string(),
            authorize,
        }
    }

    pub fn account_merge(destination: PublicId) -> Self {
        Operation::AccountMerge { destination }
    }

    /// One `ManageData` per slot, in key order
    pub fn manage_data(entries: &ChunkMap) -> Vec<Operation> {
        entries
            .iter()
            .map(|(name, value)| Operation::ManageData {
                name: name.clone(),
                value: Some(value.clone()),
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::CreateAccount {
                starting_balance, ..
            } => require_positive(starting_balance, "starting balance"),
            Operation::Payment { asset, amount, .. } => {
                asset.validate()?;
                require_positive(amount, "payment amount")
            }
            Operation::ManageData { name, value } => {
                if name.is_empty() || name.len() > MAX_DATA_LEN {
                    return Err(SeedKeepError::BadParameters(format!(
                        "Data name must be 1 to {} bytes",
                        MAX_DATA_LEN
                    )));
                }
                if let Some(value) = value {
                    let decoded = STANDARD.decode(value).map_err(|_| {
                        SeedKeepError::BadParameters(format!("Data value for {} is not base64", name))
                    })?;
                    if decoded.len() > MAX_DATA_LEN {
                        return Err(SeedKeepError::BadParameters(format!(
                            "Data value for {} exceeds {} bytes",
                            name, MAX_DATA_LEN
                        )));
                    }
                }
                Ok(())
            }
            Operation::ChangeTrust { asset, limit } => {
                if asset.is_native() {
                    return Err(SeedKeepError::BadParameters(
                        "Cannot change trust on the native asset".to_string(),
                    ));
                }
                asset.validate()?;
                match limit {
                    Some(limit) if limit.stroops() < 0 => Err(SeedKeepError::BadParameters(
                        "Trust limit must not be negative".to_string(),
                    )),
                    _ => Ok(()),
                }
            }
            Operation::AllowTrust { asset_code, .. } => validate_asset_code(asset_code),
            Operation::AccountMerge { .. } => Ok(()),
        }
    }
}

fn require_positive(amount: &Amount, what: &str) -> Result<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(SeedKeepError::BadParameters(format!(
            "{} must be positive",
            what
        )))
    }
}
