//! Validity-oracle boundary: SLP consensus validation lives outside this
//! crate; the engine consumes its verdicts and maintains its caches.

use async_trait::async_trait;
use std::error::Error;
use std::fmt;

use crate::domain::models::SlpTokenDetails;

/// Cached verdict of the oracle for one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TxnValidation {
    /// Whether the transaction is a valid SLP transaction
    pub validity: bool,
    /// Decoded token details, when the script was parseable
    pub details: Option<SlpTokenDetails>,
    /// Reason the transaction failed validation
    pub invalid_reason: Option<String>,
}

/// Represents errors raised by the validity oracle
#[derive(Debug)]
pub enum OracleError {
    /// The oracle could not produce a verdict
    ValidationFailed(String),
    /// A raw transaction the oracle needs is unavailable
    MissingRawTransaction(String),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            OracleError::MissingRawTransaction(txid) => {
                write!(f, "Missing raw transaction: {}", txid)
            }
        }
    }
}

impl Error for OracleError {}

/// SLP validity oracle. `is_valid` verdicts are cached by the oracle; the
/// engine seeds that cache on snapshot restore and evicts entries when it
/// excises nodes, keeping both sides consistent.
#[async_trait]
pub trait ValidityOracle: Send + Sync {
    /// Validity of `txid` judged against `token_id`
    async fn is_valid(&self, txid: &str, token_id: &str) -> Result<bool, OracleError>;

    /// Cached verdict for `txid`, if one exists
    async fn validation(&self, txid: &str) -> Option<TxnValidation>;

    /// Raw transaction hex for each requested txid
    async fn raw_transactions(&self, txids: &[String]) -> Result<Vec<String>, OracleError>;

    /// Seed the verdict cache (snapshot restore)
    async fn seed_validation(&self, txid: &str, validation: TxnValidation);

    /// Drop the cached verdict and raw transaction for `txid`
    async fn evict(&self, txid: &str);
}
