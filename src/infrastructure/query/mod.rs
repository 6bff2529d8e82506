//! Spend-index boundary: lookups against the persisted transaction index
//! maintained by the surrounding indexer.

use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// Spend recorded by the transaction index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxoSpendInfo {
    /// Txid of the spending transaction
    pub txid: String,
    /// Height of the spending transaction's block, `None` while unconfirmed
    pub block: Option<u64>,
    /// Hash of that block
    pub block_hash: Option<String>,
}

/// A MINT recorded by the transaction index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintInfo {
    /// Txid of the MINT transaction
    pub txid: String,
    /// Height of its block, `None` while unconfirmed
    pub block: Option<u64>,
}

/// Represents errors raised by the spend index
#[derive(Debug)]
pub enum QueryError {
    /// The backing store failed
    StoreError(String),
    /// A stored record could not be interpreted
    MalformedRecord(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::StoreError(msg) => write!(f, "Store error: {}", msg),
            QueryError::MalformedRecord(msg) => write!(f, "Malformed record: {}", msg),
        }
    }
}

impl Error for QueryError {}

/// Lookups the engine issues against the persisted transaction index.
/// The index lags the node; the engine treats it as a hint, never as the
/// source of truth.
#[async_trait]
pub trait SpendIndex: Send + Sync {
    /// Spending transaction that consumed `txid:vout` as a SEND input
    async fn txo_input_as_send(
        &self,
        txid: &str,
        vout: u32,
    ) -> Result<Option<TxoSpendInfo>, QueryError>;

    /// Spending transaction that consumed `txid:vout` as a MINT input
    async fn txo_input_as_mint(
        &self,
        txid: &str,
        vout: u32,
    ) -> Result<Option<TxoSpendInfo>, QueryError>;

    /// Every recorded SEND input spend of one token, keyed by `"txid:vout"`
    async fn send_spend_preload(
        &self,
        token_id: &str,
    ) -> Result<HashMap<String, TxoSpendInfo>, QueryError>;

    /// Every recorded MINT of one token
    async fn mint_transactions(&self, token_id: &str) -> Result<Vec<MintInfo>, QueryError>;

    /// Block height of the token's genesis transaction
    async fn token_genesis_block(&self, token_id: &str) -> Result<Option<u64>, QueryError>;

    /// Most recent block containing a valid MINT of the token
    async fn block_last_minted(&self, token_id: &str) -> Result<Option<u64>, QueryError>;

    /// Most recent block containing a valid SEND of the token
    async fn block_last_sent(&self, token_id: &str) -> Result<Option<u64>, QueryError>;
}
