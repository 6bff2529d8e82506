use async_trait::async_trait;

use super::error::NodeClientError;

/// Live UTXO entry as reported by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutInfo {
    /// Output value in satoshis
    pub satoshis: u64,
    /// Confirmations of the containing transaction
    pub confirmations: u32,
}

/// Read-only view of the blockchain node. The node is the source of truth
/// for UTXO liveness, mempool membership and confirmation status.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// UTXO lookup including the mempool; `None` when spent or unknown
    async fn get_tx_out(&self, txid: &str, vout: u32) -> Result<Option<TxOutInfo>, NodeClientError>;

    /// Raw transaction hex; errors when the node does not know the txid
    async fn raw_transaction_hex(&self, txid: &str) -> Result<String, NodeClientError>;

    /// Txids currently in the node mempool
    async fn raw_mempool(&self) -> Result<Vec<String>, NodeClientError>;

    /// Hash of the containing block; errors when unknown or unconfirmed
    async fn transaction_block_hash(&self, txid: &str) -> Result<String, NodeClientError>;

    /// Current chain tip height
    async fn best_block_height(&self) -> Result<u64, NodeClientError>;
}
