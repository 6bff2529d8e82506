//! Bitcoin Core RPC implementation of [`NodeSource`]

use async_trait::async_trait;
use bitcoincore_rpc::bitcoin::Txid;
use bitcoincore_rpc::{Auth, Client, RpcApi};
use std::str::FromStr;
use std::sync::Arc;

use super::error::NodeClientError;
use super::source::{NodeSource, TxOutInfo};
use crate::config::BitcoinConfig;
use crate::utils::logging;

/// Node RPC client for direct calls against a Bitcoin Core compatible node
#[derive(Debug)]
pub struct BitcoinCoreNode {
    client: Arc<Client>,
}

impl BitcoinCoreNode {
    /// Create a new node client
    pub fn new(url: &str, username: String, password: String) -> Result<Self, NodeClientError> {
        logging::log_node_connection_details(url, &username);
        let auth = Auth::UserPass(username, password);
        let client =
            Client::new(url, auth).map_err(|e| NodeClientError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create a new node client from configuration
    pub fn from_config(config: &BitcoinConfig) -> Result<Self, NodeClientError> {
        Self::new(
            &config.url(),
            config.username.clone(),
            config.password.clone(),
        )
    }

    fn parse_txid(txid: &str) -> Result<Txid, NodeClientError> {
        Txid::from_str(txid).map_err(|e| NodeClientError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl NodeSource for BitcoinCoreNode {
    async fn get_tx_out(&self, txid: &str, vout: u32) -> Result<Option<TxOutInfo>, NodeClientError> {
        let client = self.client.clone();
        let txid = Self::parse_txid(txid)?;
        let result = tokio::task::spawn_blocking(move || {
            client
                .get_tx_out(&txid, vout, Some(true))
                .map_err(NodeClientError::RpcError)
        })
        .await
        .map_err(|e| NodeClientError::ConnectionError(e.to_string()))??;

        Ok(result.map(|out| TxOutInfo {
            satoshis: out.value.to_sat(),
            confirmations: out.confirmations,
        }))
    }

    async fn raw_transaction_hex(&self, txid: &str) -> Result<String, NodeClientError> {
        let client = self.client.clone();
        let txid = Self::parse_txid(txid)?;
        tokio::task::spawn_blocking(move || {
            client
                .get_raw_transaction_hex(&txid, None)
                .map_err(NodeClientError::RpcError)
        })
        .await
        .map_err(|e| NodeClientError::ConnectionError(e.to_string()))?
    }

    async fn raw_mempool(&self) -> Result<Vec<String>, NodeClientError> {
        let client = self.client.clone();
        let txids = tokio::task::spawn_blocking(move || {
            client.get_raw_mempool().map_err(NodeClientError::RpcError)
        })
        .await
        .map_err(|e| NodeClientError::ConnectionError(e.to_string()))??;

        Ok(txids.iter().map(|t| t.to_string()).collect())
    }

    async fn transaction_block_hash(&self, txid: &str) -> Result<String, NodeClientError> {
        let client = self.client.clone();
        let txid = Self::parse_txid(txid)?;
        let info = tokio::task::spawn_blocking(move || {
            client
                .get_raw_transaction_info(&txid, None)
                .map_err(NodeClientError::RpcError)
        })
        .await
        .map_err(|e| NodeClientError::ConnectionError(e.to_string()))??;

        match info.blockhash {
            Some(hash) => Ok(hash.to_string()),
            None => Err(NodeClientError::NotFound(format!(
                "transaction {} is not confirmed",
                txid
            ))),
        }
    }

    async fn best_block_height(&self) -> Result<u64, NodeClientError> {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || {
            client.get_block_count().map_err(NodeClientError::RpcError)
        })
        .await
        .map_err(|e| NodeClientError::ConnectionError(e.to_string()))?
    }
}
