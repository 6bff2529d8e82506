//! Spend resolution for token and baton outputs.
//!
//! Each output's status is derived through an ordered chain of sources:
//! the startup preload cache, the live bounded cache, the node's UTXO set,
//! the spend index, and finally the validity oracle for the spender.
//! Source errors degrade to a conservative status instead of aborting the
//! graph walk.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::GraphConfig;
use crate::domain::models::{outpoint_key, BatonUtxoStatus, SlpTransactionType, TokenUtxoStatus};
use crate::infrastructure::cache::SpendCache;
use crate::infrastructure::node::NodeSource;
use crate::infrastructure::query::{SpendIndex, TxoSpendInfo};
use crate::infrastructure::sync::SyncStatus;
use crate::infrastructure::validation::ValidityOracle;
use crate::utils::logging::{log_debug, log_warning};

const NO_BCH_VOUT: &str = "SLP output has no corresponding BCH output.";

/// Resolved spend state for a token-bearing output
#[derive(Debug, Clone)]
pub struct TokenSpendDetails {
    pub status: TokenUtxoStatus,
    pub spend_txid: Option<String>,
    pub invalid_reason: Option<String>,
}

/// Resolved spend state for a minting-baton output
#[derive(Debug, Clone)]
pub struct BatonSpendDetails {
    pub status: BatonUtxoStatus,
    pub spend_txid: Option<String>,
    pub invalid_reason: Option<String>,
}

pub struct SpendResolver {
    token_id: String,
    node: Arc<dyn NodeSource>,
    spend_index: Arc<dyn SpendIndex>,
    oracle: Arc<dyn ValidityOracle>,
    sync: Arc<SyncStatus>,
    startup_cache: Option<HashMap<String, TxoSpendInfo>>,
    live_cache: SpendCache,
    mature_spend_depth: u64,
}

impl SpendResolver {
    pub fn new(
        token_id: String,
        node: Arc<dyn NodeSource>,
        spend_index: Arc<dyn SpendIndex>,
        oracle: Arc<dyn ValidityOracle>,
        sync: Arc<SyncStatus>,
        config: &GraphConfig,
    ) -> Self {
        Self {
            token_id,
            node,
            spend_index,
            oracle,
            sync,
            startup_cache: None,
            live_cache: SpendCache::new(config.spend_cache_capacity),
            mature_spend_depth: config.mature_spend_depth,
        }
    }

    /// Bulk-load every recorded SEND spend for the token ahead of the
    /// initial graph walk. Returns the number of cached entries.
    pub async fn preload(&mut self) -> Result<usize, crate::infrastructure::query::QueryError> {
        let cache = self.spend_index.send_spend_preload(&self.token_id).await?;
        let count = cache.len();
        self.startup_cache = Some(cache);
        Ok(count)
    }

    /// Startup preload entries, while still held
    pub fn startup_spends(&self) -> Option<&HashMap<String, TxoSpendInfo>> {
        self.startup_cache.as_ref()
    }

    pub fn drop_startup_cache(&mut self) {
        self.startup_cache = None;
    }

    pub fn clear_live_cache(&mut self) {
        self.live_cache.clear();
    }

    /// Resolve the spend state of token output `txid:vout`.
    ///
    /// `vout_count` is the number of outputs the raw transaction actually
    /// carries; a committed vout at or past it has no BCH counterpart.
    /// `process_up_to` caps the replay: spends after it read as unspent.
    pub async fn token_spend(
        &mut self,
        txid: &str,
        vout: u32,
        vout_count: usize,
        process_up_to: Option<u64>,
    ) -> TokenSpendDetails {
        match self
            .resolve_token_spend(txid, vout, vout_count, process_up_to)
            .await
        {
            Ok(details) => details,
            Err(message) => {
                log_warning(&format!(
                    "Spend resolution failed for {}:{}: {}",
                    txid, vout, message
                ));
                if (vout as usize) < vout_count {
                    let invalid_reason = self.owner_invalid_reason(txid).await;
                    TokenSpendDetails {
                        status: TokenUtxoStatus::SpentInvalidSlp,
                        spend_txid: None,
                        invalid_reason,
                    }
                } else {
                    TokenSpendDetails {
                        status: TokenUtxoStatus::MissingBchVout,
                        spend_txid: None,
                        invalid_reason: Some(NO_BCH_VOUT.to_string()),
                    }
                }
            }
        }
    }

    /// Resolve the spend state of the minting-baton output `txid:vout`
    pub async fn baton_spend(
        &mut self,
        txid: &str,
        vout: u32,
        vout_count: usize,
        process_up_to: Option<u64>,
    ) -> BatonSpendDetails {
        match self
            .resolve_baton_spend(txid, vout, vout_count, process_up_to)
            .await
        {
            Ok(details) => details,
            Err(message) => {
                log_warning(&format!(
                    "Baton spend resolution failed for {}:{}: {}",
                    txid, vout, message
                ));
                if (vout as usize) < vout_count {
                    let invalid_reason = self.owner_invalid_reason(txid).await;
                    BatonSpendDetails {
                        status: BatonUtxoStatus::BatonSpentInvalidSlp,
                        spend_txid: None,
                        invalid_reason,
                    }
                } else {
                    BatonSpendDetails {
                        status: BatonUtxoStatus::BatonMissingBchVout,
                        spend_txid: None,
                        invalid_reason: Some(NO_BCH_VOUT.to_string()),
                    }
                }
            }
        }
    }

    async fn resolve_token_spend(
        &mut self,
        txid: &str,
        vout: u32,
        vout_count: usize,
        process_up_to: Option<u64>,
    ) -> Result<TokenSpendDetails, String> {
        let key = outpoint_key(txid, vout);

        let mut cached = self.startup_cache.as_ref().and_then(|c| c.get(&key)).cloned();
        if cached.is_some() {
            log_debug(&format!("Startup spend cache hit for {}", key));
        } else if let Some(live) = self.live_cache.get(&key) {
            log_debug(&format!("Live spend cache hit for {}", key));
            cached = Some(live.clone());
        }

        if cached.is_none() {
            let tx_out = self
                .node
                .get_tx_out(txid, vout)
                .await
                .map_err(|e| e.to_string())?;
            if tx_out.is_some() {
                return Ok(TokenSpendDetails {
                    status: TokenUtxoStatus::Unspent,
                    spend_txid: None,
                    invalid_reason: None,
                });
            }
        }

        let spend = match cached {
            Some(info) => Some(info),
            None => {
                let info = self
                    .spend_index
                    .txo_input_as_send(txid, vout)
                    .await
                    .map_err(|e| e.to_string())?;
                if let Some(found) = &info {
                    self.cache_if_mature(&key, found);
                }
                info
            }
        };

        let spend = match spend {
            Some(info) => info,
            None => {
                // No UTXO entry and no recorded spend
                if (vout as usize) < vout_count {
                    return Ok(TokenSpendDetails {
                        status: TokenUtxoStatus::SpentNonSlp,
                        spend_txid: None,
                        invalid_reason: None,
                    });
                }
                return Ok(TokenSpendDetails {
                    status: TokenUtxoStatus::MissingBchVout,
                    spend_txid: None,
                    invalid_reason: Some(NO_BCH_VOUT.to_string()),
                });
            }
        };

        if replay_hides_spend(process_up_to, spend.block) {
            return Ok(TokenSpendDetails {
                status: TokenUtxoStatus::Unspent,
                spend_txid: None,
                invalid_reason: None,
            });
        }

        let valid = self
            .oracle
            .is_valid(&spend.txid, &self.token_id)
            .await
            .map_err(|e| e.to_string())?;
        let validation = self.oracle.validation(&spend.txid).await;

        if valid {
            let details = validation.and_then(|v| v.details);
            let status = match details {
                Some(d) if d.token_id != self.token_id => TokenUtxoStatus::SpentWrongToken,
                Some(d) if d.transaction_type == SlpTransactionType::Send => {
                    TokenUtxoStatus::SpentSameToken
                }
                _ => TokenUtxoStatus::SpentNotInSend,
            };
            return Ok(TokenSpendDetails {
                status,
                spend_txid: Some(spend.txid),
                invalid_reason: None,
            });
        }

        // The spender can be a perfectly valid transaction of another token;
        // the token-scoped oracle reports those as invalid.
        if let Some(v) = &validation {
            if v.validity
                && v.details
                    .as_ref()
                    .is_some_and(|d| d.token_id != self.token_id)
            {
                return Ok(TokenSpendDetails {
                    status: TokenUtxoStatus::SpentWrongToken,
                    spend_txid: Some(spend.txid),
                    invalid_reason: None,
                });
            }
        }

        let mut invalid_reason = validation.and_then(|v| v.invalid_reason);
        if invalid_reason.is_none() {
            invalid_reason = self.owner_invalid_reason(txid).await;
        }
        Ok(TokenSpendDetails {
            status: TokenUtxoStatus::SpentInvalidSlp,
            spend_txid: Some(spend.txid),
            invalid_reason,
        })
    }

    async fn resolve_baton_spend(
        &mut self,
        txid: &str,
        vout: u32,
        vout_count: usize,
        process_up_to: Option<u64>,
    ) -> Result<BatonSpendDetails, String> {
        let tx_out = self
            .node
            .get_tx_out(txid, vout)
            .await
            .map_err(|e| e.to_string())?;
        if tx_out.is_some() {
            return Ok(BatonSpendDetails {
                status: BatonUtxoStatus::BatonUnspent,
                spend_txid: None,
                invalid_reason: None,
            });
        }

        let spend = match self
            .spend_index
            .txo_input_as_mint(txid, vout)
            .await
            .map_err(|e| e.to_string())?
        {
            Some(info) => info,
            None => {
                // No UTXO entry and no recorded spend
                if (vout as usize) < vout_count {
                    return Ok(BatonSpendDetails {
                        status: BatonUtxoStatus::BatonSpentNonSlp,
                        spend_txid: None,
                        invalid_reason: None,
                    });
                }
                return Ok(BatonSpendDetails {
                    status: BatonUtxoStatus::BatonMissingBchVout,
                    spend_txid: None,
                    invalid_reason: Some(NO_BCH_VOUT.to_string()),
                });
            }
        };

        if replay_hides_spend(process_up_to, spend.block) {
            return Ok(BatonSpendDetails {
                status: BatonUtxoStatus::BatonUnspent,
                spend_txid: None,
                invalid_reason: None,
            });
        }

        let valid = self
            .oracle
            .is_valid(&spend.txid, &self.token_id)
            .await
            .map_err(|e| e.to_string())?;
        let validation = self.oracle.validation(&spend.txid).await;

        if valid {
            let is_mint = validation
                .and_then(|v| v.details)
                .is_some_and(|d| d.transaction_type == SlpTransactionType::Mint);
            if is_mint {
                return Ok(BatonSpendDetails {
                    status: BatonUtxoStatus::BatonSpentInMint,
                    spend_txid: Some(spend.txid),
                    invalid_reason: None,
                });
            }
            return Ok(BatonSpendDetails {
                status: BatonUtxoStatus::BatonSpentNotInMint,
                spend_txid: Some(spend.txid),
                invalid_reason: Some(
                    "Baton was spent in a non-mint SLP transaction.".to_string(),
                ),
            });
        }

        let invalid_reason = validation.and_then(|v| v.invalid_reason);
        Ok(BatonSpendDetails {
            status: BatonUtxoStatus::BatonSpentInvalidSlp,
            spend_txid: Some(spend.txid),
            invalid_reason,
        })
    }

    /// Cache an index-reported spend once it is buried deep enough that a
    /// reorg will not move it.
    fn cache_if_mature(&mut self, key: &str, info: &TxoSpendInfo) {
        if let Some(block) = info.block {
            let best = self.sync.best_block_height();
            if best > block && best - block > self.mature_spend_depth {
                self.live_cache.insert(key.to_string(), info.clone());
            }
        }
    }

    async fn owner_invalid_reason(&self, txid: &str) -> Option<String> {
        self.oracle
            .validation(txid)
            .await
            .and_then(|v| v.invalid_reason)
    }
}

impl std::fmt::Debug for SpendResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpendResolver")
            .field("token_id", &self.token_id)
            .field("startup_cache", &self.startup_cache.as_ref().map(|c| c.len()))
            .field("live_cache", &self.live_cache.len())
            .finish_non_exhaustive()
    }
}

/// During a bounded replay a spend above the ceiling (or still in the
/// mempool) has not happened yet.
fn replay_hides_spend(process_up_to: Option<u64>, spend_block: Option<u64>) -> bool {
    match process_up_to {
        Some(ceiling) => spend_block.map_or(true, |b| b > ceiling),
        None => false,
    }
}
