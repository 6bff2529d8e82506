//! Statistics recomputation.
//!
//! Runs only while the graph queue is idle so the graph, ledger and address
//! snapshot stay mutually consistent. Everything here is recomputed from
//! scratch; nothing is patched incrementally.

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::sleep;

use crate::domain::errors::GraphError;
use crate::domain::models::{
    outpoint_key, split_outpoint, AddressBalance, BatonUtxoStatus, OutputStatus,
    SlpTransactionType, TokenBatonStatus, TokenStats,
};
use crate::infrastructure::node::NodeClientError;
use crate::infrastructure::sync::IndexerState;
use crate::utils::logging::{log_error, log_info, log_warning};

use super::serialize;
use super::GraphCore;

/// Recompute every derived statistic from the current graph snapshot and
/// publish the result through the persistence collaborator. Consistency
/// violations are logged, never corrected here.
pub(super) async fn update_statistics(core: &mut GraphCore) -> Result<(), GraphError> {
    // Nothing meaningful exists until the genesis itself is graphed
    if !core.graph.contains_key(&core.token_id) {
        return Ok(());
    }

    rebuild_addresses(core);
    backfill_block_hashes(core).await?;

    let block_created = match core.spend_index.token_genesis_block(&core.token_id).await {
        Ok(block) => block,
        Err(e) => {
            log_warning(&format!(
                "Genesis block query failed for token {}: {}",
                core.token_id, e
            ));
            None
        }
    };
    let block_last_active_mint = match core.spend_index.block_last_minted(&core.token_id).await {
        Ok(block) => block,
        Err(e) => {
            log_warning(&format!(
                "Last-mint block query failed for token {}: {}",
                core.token_id, e
            ));
            None
        }
    };
    let block_last_active_send = match core.spend_index.block_last_sent(&core.token_id).await {
        Ok(block) => block,
        Err(e) => {
            log_warning(&format!(
                "Last-send block query failed for token {}: {}",
                core.token_id, e
            ));
            None
        }
    };

    let qty_token_minted = total_mint_quantity(core);
    let qty_token_circulating_supply: u128 =
        core.addresses.values().map(|b| b.token_balance).sum();
    let qty_satoshis_locked_up: u64 = core.addresses.values().map(|b| b.satoshis_balance).sum();
    let minting_baton_status = baton_status(core);

    let stats = TokenStats {
        block_created,
        block_last_active_send,
        block_last_active_mint,
        qty_valid_txns_since_genesis: core.graph.len() as u64,
        qty_valid_token_utxos: core.ledger.len() as u64,
        qty_valid_token_addresses: core.addresses.len() as u64,
        qty_token_minted,
        qty_token_burned: qty_token_minted.saturating_sub(qty_token_circulating_supply),
        qty_token_circulating_supply,
        qty_satoshis_locked_up,
        minting_baton_status,
    };

    if stats.qty_token_circulating_supply > stats.qty_token_minted {
        log_error(&format!(
            "Token {}: circulating supply {} exceeds minted quantity {}",
            core.token_id, stats.qty_token_circulating_supply, stats.qty_token_minted
        ));
    }
    if stats
        .qty_token_minted
        .saturating_sub(stats.qty_token_burned)
        != stats.qty_token_circulating_supply
    {
        log_warning(&format!(
            "Token {}: minted {} minus burned {} does not match circulating {}",
            core.token_id,
            stats.qty_token_minted,
            stats.qty_token_burned,
            stats.qty_token_circulating_supply
        ));
    }

    core.stats = stats;

    if !core.exit.load(Ordering::SeqCst) {
        persist_snapshot(core).await?;
    }

    log_info(&format!(
        "Token {} statistics: {} txns, {} utxos, {} addresses, minted {}, circulating {}, burned {}, baton {:?}",
        core.token_id,
        core.stats.qty_valid_txns_since_genesis,
        core.stats.qty_valid_token_utxos,
        core.stats.qty_valid_token_addresses,
        core.stats.qty_token_minted,
        core.stats.qty_token_circulating_supply,
        core.stats.qty_token_burned,
        core.stats.minting_baton_status
    ));
    Ok(())
}

/// Rebuild the address balances from the live UTXO set. Entries whose
/// backing output is gone or no longer live are pruned on the way through.
fn rebuild_addresses(core: &mut GraphCore) {
    core.addresses.clear();
    for outpoint in core.ledger.snapshot() {
        let Some((txid, vout)) = split_outpoint(&outpoint) else {
            log_warning(&format!("Pruning malformed UTXO entry {}", outpoint));
            core.ledger.remove(&outpoint);
            continue;
        };
        let Some(node) = core.graph.get(txid) else {
            log_info(&format!("Pruning UTXO {} with no graphed transaction", outpoint));
            core.ledger.remove(&outpoint);
            continue;
        };
        let Some(output) = node.output_at(vout) else {
            log_info(&format!("Pruning UTXO {} with no backing output", outpoint));
            core.ledger.remove(&outpoint);
            continue;
        };
        if !output.status.is_live() {
            log_info(&format!("Pruning UTXO {} that is no longer unspent", outpoint));
            core.ledger.remove(&outpoint);
            continue;
        }

        let amount = node.details.quantity_at(vout) as u128;
        let address = output.address.clone();
        let satoshis = output.satoshis;
        match core.addresses.get_mut(&address) {
            Some(balance) => {
                balance.satoshis_balance += satoshis;
                balance.token_balance += amount;
            }
            None if amount > 0 => {
                core.addresses.insert(
                    address,
                    AddressBalance {
                        token_balance: amount,
                        satoshis_balance: satoshis,
                    },
                );
            }
            None => {}
        }
    }
}

/// Fill in missing block hashes: first from the startup spend cache, then
/// from the node, throttled so a long backfill does not flood the RPC.
/// Transactions the node no longer knows at all are dropped outright. Once
/// the indexer is running, a graphed transaction that is neither confirmed
/// nor in the mempool means the graph is broken.
async fn backfill_block_hashes(core: &mut GraphCore) -> Result<(), GraphError> {
    let seeded: Vec<(String, String)> = core
        .resolver
        .startup_spends()
        .map(|cache| {
            cache
                .values()
                .filter_map(|info| {
                    info.block_hash
                        .as_ref()
                        .map(|hash| (info.txid.clone(), hash.clone()))
                })
                .collect()
        })
        .unwrap_or_default();
    for (txid, hash) in seeded {
        if let Some(node) = core.graph.get_mut(&txid) {
            node.block_hash = Some(hash);
        }
    }

    let missing: Vec<String> = core
        .graph
        .iter()
        .filter(|(_, node)| node.block_hash.is_none())
        .map(|(txid, _)| txid.clone())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    let mut mempool_known = true;
    let mempool: HashSet<String> = match core.node.raw_mempool().await {
        Ok(txids) => txids.into_iter().collect(),
        Err(e) => {
            log_warning(&format!(
                "Mempool query failed during block-hash backfill: {}",
                e
            ));
            mempool_known = false;
            HashSet::new()
        }
    };

    let mut queries = 0usize;
    for txid in missing {
        if mempool.contains(&txid) || !core.graph.contains_key(&txid) {
            continue;
        }
        match core.node.transaction_block_hash(&txid).await {
            Ok(hash) => {
                if let Some(node) = core.graph.get_mut(&txid) {
                    node.block_hash = Some(hash);
                }
                queries += 1;
                if queries >= core.config.blockhash_query_throttle {
                    sleep(Duration::from_millis(core.config.throttle_pause_ms)).await;
                    queries = 0;
                }
            }
            Err(NodeClientError::NotFound(_)) => {
                // Known to the node but unconfirmed; the check below decides
                log_info(&format!("Transaction {} is still unconfirmed", txid));
            }
            Err(e) => {
                log_info(&format!(
                    "Dropping transaction {} unknown to the node: {}",
                    txid, e
                ));
                core.graph.remove(&txid);
            }
        }
    }

    if mempool_known && core.sync.state() == IndexerState::Running {
        for (txid, node) in &core.graph {
            if node.block_hash.is_none() && !mempool.contains(txid) {
                return Err(GraphError::MissingBlockHash(txid.clone()));
            }
        }
    }
    Ok(())
}

/// Total quantity ever minted: the genesis quantity plus every graphed MINT
fn total_mint_quantity(core: &GraphCore) -> u128 {
    let mut quantity = match core.genesis_details.genesis_or_mint_quantity {
        Some(qty) => qty as u128,
        None => {
            log_warning(&format!(
                "Genesis of token {} declares no mint quantity",
                core.token_id
            ));
            0
        }
    };
    for node in core.graph.values() {
        if node.details.transaction_type == SlpTransactionType::Mint {
            quantity += node.details.genesis_or_mint_quantity.unwrap_or(0) as u128;
        }
    }
    quantity
}

/// Lifecycle of the minting baton, derived by walking the baton spend chain
/// from the genesis to the most recent valid MINT.
fn baton_status(core: &GraphCore) -> TokenBatonStatus {
    if !core.genesis_details.contains_baton {
        return TokenBatonStatus::NeverCreated;
    }

    let mut current = core
        .genesis_details
        .baton_vout
        .map(|vout| (core.token_id.clone(), vout));
    let mut hops = core.graph.len() + 1;

    while let Some((txid, vout)) = current.take() {
        if hops == 0 {
            break;
        }
        hops -= 1;

        let Some(node) = core.graph.get(&txid) else {
            break;
        };
        let Some(output) = node.output_at(vout) else {
            break;
        };
        match output.status {
            OutputStatus::Baton(BatonUtxoStatus::BatonUnspent) => {
                if core.ledger.mint_baton() == Some(outpoint_key(&txid, vout).as_str()) {
                    return TokenBatonStatus::Alive;
                }
                break;
            }
            OutputStatus::Baton(BatonUtxoStatus::BatonSpentInMint) => {
                let Some(spender) = output.spend_txid.clone() else {
                    break;
                };
                let Some(mint) = core.graph.get(&spender) else {
                    break;
                };
                match mint.details.baton_vout {
                    None => return TokenBatonStatus::DeadEnded,
                    Some(next_vout) => current = Some((spender, next_vout)),
                }
            }
            _ => break,
        }
    }
    TokenBatonStatus::DeadBurned
}

/// Publish the snapshot: token summary, addresses, graph rows and UTXOs
async fn persist_snapshot(core: &GraphCore) -> Result<(), GraphError> {
    let token = serialize::token_dbo(core);
    core.store.token_insert_replace(&token).await?;

    let addresses = serialize::address_dbos(core);
    core.store
        .address_insert_replace(&core.token_id, &addresses)
        .await?;

    let graph = serialize::graph_dbos(core);
    core.store
        .graph_insert_replace(&core.token_id, &graph)
        .await?;

    let utxos = serialize::utxo_dbos(core);
    core.store
        .utxo_insert_replace(&core.token_id, &utxos)
        .await?;
    Ok(())
}
