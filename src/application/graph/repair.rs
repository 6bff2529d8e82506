//! Graph repair.
//!
//! Excision is the only correction mechanism the engine has: a transaction
//! that turns out to be wrong is removed together with everything
//! downstream of it, and the surviving outputs that fed the removed set
//! revert to unspent. Bad subtrees are never patched in place.

use std::collections::{BTreeSet, HashSet};

use crate::domain::models::{
    outpoint_key, split_outpoint, BatonUtxoStatus, OutputStatus, TokenUtxoStatus,
};
use crate::utils::logging::{log_info, log_warning};

use super::GraphCore;

/// Remove `txid` (when `include_self`) and every transaction reachable
/// through its spend pointers. Surviving outputs that pointed into the
/// removed set revert to unspent and rejoin the UTXO set; a reverted baton
/// output also restores the mint-baton pointer. Oracle verdicts of the
/// removed transactions are evicted so a later re-extension re-judges them.
pub(super) async fn excise(core: &mut GraphCore, txid: &str, include_self: bool) {
    let mut to_delete: BTreeSet<String> = BTreeSet::new();
    let mut walk: Vec<String> = vec![txid.to_string()];

    while let Some(current) = walk.pop() {
        if let Some(node) = core.graph.get_mut(&current) {
            for output in &node.outputs {
                if let Some(spender) = &output.spend_txid {
                    if to_delete.insert(spender.clone()) {
                        walk.push(spender.clone());
                    }
                }
            }
            // A walked node that survives must re-derive its outputs
            node.outputs.clear();
            node.is_complete = false;
        }
    }
    if include_self {
        to_delete.insert(txid.to_string());
    }
    if to_delete.is_empty() {
        return;
    }

    // Revert the surviving upstream outputs that fed the removed set
    let mut reverts: Vec<(String, u32)> = Vec::new();
    for deleted in &to_delete {
        if let Some(node) = core.graph.get(deleted) {
            for input in &node.inputs {
                if to_delete.contains(&input.txid) {
                    continue;
                }
                reverts.push((input.txid.clone(), input.vout));
            }
        }
    }
    for (parent_txid, vout) in reverts {
        let Some(parent) = core.graph.get_mut(&parent_txid) else {
            continue;
        };
        let Some(output) = parent.output_at_mut(vout) else {
            continue;
        };
        output.spend_txid = None;
        output.invalid_reason = None;
        let outpoint = outpoint_key(&parent_txid, vout);
        match output.status {
            OutputStatus::Baton(_) => {
                output.status = OutputStatus::Baton(BatonUtxoStatus::BatonUnspent);
                core.ledger.insert(outpoint.clone());
                core.ledger.set_mint_baton(Some(outpoint.clone()));
            }
            OutputStatus::Token(_) => {
                output.status = OutputStatus::Token(TokenUtxoStatus::Unspent);
                core.ledger.insert(outpoint.clone());
            }
        }
        log_info(&format!("Reverted {} to unspent after excision", outpoint));
    }

    for deleted in &to_delete {
        core.graph.remove(deleted);
        core.ledger.purge_txid(deleted);
        core.oracle.evict(deleted).await;
    }
    log_info(&format!(
        "Excised {} transaction(s) from the graph of token {}",
        to_delete.len(),
        core.token_id
    ));
}

/// Re-check one live outpoint against the node. Returns the txids whose
/// outputs must be re-resolved as parent refreshes once the repair is done.
pub(super) async fn update_txo_if_spent(core: &mut GraphCore, outpoint: &str) -> Vec<String> {
    let Some((txid, vout)) = split_outpoint(outpoint) else {
        log_warning(&format!("Malformed outpoint in the UTXO set: {}", outpoint));
        return Vec::new();
    };
    let txid = txid.to_string();

    let tx_out = match core.node.get_tx_out(&txid, vout).await {
        Ok(out) => out,
        Err(e) => {
            log_warning(&format!("UTXO lookup failed for {}: {}", outpoint, e));
            None
        }
    };
    if tx_out.is_some() {
        return Vec::new();
    }

    match core.node.raw_transaction_hex(&txid).await {
        Ok(_) => {
            // The transaction stands; only this output was consumed,
            // outside the notification flow.
            log_info(&format!(
                "Output {} was spent without a graph update; refreshing {}",
                outpoint, txid
            ));
            vec![txid]
        }
        Err(e) => {
            log_warning(&format!(
                "Transaction {} vanished from the node: {}",
                txid, e
            ));
            let parents: Vec<String> = match core.graph.get(&txid) {
                Some(node) => {
                    let mut seen: Vec<String> = Vec::new();
                    for input in &node.inputs {
                        if !seen.contains(&input.txid) {
                            seen.push(input.txid.clone());
                        }
                    }
                    seen
                }
                None => Vec::new(),
            };
            excise(core, &txid, true).await;
            parents
                .into_iter()
                .filter(|p| core.graph.contains_key(p))
                .collect()
        }
    }
}

/// After a block drains the graph queue, every graphed transaction still
/// lacking a block hash must be waiting in the mempool. One the node no
/// longer knows at all was double-spent away and is excised.
pub(super) async fn sweep_unconfirmed(core: &mut GraphCore) {
    let unconfirmed: Vec<String> = core
        .graph
        .iter()
        .filter(|(_, node)| node.block_hash.is_none())
        .map(|(txid, _)| txid.clone())
        .collect();
    if unconfirmed.is_empty() {
        return;
    }

    let mempool: HashSet<String> = match core.node.raw_mempool().await {
        Ok(txids) => txids.into_iter().collect(),
        Err(e) => {
            log_warning(&format!("Mempool query failed during block sweep: {}", e));
            return;
        }
    };

    for txid in unconfirmed {
        if mempool.contains(&txid) || !core.graph.contains_key(&txid) {
            continue;
        }
        if let Err(e) = core.node.raw_transaction_hex(&txid).await {
            log_warning(&format!(
                "Unconfirmed transaction {} is gone from the node: {}",
                txid, e
            ));
            excise(core, &txid, true).await;
            core.resolver.clear_live_cache();
        }
    }
}
