//! Graph construction.
//!
//! [`extend`] materializes one transaction's graph node and walks outward
//! from it: upstream to snapshot the token inputs it consumes, downstream
//! into the transactions that spend its outputs. Both walks run on explicit
//! work stacks; token spend chains grow far deeper than the call stack
//! allows.

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::sleep;

use crate::domain::errors::GraphError;
use crate::domain::models::{
    BatonUtxoStatus, GraphTxn, GraphTxnInput, GraphTxnOutput, OutputStatus, RawTransaction,
    SlpTokenDetails, SlpTransactionType, TokenUtxoStatus,
};
use crate::utils::logging::{log_info, log_warning};

use super::repair;
use super::GraphCore;

/// Block notification context propagated through one graph update
#[derive(Debug, Clone)]
pub struct BlockContext {
    /// Hash of the confirming block
    pub hash: String,
    /// Txids the block confirms
    pub transactions: HashSet<String>,
}

/// Deferred re-queue emitted while extending. The queue layer enqueues
/// these once the current mutation has released the engine state; they are
/// never executed inline.
#[derive(Debug, Clone)]
pub(super) struct FollowUp {
    pub txid: String,
    pub is_parent: bool,
}

/// Outcome of materializing a single transaction
enum Outcome {
    /// The node no longer knows the transaction; reconciliation handled it
    Unknown,
    /// Expected negative: not a valid, decodable transaction of this token
    Invalid,
    /// Materialized; `children` are the same-token spenders to continue into
    Extended {
        children: Vec<String>,
        mark_complete: bool,
    },
}

/// Work item of the downstream continuation
enum Walk {
    Process(String),
    Complete(String),
}

/// Extend the graph from `txid`.
///
/// Returns the extension result plus the deferred follow-up updates the
/// queue layer must enqueue: `Some(true)` on success, `Some(false)` for an
/// expected negative (invalid or undecodable transaction) and `None` when
/// the transaction is unknown to the node and its subtree was excised.
pub(super) async fn extend(
    core: &mut GraphCore,
    txid: &str,
    is_parent: bool,
    refresh_outputs: bool,
    process_up_to: Option<u64>,
    block: Option<&BlockContext>,
) -> Result<(Option<bool>, Vec<FollowUp>), GraphError> {
    let mut follow_ups = Vec::new();

    let root = extend_one(
        core,
        txid,
        is_parent,
        refresh_outputs,
        process_up_to,
        block,
        &mut follow_ups,
    )
    .await?;
    let (result, children, mark_root) = match root {
        Outcome::Unknown => (None, Vec::new(), false),
        Outcome::Invalid => (Some(false), Vec::new(), false),
        Outcome::Extended {
            children,
            mark_complete,
        } => (Some(true), children, mark_complete),
    };

    // Downstream continuation. A node is marked complete only after every
    // transaction reachable through its spend pointers has been processed,
    // so the completion marker sits below its children on the stack.
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(txid.to_string());
    let mut walk: Vec<Walk> = Vec::new();
    if mark_root {
        walk.push(Walk::Complete(txid.to_string()));
    }
    for child in children.into_iter().rev() {
        if visited.insert(child.clone()) {
            walk.push(Walk::Process(child));
        }
    }

    while let Some(step) = walk.pop() {
        match step {
            Walk::Process(current) => {
                log_info(&format!(
                    "Continuing token graph into spending transaction {}",
                    current
                ));
                let outcome = extend_one(
                    core,
                    &current,
                    false,
                    true,
                    process_up_to,
                    block,
                    &mut follow_ups,
                )
                .await?;
                if let Outcome::Extended {
                    children,
                    mark_complete,
                } = outcome
                {
                    if mark_complete {
                        walk.push(Walk::Complete(current));
                    }
                    for child in children.into_iter().rev() {
                        if visited.insert(child.clone()) {
                            walk.push(Walk::Process(child));
                        }
                    }
                }
            }
            Walk::Complete(done) => {
                if let Some(node) = core.graph.get_mut(&done) {
                    node.is_complete = true;
                }
            }
        }
    }

    Ok((result, follow_ups))
}

/// Materialize or refresh one graph node.
///
/// A parent refresh (`is_parent`) re-resolves output statuses without
/// walking downstream again and without re-queueing its own parents.
async fn extend_one(
    core: &mut GraphCore,
    txid: &str,
    is_parent: bool,
    refresh_outputs: bool,
    process_up_to: Option<u64>,
    block: Option<&BlockContext>,
    follow_ups: &mut Vec<FollowUp>,
) -> Result<Outcome, GraphError> {
    let mut is_parent = is_parent;

    // STEP 1: Reconcile against the confirming block
    if let Some(block) = block {
        if !block.transactions.contains(txid) {
            match core.node.raw_transaction_hex(txid).await {
                Ok(_) => {
                    // Known to the node, just not part of this block
                    if !core.graph.contains_key(txid) {
                        follow_ups.push(FollowUp {
                            txid: txid.to_string(),
                            is_parent: false,
                        });
                    }
                }
                Err(e) => {
                    log_warning(&format!(
                        "Transaction {} is unknown to the node: {}",
                        txid, e
                    ));
                    repair::excise(core, txid, true).await;
                }
            }
            return Ok(Outcome::Unknown);
        }
        if core.graph.contains_key(txid) {
            verify_recorded_spends(core, txid).await;
            if let Some(node) = core.graph.get_mut(txid) {
                node.block_hash = Some(block.hash.clone());
            }
            is_parent = true;
        }
    }

    // STEP 2: Already graphed and finished, nothing to do
    if !is_parent && core.graph.get(txid).is_some_and(|n| n.is_complete) {
        return Ok(Outcome::Extended {
            children: Vec::new(),
            mark_complete: false,
        });
    }

    // STEP 3: The validity oracle decides whether the transaction belongs
    let valid = match core.oracle.is_valid(txid, &core.token_id).await {
        Ok(v) => v,
        Err(e) => {
            log_warning(&format!("Validity check failed for {}: {}", txid, e));
            false
        }
    };
    if !valid {
        log_warning(&format!(
            "Not a valid transaction of token {}: {}",
            core.token_id, txid
        ));
        return Ok(Outcome::Invalid);
    }
    let Some(details) = core.oracle.validation(txid).await.and_then(|v| v.details) else {
        log_warning(&format!("No decoded token details for {}", txid));
        return Ok(Outcome::Invalid);
    };
    let Some(raw) = fetch_raw(core, txid).await else {
        return Ok(Outcome::Invalid);
    };

    // STEP 4: Materialize the node and its input snapshots
    if !core.graph.contains_key(txid) {
        let mut node = GraphTxn::new(details.clone());
        node.block_hash = block.map(|b| b.hash.clone());
        core.graph.insert(txid.to_string(), node);
        log_info(&format!(
            "Graphed transactions for token {}: {}",
            core.token_id,
            core.graph.len()
        ));
    }

    if core.graph.get(txid).is_some_and(|n| n.inputs.is_empty()) {
        for input in &raw.inputs {
            if core.graph.contains_key(&input.prev_txid) {
                continue;
            }
            if input_belongs_to_token(core, &input.prev_txid).await {
                log_info(&format!("Adding contributing token inputs of {}", txid));
                materialize_ancestor_chain(core, &input.prev_txid, process_up_to).await?;
            }
        }
        let snapshots = snapshot_inputs(core, &raw).await;
        if let Some(node) = core.graph.get_mut(txid) {
            node.inputs = snapshots;
        }
    }

    // STEP 5: Spend statuses are meaningless against a partially synced view
    wait_for_sync(core).await;

    // STEP 6: Derive the outputs and fold them into the live ledger
    let derive = refresh_outputs || core.graph.get(txid).is_some_and(|n| n.outputs.is_empty());
    if derive {
        let outputs = derive_outputs(core, txid, &details, &raw, process_up_to).await?;
        if let Some(node) = core.graph.get_mut(txid) {
            node.outputs = outputs;
        }
        if let Some(node) = core.graph.get(txid) {
            core.ledger
                .apply_transaction(txid, &details, &node.inputs, &node.outputs);
        }

        // STEP 7: A SEND delivering less than its inputs carried burned the rest
        if details.transaction_type == SlpTransactionType::Send {
            if let Some(node) = core.graph.get_mut(txid) {
                record_excess_burn(txid, node);
            }
        }
    }

    // STEP 8: Each distinct graphed parent gets its output statuses
    // refreshed to record this spend, deferred through the queue.
    if !is_parent && !core.sync.startup_active() {
        let mut parent_ids: Vec<String> = Vec::new();
        for input in &raw.inputs {
            if !parent_ids.contains(&input.prev_txid) {
                parent_ids.push(input.prev_txid.clone());
            }
        }
        for parent in parent_ids {
            if core.graph.contains_key(&parent) {
                follow_ups.push(FollowUp {
                    txid: parent,
                    is_parent: true,
                });
            }
        }
    }

    // STEP 9: Spenders that continue this token's graph
    let children = if is_parent {
        Vec::new()
    } else {
        core.graph
            .get(txid)
            .map(|n| n.valid_spend_children())
            .unwrap_or_default()
    };

    // STEP 10: Advance the reconciliation watermark
    core.last_updated_block = match process_up_to {
        Some(ceiling) => ceiling,
        None => core.sync.best_block_height(),
    };

    Ok(Outcome::Extended {
        children,
        mark_complete: !is_parent,
    })
}

/// A block just confirmed `txid`; make sure every spender it recorded still
/// exists. A recorded spender the node no longer knows was double-spent
/// away, so its whole subtree goes.
async fn verify_recorded_spends(core: &mut GraphCore, txid: &str) {
    let mut spenders: Vec<String> = Vec::new();
    if let Some(node) = core.graph.get(txid) {
        for output in &node.outputs {
            if !records_spend(output.status) {
                continue;
            }
            if let Some(spend_txid) = &output.spend_txid {
                if !spenders.contains(spend_txid) {
                    spenders.push(spend_txid.clone());
                }
            }
        }
    }
    for spender in spenders {
        if core.node.raw_transaction_hex(&spender).await.is_err() {
            log_warning(&format!(
                "Recorded spender {} of {} no longer exists; excising its subtree",
                spender, txid
            ));
            repair::excise(core, &spender, true).await;
        }
    }
}

/// True when the status records a resolved spend rather than a live or
/// settled output.
fn records_spend(status: OutputStatus) -> bool {
    !matches!(
        status,
        OutputStatus::Token(
            TokenUtxoStatus::Unspent
                | TokenUtxoStatus::ExcessInputBurned
                | TokenUtxoStatus::MissingBchVout
        ) | OutputStatus::Baton(BatonUtxoStatus::BatonUnspent | BatonUtxoStatus::BatonMissingBchVout)
    )
}

/// Whether `previd` is a valid transaction of this token, forcing an oracle
/// verdict when none is cached yet.
async fn input_belongs_to_token(core: &GraphCore, previd: &str) -> bool {
    let mut validation = core.oracle.validation(previd).await;
    if validation.is_none() {
        if let Err(e) = core.oracle.is_valid(previd, &core.token_id).await {
            log_warning(&format!(
                "Validity check failed for input {}: {}",
                previd, e
            ));
            return false;
        }
        validation = core.oracle.validation(previd).await;
    }
    match validation {
        Some(v) => {
            v.validity
                && v.details
                    .as_ref()
                    .is_some_and(|d| d.token_id == core.token_id)
        }
        None => false,
    }
}

/// Denormalized snapshots of the token-bearing inputs of `raw`. Producing
/// transactions must already be graphed; anything else contributes nothing
/// to this token.
async fn snapshot_inputs(core: &GraphCore, raw: &RawTransaction) -> Vec<GraphTxnInput> {
    let mut snapshots = Vec::new();
    for input in &raw.inputs {
        if !input_belongs_to_token(core, &input.prev_txid).await {
            continue;
        }
        let Some(parent) = core.graph.get(&input.prev_txid) else {
            continue;
        };
        let Some(output) = parent.output_at(input.prev_vout) else {
            continue;
        };
        snapshots.push(GraphTxnInput {
            txid: input.prev_txid.clone(),
            vout: input.prev_vout,
            address: output.address.clone(),
            satoshis: output.satoshis,
            token_amount: output.token_amount,
        });
    }
    snapshots
}

/// Frame of the ancestor walk: `Visit` discovers parents, `Build`
/// materializes the node once everything upstream of it is settled.
enum AncestorFrame {
    Visit(String),
    Build(String, SlpTokenDetails, RawTransaction),
}

/// Materialize `root` and its un-graphed same-token ancestors, deepest
/// first, so every input snapshot finds its producing output already in
/// place. Ancestors never fan downstream; the spending side belongs to the
/// caller's walk.
async fn materialize_ancestor_chain(
    core: &mut GraphCore,
    root: &str,
    process_up_to: Option<u64>,
) -> Result<(), GraphError> {
    let mut stack = vec![AncestorFrame::Visit(root.to_string())];
    let mut scheduled: HashSet<String> = HashSet::new();
    scheduled.insert(root.to_string());

    while let Some(frame) = stack.pop() {
        match frame {
            AncestorFrame::Visit(txid) => {
                if core.graph.contains_key(&txid) {
                    continue;
                }
                let valid = match core.oracle.is_valid(&txid, &core.token_id).await {
                    Ok(v) => v,
                    Err(e) => {
                        log_warning(&format!(
                            "Validity check failed for ancestor {}: {}",
                            txid, e
                        ));
                        continue;
                    }
                };
                if !valid {
                    log_warning(&format!("Skipping invalid ancestor {}", txid));
                    continue;
                }
                let Some(details) = core.oracle.validation(&txid).await.and_then(|v| v.details)
                else {
                    log_warning(&format!("No decoded token details for ancestor {}", txid));
                    continue;
                };
                let Some(raw) = fetch_raw(core, &txid).await else {
                    continue;
                };

                let parent_candidates: Vec<String> =
                    raw.inputs.iter().map(|i| i.prev_txid.clone()).collect();
                stack.push(AncestorFrame::Build(txid, details, raw));
                for previd in parent_candidates {
                    if scheduled.contains(&previd) || core.graph.contains_key(&previd) {
                        continue;
                    }
                    if input_belongs_to_token(core, &previd).await {
                        scheduled.insert(previd.clone());
                        stack.push(AncestorFrame::Visit(previd));
                    }
                }
            }
            AncestorFrame::Build(txid, details, raw) => {
                log_info(&format!(
                    "Materializing ancestor {} of token {}",
                    txid, core.token_id
                ));
                let inputs = snapshot_inputs(core, &raw).await;
                let mut node = GraphTxn::new(details.clone());
                node.inputs = inputs;
                core.graph.insert(txid.clone(), node);

                wait_for_sync(core).await;
                let outputs = derive_outputs(core, &txid, &details, &raw, process_up_to).await?;
                if let Some(node) = core.graph.get_mut(&txid) {
                    node.outputs = outputs;
                }
                if let Some(node) = core.graph.get(&txid) {
                    core.ledger
                        .apply_transaction(&txid, &details, &node.inputs, &node.outputs);
                }
                if details.transaction_type == SlpTransactionType::Send {
                    if let Some(node) = core.graph.get_mut(&txid) {
                        record_excess_burn(&txid, node);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Derive the token outputs of one transaction, resolving each one's spend
/// status. GENESIS and MINT commit a single quantity at vout 1 plus an
/// optional baton; a SEND commits one quantity per declared vout.
async fn derive_outputs(
    core: &mut GraphCore,
    txid: &str,
    details: &SlpTokenDetails,
    raw: &RawTransaction,
    process_up_to: Option<u64>,
) -> Result<Vec<GraphTxnOutput>, GraphError> {
    let mut outputs = Vec::new();
    let vout_count = raw.outputs.len();

    match details.transaction_type {
        SlpTransactionType::Genesis | SlpTransactionType::Mint => {
            let quantity = details
                .genesis_or_mint_quantity
                .ok_or_else(|| GraphError::UnknownTransactionType(txid.to_string()))?;
            let spend = core
                .resolver
                .token_spend(txid, 1, vout_count, process_up_to)
                .await;
            outputs.push(GraphTxnOutput {
                address: output_address(core, raw, 1),
                vout: Some(1),
                satoshis: raw.outputs.get(1).map_or(0, |o| o.satoshis),
                token_amount: quantity,
                spend_txid: spend.spend_txid,
                status: OutputStatus::Token(spend.status),
                invalid_reason: spend.invalid_reason,
            });
            if let Some(baton_vout) = details.baton_vout {
                let spend = core
                    .resolver
                    .baton_spend(txid, baton_vout, vout_count, process_up_to)
                    .await;
                outputs.push(GraphTxnOutput {
                    address: output_address(core, raw, baton_vout),
                    vout: Some(baton_vout),
                    satoshis: raw.outputs.get(baton_vout as usize).map_or(0, |o| o.satoshis),
                    token_amount: 0,
                    spend_txid: spend.spend_txid,
                    status: OutputStatus::Baton(spend.status),
                    invalid_reason: spend.invalid_reason,
                });
            }
        }
        SlpTransactionType::Send => {
            let amounts = details.send_outputs.clone().unwrap_or_default();
            if amounts.is_empty() {
                log_warning(&format!("SEND {} declares no outputs", txid));
            }
            for (slp_vout, amount) in amounts.iter().enumerate().skip(1) {
                let vout = slp_vout as u32;
                let spend = core
                    .resolver
                    .token_spend(txid, vout, vout_count, process_up_to)
                    .await;
                outputs.push(GraphTxnOutput {
                    address: output_address(core, raw, vout),
                    vout: Some(vout),
                    satoshis: raw.outputs.get(slp_vout).map_or(0, |o| o.satoshis),
                    token_amount: *amount,
                    spend_txid: spend.spend_txid,
                    status: OutputStatus::Token(spend.status),
                    invalid_reason: spend.invalid_reason,
                });
            }
        }
    }
    Ok(outputs)
}

/// Inputs carrying more quantity than the outputs deliver burn the
/// difference; the shortfall is recorded as a synthetic output entry with
/// no vout.
fn record_excess_burn(txid: &str, node: &mut GraphTxn) {
    let input_qty = node.total_input_amount();
    let output_qty = node.total_output_amount();
    if input_qty > output_qty {
        let burned = u64::try_from(input_qty - output_qty).unwrap_or(u64::MAX);
        log_info(&format!(
            "Excess inputs of {} burned {} base units",
            txid, burned
        ));
        node.outputs.push(GraphTxnOutput {
            address: String::new(),
            vout: None,
            satoshis: 0,
            token_amount: burned,
            spend_txid: None,
            status: OutputStatus::Token(TokenUtxoStatus::ExcessInputBurned),
            invalid_reason: None,
        });
    }
}

/// Address string the engine records for one output, falling back to the
/// raw script rendering when no address form exists.
fn output_address(core: &GraphCore, raw: &RawTransaction, vout: u32) -> String {
    match raw.outputs.get(vout as usize) {
        Some(output) => core
            .decoder
            .address_from_script(&output.script_pubkey)
            .unwrap_or_else(|| format!("scriptPubKey:{}", hex::encode(&output.script_pubkey))),
        None => "Missing transaction output.".to_string(),
    }
}

/// Fetch and structure-decode a raw transaction through the oracle's cache
async fn fetch_raw(core: &GraphCore, txid: &str) -> Option<RawTransaction> {
    let hexes = match core.oracle.raw_transactions(&[txid.to_string()]).await {
        Ok(hexes) => hexes,
        Err(e) => {
            log_warning(&format!("Raw transaction fetch failed for {}: {}", txid, e));
            return None;
        }
    };
    let Some(hex) = hexes.into_iter().next() else {
        log_warning(&format!("No raw transaction returned for {}", txid));
        return None;
    };
    match core.decoder.decode_transaction(&hex) {
        Ok(raw) => Some(raw),
        Err(e) => {
            log_warning(&format!("Could not decode transaction {}: {}", txid, e));
            None
        }
    }
}

/// Block until the surrounding indexer reports mempool and block sync
/// complete. Polls at the configured interval; only this engine's graph
/// queue waits.
async fn wait_for_sync(core: &GraphCore) {
    while !core.sync.is_synced() {
        log_info("Waiting for mempool/block sync to complete before graph updates");
        sleep(Duration::from_millis(core.config.sync_poll_ms)).await;
    }
}
