//! Snapshot serialization into persistence DBOs.
//!
//! These accessors render the in-memory state only; they never mutate it.
//! UTXO entries whose backing output is gone are skipped here and pruned by
//! the next statistics pass.

use crate::domain::models::split_outpoint;
use crate::infrastructure::persistence::dto::{
    base_units_to_decimal, AddressBalanceDbo, GraphTxnDbo, GraphTxnInputDbo, GraphTxnOutputDbo,
    SlpTokenDetailsDbo, TokenDbo, TokenStatsDbo, UtxoDbo, TOKEN_SCHEMA_VERSION,
};

use super::GraphCore;

pub(super) fn token_dbo(core: &GraphCore) -> TokenDbo {
    TokenDbo {
        schema_version: TOKEN_SCHEMA_VERSION,
        token_details: SlpTokenDetailsDbo::from_details(&core.genesis_details),
        token_stats: TokenStatsDbo::from_stats(&core.stats, core.genesis_details.decimals),
        mint_baton_utxo: core.ledger.mint_baton().map(str::to_string),
        last_updated_block: core.last_updated_block,
        nft_parent_id: core.nft_parent_id.clone(),
    }
}

pub(super) fn graph_dbos(core: &GraphCore) -> Vec<GraphTxnDbo> {
    let decimals = core.genesis_details.decimals;
    core.graph
        .iter()
        .map(|(txid, node)| GraphTxnDbo {
            token_id: core.token_id.clone(),
            txid: txid.clone(),
            details: SlpTokenDetailsDbo::from_details(&node.details),
            outputs: node
                .outputs
                .iter()
                .map(|output| GraphTxnOutputDbo::from_output(output, decimals))
                .collect(),
            inputs: node
                .inputs
                .iter()
                .map(|input| GraphTxnInputDbo::from_input(input, decimals))
                .collect(),
            block_hash: node.block_hash.clone(),
        })
        .collect()
}

pub(super) fn utxo_dbos(core: &GraphCore) -> Vec<UtxoDbo> {
    let decimals = core.genesis_details.decimals;
    let mut rows = Vec::new();
    for outpoint in core.ledger.iter() {
        let Some((txid, vout)) = split_outpoint(outpoint) else {
            continue;
        };
        let Some(output) = core.graph.get(txid).and_then(|node| node.output_at(vout)) else {
            continue;
        };
        rows.push(UtxoDbo {
            token_id: core.token_id.clone(),
            utxo: outpoint.clone(),
            txid: txid.to_string(),
            vout,
            address: output.address.clone(),
            satoshis: output.satoshis,
            token_amount: base_units_to_decimal(output.token_amount as u128, decimals),
            is_baton: output.status.is_baton(),
        });
    }
    rows
}

pub(super) fn address_dbos(core: &GraphCore) -> Vec<AddressBalanceDbo> {
    let decimals = core.genesis_details.decimals;
    core.addresses
        .iter()
        .map(|(address, balance)| AddressBalanceDbo {
            token_id: core.token_id.clone(),
            address: address.clone(),
            satoshis_balance: balance.satoshis_balance,
            token_balance: base_units_to_decimal(balance.token_balance, decimals),
        })
        .collect()
}
