use crate::domain::models::details::SlpTokenDetails;
use crate::domain::models::status::{BatonUtxoStatus, OutputStatus, TokenUtxoStatus};

/// Build the `"txid:vout"` key used by the UTXO set and the spend caches
pub fn outpoint_key(txid: &str, vout: u32) -> String {
    format!("{}:{}", txid, vout)
}

/// Split a `"txid:vout"` key back into its parts
pub fn split_outpoint(key: &str) -> Option<(&str, u32)> {
    let (txid, vout) = key.rsplit_once(':')?;
    let vout = vout.parse::<u32>().ok()?;
    Some((txid, vout))
}

/// One output of a graphed transaction.
///
/// The synthetic entry recording an excess-input burn carries `vout: None`
/// and never enters the UTXO set.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphTxnOutput {
    /// Receiving address, or the `scriptPubKey:<hex>` fallback
    pub address: String,
    /// Output index; `None` for the synthetic excess-burn entry
    pub vout: Option<u32>,
    /// Output value in satoshis
    pub satoshis: u64,
    /// Token quantity assigned to this output, in base units
    pub token_amount: u64,
    /// Txid of the transaction that spent this output, once known
    pub spend_txid: Option<String>,
    /// Current spend status
    pub status: OutputStatus,
    /// Oracle reason when the spender failed validation
    pub invalid_reason: Option<String>,
}

impl GraphTxnOutput {
    /// Outpoint key of this output under its owning txid
    pub fn outpoint(&self, owner_txid: &str) -> Option<String> {
        self.vout.map(|v| outpoint_key(owner_txid, v))
    }
}

/// Denormalized snapshot of one token-bearing input, taken from the parent's
/// outputs when the node was materialized. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphTxnInput {
    /// Txid of the parent transaction
    pub txid: String,
    /// Output index consumed from the parent
    pub vout: u32,
    /// Address the parent assigned to that output
    pub address: String,
    /// Satoshis carried by that output
    pub satoshis: u64,
    /// Token quantity carried by that output, in base units
    pub token_amount: u64,
}

/// One node of the per-token transaction graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphTxn {
    /// Decoded token details of this transaction
    pub details: SlpTokenDetails,
    /// Derived outputs, including at most one synthetic excess-burn entry
    pub outputs: Vec<GraphTxnOutput>,
    /// Snapshots of the token-bearing inputs
    pub inputs: Vec<GraphTxnInput>,
    /// Set when a downstream traversal finished from this node
    pub is_complete: bool,
    /// Hash of the containing block, once confirmed
    pub block_hash: Option<String>,
}

impl GraphTxn {
    pub fn new(details: SlpTokenDetails) -> Self {
        Self {
            details,
            outputs: Vec::new(),
            inputs: Vec::new(),
            is_complete: false,
            block_hash: None,
        }
    }

    /// Output with the given index, skipping synthetic entries
    pub fn output_at(&self, vout: u32) -> Option<&GraphTxnOutput> {
        self.outputs.iter().find(|o| o.vout == Some(vout))
    }

    /// Mutable output with the given index, skipping synthetic entries
    pub fn output_at_mut(&mut self, vout: u32) -> Option<&mut GraphTxnOutput> {
        self.outputs.iter_mut().find(|o| o.vout == Some(vout))
    }

    /// Sum of token quantities across real outputs, in base units
    pub fn total_output_amount(&self) -> u128 {
        self.outputs
            .iter()
            .filter(|o| o.vout.is_some())
            .map(|o| o.token_amount as u128)
            .sum()
    }

    /// Sum of token quantities across input snapshots, in base units
    pub fn total_input_amount(&self) -> u128 {
        self.inputs.iter().map(|i| i.token_amount as u128).sum()
    }

    /// Spending txids that continue this token's graph: valid same-token
    /// SENDs and MINTs that consumed the baton, in output order without
    /// duplicates.
    pub fn valid_spend_children(&self) -> Vec<String> {
        let mut children: Vec<String> = Vec::new();
        for output in &self.outputs {
            let continues = matches!(
                output.status,
                OutputStatus::Token(TokenUtxoStatus::SpentSameToken)
                    | OutputStatus::Baton(BatonUtxoStatus::BatonSpentInMint)
            );
            if let (true, Some(spend_txid)) = (continues, output.spend_txid.as_ref()) {
                if !children.iter().any(|c| c == spend_txid) {
                    children.push(spend_txid.clone());
                }
            }
        }
        children
    }
}
