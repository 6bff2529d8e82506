//! Live UTXO set and minting-baton pointer for one token.
//!
//! The ledger is derived state: after a transaction's outputs are
//! (re)derived, [`UtxoLedger::apply_transaction`] folds their final statuses
//! into the set, so an outpoint is present exactly while its status is live.
//! Baton outputs are tracked in the same set.

use std::collections::BTreeSet;

use crate::domain::models::{
    outpoint_key, GraphTxnInput, GraphTxnOutput, SlpTokenDetails,
};

#[derive(Debug, Default)]
pub struct UtxoLedger {
    utxos: BTreeSet<String>,
    mint_baton: Option<String>,
}

impl UtxoLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted state (snapshot restore)
    pub fn restore(utxos: BTreeSet<String>, mint_baton: Option<String>) -> Self {
        Self { utxos, mint_baton }
    }

    pub fn contains(&self, outpoint: &str) -> bool {
        self.utxos.contains(outpoint)
    }

    pub fn insert(&mut self, outpoint: String) -> bool {
        self.utxos.insert(outpoint)
    }

    pub fn remove(&mut self, outpoint: &str) -> bool {
        self.utxos.remove(outpoint)
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// Ordered snapshot of the live outpoints
    pub fn snapshot(&self) -> Vec<String> {
        self.utxos.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.utxos.iter()
    }

    pub fn mint_baton(&self) -> Option<&str> {
        self.mint_baton.as_deref()
    }

    pub fn set_mint_baton(&mut self, outpoint: Option<String>) {
        self.mint_baton = outpoint;
    }

    /// Drop every outpoint owned by `txid` (excision support)
    pub fn purge_txid(&mut self, txid: &str) {
        let prefix = format!("{}:", txid);
        self.utxos.retain(|o| !o.starts_with(&prefix));
        if self
            .mint_baton
            .as_ref()
            .is_some_and(|b| b.starts_with(&prefix))
        {
            self.mint_baton = None;
        }
    }

    /// Fold one transaction's final output statuses into the ledger.
    ///
    /// Consumed input outpoints leave the set, live outputs enter it, dead
    /// outputs leave it, and the baton pointer follows the declared baton
    /// outpoint's live/dead state.
    pub fn apply_transaction(
        &mut self,
        txid: &str,
        details: &SlpTokenDetails,
        inputs: &[GraphTxnInput],
        outputs: &[GraphTxnOutput],
    ) {
        for input in inputs {
            let consumed = outpoint_key(&input.txid, input.vout);
            self.utxos.remove(&consumed);
            if self.mint_baton.as_deref() == Some(consumed.as_str()) {
                self.mint_baton = None;
            }
        }

        for output in outputs {
            let outpoint = match output.outpoint(txid) {
                Some(o) => o,
                None => continue,
            };
            if output.status.is_live() {
                self.utxos.insert(outpoint);
            } else {
                self.utxos.remove(&outpoint);
            }
        }

        if let Some(baton_vout) = details.baton_vout {
            let baton_outpoint = outpoint_key(txid, baton_vout);
            let live = outputs
                .iter()
                .any(|o| o.vout == Some(baton_vout) && o.status.is_live());
            if live {
                self.mint_baton = Some(baton_outpoint);
            } else if self.mint_baton.as_deref() == Some(baton_outpoint.as_str()) {
                self.mint_baton = None;
            }
        }
    }
}
