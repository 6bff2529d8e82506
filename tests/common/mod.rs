//! Shared in-memory collaborators for the integration tests: a mock node,
//! validity oracle, spend index and persistence sink, plus builders for
//! consensus-encoded test transactions and token details.

#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};

use slp_indexer::application::graph::{BlockContext, GraphDependencies};
use slp_indexer::config::GraphConfig;
use slp_indexer::domain::models::{
    outpoint_key, SlpTokenDetails, SlpTransactionType, SlpVersionType,
};
use slp_indexer::infrastructure::decode::{ConsensusDecoder, DecodeError, TxnDecoder};
use slp_indexer::infrastructure::node::{NodeClientError, NodeSource, TxOutInfo};
use slp_indexer::infrastructure::persistence::dto::{
    AddressBalanceDbo, GraphTxnDbo, TokenDbo, UtxoDbo,
};
use slp_indexer::infrastructure::persistence::error::DbError;
use slp_indexer::infrastructure::persistence::GraphPersistence;
use slp_indexer::infrastructure::query::{MintInfo, QueryError, SpendIndex, TxoSpendInfo};
use slp_indexer::infrastructure::sync::{IndexerState, SyncStatus};
use slp_indexer::infrastructure::validation::{OracleError, TxnValidation, ValidityOracle};
use slp_indexer::domain::models::RawTransaction;
use slp_indexer::{GraphError, SlpTokenGraph};

/// Deterministic 64-hex txid from a one-byte tag
pub fn txid(tag: u8) -> String {
    hex::encode([tag; 32])
}

/// Consensus-encode a transaction with the given inputs and value/address
/// outputs. Output 0 is always an OP_RETURN placeholder, so the first entry
/// of `outputs` lands at vout 1, matching the SLP output numbering.
pub fn build_transaction(inputs: &[(&str, u32)], outputs: &[(u64, &str)]) -> String {
    assert!(
        !inputs.is_empty(),
        "test transactions need at least one input to encode unambiguously"
    );
    let input = inputs
        .iter()
        .map(|(prev_txid, prev_vout)| TxIn {
            previous_output: OutPoint {
                txid: Txid::from_str(prev_txid).expect("previous txid"),
                vout: *prev_vout,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        })
        .collect();
    let mut output = vec![TxOut {
        value: Amount::from_sat(0),
        script_pubkey: ScriptBuf::from_bytes(vec![0x6a]),
    }];
    for (satoshis, address) in outputs {
        output.push(TxOut {
            value: Amount::from_sat(*satoshis),
            script_pubkey: ScriptBuf::from_bytes(address.as_bytes().to_vec()),
        });
    }
    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input,
        output,
    };
    bitcoin::consensus::encode::serialize_hex(&tx)
}

pub fn block_context(hash: &str, txids: &[&str]) -> BlockContext {
    BlockContext {
        hash: hash.to_string(),
        transactions: txids.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn genesis_details(token_id: &str, quantity: u64, baton_vout: Option<u32>) -> SlpTokenDetails {
    SlpTokenDetails {
        transaction_type: SlpTransactionType::Genesis,
        token_id: token_id.to_string(),
        version_type: SlpVersionType::TokenType1,
        timestamp: None,
        symbol: "TSLP".to_string(),
        name: "Test SLP Token".to_string(),
        document_uri: String::new(),
        document_sha256_hex: None,
        decimals: 0,
        contains_baton: baton_vout.is_some(),
        baton_vout,
        genesis_or_mint_quantity: Some(quantity),
        send_outputs: None,
    }
}

pub fn mint_details(token_id: &str, quantity: u64, baton_vout: Option<u32>) -> SlpTokenDetails {
    SlpTokenDetails {
        transaction_type: SlpTransactionType::Mint,
        token_id: token_id.to_string(),
        version_type: SlpVersionType::TokenType1,
        timestamp: None,
        symbol: String::new(),
        name: String::new(),
        document_uri: String::new(),
        document_sha256_hex: None,
        decimals: 0,
        contains_baton: baton_vout.is_some(),
        baton_vout,
        genesis_or_mint_quantity: Some(quantity),
        send_outputs: None,
    }
}

/// SEND details; `amounts` are the per-vout quantities starting at vout 1
pub fn send_details(token_id: &str, amounts: &[u64]) -> SlpTokenDetails {
    let mut send_outputs = vec![0u64];
    send_outputs.extend_from_slice(amounts);
    SlpTokenDetails {
        transaction_type: SlpTransactionType::Send,
        token_id: token_id.to_string(),
        version_type: SlpVersionType::TokenType1,
        timestamp: None,
        symbol: String::new(),
        name: String::new(),
        document_uri: String::new(),
        document_sha256_hex: None,
        decimals: 0,
        contains_baton: false,
        baton_vout: None,
        genesis_or_mint_quantity: None,
        send_outputs: Some(send_outputs),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("test mock state")
}

#[derive(Default)]
struct NodeState {
    utxos: HashMap<String, TxOutInfo>,
    raw: HashMap<String, String>,
    block_hashes: HashMap<String, String>,
    mempool: Vec<String>,
    height: u64,
}

/// In-memory stand-in for the Bitcoin Core RPC surface the engine uses
#[derive(Default)]
pub struct MockNode {
    state: Mutex<NodeState>,
}

impl MockNode {
    pub fn set_height(&self, height: u64) {
        lock(&self.state).height = height;
    }

    pub fn add_utxo(&self, outpoint: &str, satoshis: u64, confirmations: u32) {
        lock(&self.state).utxos.insert(
            outpoint.to_string(),
            TxOutInfo {
                satoshis,
                confirmations,
            },
        );
    }

    pub fn spend_utxo(&self, outpoint: &str) {
        lock(&self.state).utxos.remove(outpoint);
    }

    pub fn add_raw(&self, txid: &str, raw_hex: &str) {
        lock(&self.state)
            .raw
            .insert(txid.to_string(), raw_hex.to_string());
    }

    pub fn set_block_hash(&self, txid: &str, hash: &str) {
        lock(&self.state)
            .block_hashes
            .insert(txid.to_string(), hash.to_string());
    }

    pub fn add_to_mempool(&self, txid: &str) {
        let mut state = lock(&self.state);
        if !state.mempool.iter().any(|t| t == txid) {
            state.mempool.push(txid.to_string());
        }
    }

    pub fn remove_from_mempool(&self, txid: &str) {
        lock(&self.state).mempool.retain(|t| t != txid);
    }

    /// Drop every trace of a transaction, as a double-spend eviction would
    pub fn forget_transaction(&self, txid: &str) {
        let mut state = lock(&self.state);
        state.raw.remove(txid);
        state.block_hashes.remove(txid);
        state.mempool.retain(|t| t != txid);
        let prefix = format!("{}:", txid);
        state.utxos.retain(|outpoint, _| !outpoint.starts_with(&prefix));
    }
}

#[async_trait]
impl NodeSource for MockNode {
    async fn get_tx_out(
        &self,
        txid: &str,
        vout: u32,
    ) -> Result<Option<TxOutInfo>, NodeClientError> {
        Ok(lock(&self.state)
            .utxos
            .get(&outpoint_key(txid, vout))
            .copied())
    }

    async fn raw_transaction_hex(&self, txid: &str) -> Result<String, NodeClientError> {
        lock(&self.state)
            .raw
            .get(txid)
            .cloned()
            .ok_or_else(|| NodeClientError::NotFound(txid.to_string()))
    }

    async fn raw_mempool(&self) -> Result<Vec<String>, NodeClientError> {
        Ok(lock(&self.state).mempool.clone())
    }

    async fn transaction_block_hash(&self, txid: &str) -> Result<String, NodeClientError> {
        let state = lock(&self.state);
        if let Some(hash) = state.block_hashes.get(txid) {
            return Ok(hash.clone());
        }
        if state.raw.contains_key(txid) {
            // Known but unconfirmed
            return Err(NodeClientError::NotFound(txid.to_string()));
        }
        Err(NodeClientError::ConnectionError(format!(
            "no such transaction: {}",
            txid
        )))
    }

    async fn best_block_height(&self) -> Result<u64, NodeClientError> {
        Ok(lock(&self.state).height)
    }
}

#[derive(Default)]
struct OracleState {
    validations: HashMap<String, TxnValidation>,
    raw: HashMap<String, String>,
}

/// Validity oracle with pre-seeded verdicts; unknown txids judge invalid
#[derive(Default)]
pub struct MockOracle {
    state: Mutex<OracleState>,
}

impl MockOracle {
    pub fn add_validation(
        &self,
        txid: &str,
        validity: bool,
        details: Option<SlpTokenDetails>,
        invalid_reason: Option<&str>,
    ) {
        lock(&self.state).validations.insert(
            txid.to_string(),
            TxnValidation {
                validity,
                details,
                invalid_reason: invalid_reason.map(str::to_string),
            },
        );
    }

    pub fn add_raw(&self, txid: &str, raw_hex: &str) {
        lock(&self.state)
            .raw
            .insert(txid.to_string(), raw_hex.to_string());
    }

    pub fn has_validation(&self, txid: &str) -> bool {
        lock(&self.state).validations.contains_key(txid)
    }
}

#[async_trait]
impl ValidityOracle for MockOracle {
    async fn is_valid(&self, txid: &str, token_id: &str) -> Result<bool, OracleError> {
        let state = lock(&self.state);
        Ok(state.validations.get(txid).is_some_and(|v| {
            v.validity
                && v.details
                    .as_ref()
                    .is_some_and(|d| d.token_id == token_id)
        }))
    }

    async fn validation(&self, txid: &str) -> Option<TxnValidation> {
        lock(&self.state).validations.get(txid).cloned()
    }

    async fn raw_transactions(&self, txids: &[String]) -> Result<Vec<String>, OracleError> {
        let state = lock(&self.state);
        txids
            .iter()
            .map(|txid| {
                state
                    .raw
                    .get(txid)
                    .cloned()
                    .ok_or_else(|| OracleError::MissingRawTransaction(txid.clone()))
            })
            .collect()
    }

    async fn seed_validation(&self, txid: &str, validation: TxnValidation) {
        lock(&self.state)
            .validations
            .insert(txid.to_string(), validation);
    }

    async fn evict(&self, txid: &str) {
        let mut state = lock(&self.state);
        state.validations.remove(txid);
        state.raw.remove(txid);
    }
}

#[derive(Default)]
struct IndexState {
    send_spends: HashMap<String, TxoSpendInfo>,
    mint_spends: HashMap<String, TxoSpendInfo>,
    preload: HashMap<String, TxoSpendInfo>,
    mints: Vec<MintInfo>,
    genesis_block: Option<u64>,
    last_minted: Option<u64>,
    last_sent: Option<u64>,
}

/// Spend index over plain maps. The preload set is separate from the live
/// lookups so tests can model an index that lags the node.
#[derive(Default)]
pub struct MockSpendIndex {
    state: Mutex<IndexState>,
}

impl MockSpendIndex {
    pub fn record_send_spend(
        &self,
        outpoint: &str,
        spender: &str,
        block: Option<u64>,
        block_hash: Option<&str>,
    ) {
        lock(&self.state).send_spends.insert(
            outpoint.to_string(),
            TxoSpendInfo {
                txid: spender.to_string(),
                block,
                block_hash: block_hash.map(str::to_string),
            },
        );
    }

    pub fn record_mint_spend(
        &self,
        outpoint: &str,
        spender: &str,
        block: Option<u64>,
        block_hash: Option<&str>,
    ) {
        lock(&self.state).mint_spends.insert(
            outpoint.to_string(),
            TxoSpendInfo {
                txid: spender.to_string(),
                block,
                block_hash: block_hash.map(str::to_string),
            },
        );
    }

    pub fn remove_send_spend(&self, outpoint: &str) {
        lock(&self.state).send_spends.remove(outpoint);
    }

    pub fn remove_mint_spend(&self, outpoint: &str) {
        lock(&self.state).mint_spends.remove(outpoint);
    }

    pub fn preload_send_spend(
        &self,
        outpoint: &str,
        spender: &str,
        block: Option<u64>,
        block_hash: Option<&str>,
    ) {
        lock(&self.state).preload.insert(
            outpoint.to_string(),
            TxoSpendInfo {
                txid: spender.to_string(),
                block,
                block_hash: block_hash.map(str::to_string),
            },
        );
    }

    pub fn add_mint(&self, txid: &str, block: Option<u64>) {
        lock(&self.state).mints.push(MintInfo {
            txid: txid.to_string(),
            block,
        });
    }

    pub fn set_blocks(&self, genesis: Option<u64>, last_minted: Option<u64>, last_sent: Option<u64>) {
        let mut state = lock(&self.state);
        state.genesis_block = genesis;
        state.last_minted = last_minted;
        state.last_sent = last_sent;
    }
}

#[async_trait]
impl SpendIndex for MockSpendIndex {
    async fn txo_input_as_send(
        &self,
        txid: &str,
        vout: u32,
    ) -> Result<Option<TxoSpendInfo>, QueryError> {
        Ok(lock(&self.state)
            .send_spends
            .get(&outpoint_key(txid, vout))
            .cloned())
    }

    async fn txo_input_as_mint(
        &self,
        txid: &str,
        vout: u32,
    ) -> Result<Option<TxoSpendInfo>, QueryError> {
        Ok(lock(&self.state)
            .mint_spends
            .get(&outpoint_key(txid, vout))
            .cloned())
    }

    async fn send_spend_preload(
        &self,
        _token_id: &str,
    ) -> Result<HashMap<String, TxoSpendInfo>, QueryError> {
        Ok(lock(&self.state).preload.clone())
    }

    async fn mint_transactions(&self, _token_id: &str) -> Result<Vec<MintInfo>, QueryError> {
        Ok(lock(&self.state).mints.clone())
    }

    async fn token_genesis_block(&self, _token_id: &str) -> Result<Option<u64>, QueryError> {
        Ok(lock(&self.state).genesis_block)
    }

    async fn block_last_minted(&self, _token_id: &str) -> Result<Option<u64>, QueryError> {
        Ok(lock(&self.state).last_minted)
    }

    async fn block_last_sent(&self, _token_id: &str) -> Result<Option<u64>, QueryError> {
        Ok(lock(&self.state).last_sent)
    }
}

#[derive(Default)]
struct SavedSnapshots {
    token: Option<TokenDbo>,
    graph: Vec<GraphTxnDbo>,
    utxos: Vec<UtxoDbo>,
    addresses: Vec<AddressBalanceDbo>,
    token_saves: usize,
}

/// Persistence sink capturing the most recent published snapshot
#[derive(Default)]
pub struct MockStore {
    state: Mutex<SavedSnapshots>,
}

impl MockStore {
    pub fn saved_token(&self) -> Option<TokenDbo> {
        lock(&self.state).token.clone()
    }

    pub fn saved_graph(&self) -> Vec<GraphTxnDbo> {
        lock(&self.state).graph.clone()
    }

    pub fn saved_utxos(&self) -> Vec<UtxoDbo> {
        lock(&self.state).utxos.clone()
    }

    pub fn saved_addresses(&self) -> Vec<AddressBalanceDbo> {
        lock(&self.state).addresses.clone()
    }

    pub fn token_saves(&self) -> usize {
        lock(&self.state).token_saves
    }
}

#[async_trait]
impl GraphPersistence for MockStore {
    async fn token_insert_replace(&self, token: &TokenDbo) -> Result<(), DbError> {
        let mut state = lock(&self.state);
        state.token = Some(token.clone());
        state.token_saves += 1;
        Ok(())
    }

    async fn graph_insert_replace(
        &self,
        _token_id: &str,
        graph: &[GraphTxnDbo],
    ) -> Result<(), DbError> {
        lock(&self.state).graph = graph.to_vec();
        Ok(())
    }

    async fn utxo_insert_replace(
        &self,
        _token_id: &str,
        utxos: &[UtxoDbo],
    ) -> Result<(), DbError> {
        lock(&self.state).utxos = utxos.to_vec();
        Ok(())
    }

    async fn address_insert_replace(
        &self,
        _token_id: &str,
        addresses: &[AddressBalanceDbo],
    ) -> Result<(), DbError> {
        lock(&self.state).addresses = addresses.to_vec();
        Ok(())
    }
}

/// Decoder that reads the output script bytes back as UTF-8 addresses,
/// matching how [`build_transaction`] encodes them.
#[derive(Default)]
pub struct TestDecoder {
    inner: ConsensusDecoder,
}

impl TxnDecoder for TestDecoder {
    fn decode_transaction(&self, raw_hex: &str) -> Result<RawTransaction, DecodeError> {
        self.inner.decode_transaction(raw_hex)
    }

    fn address_from_script(&self, script: &[u8]) -> Option<String> {
        std::str::from_utf8(script).ok().map(str::to_string)
    }
}

/// One token's test universe: every collaborator the engine talks to, wired
/// so that [`TokenWorld::register_txn`] keeps them mutually consistent.
pub struct TokenWorld {
    pub node: Arc<MockNode>,
    pub oracle: Arc<MockOracle>,
    pub spend_index: Arc<MockSpendIndex>,
    pub store: Arc<MockStore>,
    pub sync: Arc<SyncStatus>,
}

impl TokenWorld {
    pub fn new() -> Self {
        let sync = Arc::new(SyncStatus::new());
        sync.set_synced(true);
        sync.set_state(IndexerState::Running);
        sync.set_best_block_height(100);
        let node = Arc::new(MockNode::default());
        node.set_height(100);
        Self {
            node,
            oracle: Arc::new(MockOracle::default()),
            spend_index: Arc::new(MockSpendIndex::default()),
            store: Arc::new(MockStore::default()),
            sync,
        }
    }

    pub fn dependencies(&self) -> GraphDependencies {
        GraphDependencies {
            node: self.node.clone(),
            decoder: Arc::new(TestDecoder::default()),
            oracle: self.oracle.clone(),
            spend_index: self.spend_index.clone(),
            store: self.store.clone(),
        }
    }

    pub fn engine(&self, genesis_details: SlpTokenDetails) -> SlpTokenGraph {
        SlpTokenGraph::new(
            genesis_details,
            self.dependencies(),
            self.sync.clone(),
            GraphConfig::default(),
        )
    }

    pub async fn restored_engine(
        &self,
        token: &TokenDbo,
        graph: &[GraphTxnDbo],
        utxos: &[UtxoDbo],
    ) -> Result<SlpTokenGraph, GraphError> {
        SlpTokenGraph::from_db_snapshot(
            token,
            graph,
            utxos,
            self.dependencies(),
            self.sync.clone(),
            GraphConfig::default(),
        )
        .await
    }

    /// Register one transaction everywhere a real one would show up: raw
    /// hex on the node and the oracle, a positive oracle verdict, spent
    /// inputs, fresh UTXO entries, index spend records and either a block
    /// hash or mempool membership.
    pub fn register_txn(
        &self,
        txid: &str,
        details: &SlpTokenDetails,
        inputs: &[(&str, u32)],
        outputs: &[(u64, &str)],
        block: Option<(u64, &str)>,
    ) {
        let raw_hex = build_transaction(inputs, outputs);
        self.node.add_raw(txid, &raw_hex);
        self.oracle.add_raw(txid, &raw_hex);
        self.oracle
            .add_validation(txid, true, Some(details.clone()), None);

        for (prev_txid, prev_vout) in inputs {
            self.node.spend_utxo(&outpoint_key(prev_txid, *prev_vout));
        }
        let confirmations = if block.is_some() { 1 } else { 0 };
        for (index, (satoshis, _)) in outputs.iter().enumerate() {
            let vout = index as u32 + 1;
            self.node
                .add_utxo(&outpoint_key(txid, vout), *satoshis, confirmations);
        }

        let block_height = block.map(|(height, _)| height);
        let block_hash = block.map(|(_, hash)| hash);
        match details.transaction_type {
            SlpTransactionType::Send => {
                for (prev_txid, prev_vout) in inputs {
                    self.spend_index.record_send_spend(
                        &outpoint_key(prev_txid, *prev_vout),
                        txid,
                        block_height,
                        block_hash,
                    );
                }
            }
            SlpTransactionType::Mint => {
                for (prev_txid, prev_vout) in inputs {
                    self.spend_index.record_mint_spend(
                        &outpoint_key(prev_txid, *prev_vout),
                        txid,
                        block_height,
                        block_hash,
                    );
                }
                self.spend_index.add_mint(txid, block_height);
            }
            SlpTransactionType::Genesis => {}
        }

        match block {
            Some((_, hash)) => self.node.set_block_hash(txid, hash),
            None => self.node.add_to_mempool(txid),
        }
    }

    /// Confirm a previously mempool-registered transaction
    pub fn confirm(&self, txid: &str, hash: &str) {
        self.node.set_block_hash(txid, hash);
        self.node.remove_from_mempool(txid);
    }
}
