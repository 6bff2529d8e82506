//! Per-token graph engine.
//!
//! One [`SlpTokenGraph`] exists per token id. It owns the transaction graph,
//! the live UTXO/baton ledger, the spend resolver and two serialized queues:
//! the graph queue linearizes every mutation, the statistics queue runs the
//! recomputation passes. All collaborator access goes through the trait seams
//! in [`crate::infrastructure`].

mod builder;
mod nft;
mod repair;
mod serialize;
mod stats;

pub use builder::BlockContext;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::config::GraphConfig;
use crate::domain::errors::GraphError;
use crate::domain::models::{
    AddressBalance, GraphTxn, SlpTokenDetails, SlpVersionType, TokenStats,
};
use crate::domain::services::{SpendResolver, UtxoLedger};
use crate::infrastructure::decode::TxnDecoder;
use crate::infrastructure::node::NodeSource;
use crate::infrastructure::persistence::dto::{
    AddressBalanceDbo, GraphTxnDbo, TokenDbo, UtxoDbo,
};
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::store::GraphPersistence;
use crate::infrastructure::query::SpendIndex;
use crate::infrastructure::queue::UpdateQueue;
use crate::infrastructure::sync::SyncStatus;
use crate::infrastructure::validation::{TxnValidation, ValidityOracle};
use crate::utils::logging::{log_error, log_info, log_warning};

/// Collaborator handles one engine instance talks to
#[derive(Clone)]
pub struct GraphDependencies {
    pub node: Arc<dyn NodeSource>,
    pub decoder: Arc<dyn TxnDecoder>,
    pub oracle: Arc<dyn ValidityOracle>,
    pub spend_index: Arc<dyn SpendIndex>,
    pub store: Arc<dyn GraphPersistence>,
}

/// Mutable engine state, serialized behind a mutex. Queue discipline keeps
/// mutations ordered; the mutex only orders queue tasks against direct calls.
struct GraphCore {
    token_id: String,
    genesis_details: SlpTokenDetails,
    graph: BTreeMap<String, GraphTxn>,
    ledger: UtxoLedger,
    resolver: SpendResolver,
    addresses: BTreeMap<String, AddressBalance>,
    stats: TokenStats,
    nft_parent_id: Option<String>,
    last_updated_block: u64,
    node: Arc<dyn NodeSource>,
    decoder: Arc<dyn TxnDecoder>,
    oracle: Arc<dyn ValidityOracle>,
    spend_index: Arc<dyn SpendIndex>,
    store: Arc<dyn GraphPersistence>,
    sync: Arc<SyncStatus>,
    config: GraphConfig,
    exit: Arc<AtomicBool>,
}

/// Cheap handle cloned into queue tasks
#[derive(Clone)]
struct EngineCtx {
    core: Arc<Mutex<GraphCore>>,
    graph_queue: UpdateQueue,
    stats_queue: UpdateQueue,
}

/// Token graph engine for a single token id
pub struct SlpTokenGraph {
    token_id: String,
    core: Arc<Mutex<GraphCore>>,
    graph_queue: UpdateQueue,
    stats_queue: UpdateQueue,
    exit: Arc<AtomicBool>,
}

impl SlpTokenGraph {
    /// Create an engine for the token described by its genesis details. The
    /// graph queue starts paused and is released by [`SlpTokenGraph::initialize`].
    pub fn new(
        genesis_details: SlpTokenDetails,
        deps: GraphDependencies,
        sync: Arc<SyncStatus>,
        config: GraphConfig,
    ) -> Self {
        let token_id = genesis_details.token_id.clone();
        let exit = Arc::new(AtomicBool::new(false));
        let resolver = SpendResolver::new(
            token_id.clone(),
            deps.node.clone(),
            deps.spend_index.clone(),
            deps.oracle.clone(),
            sync.clone(),
            &config,
        );
        let core = GraphCore {
            token_id: token_id.clone(),
            genesis_details,
            graph: BTreeMap::new(),
            ledger: UtxoLedger::new(),
            resolver,
            addresses: BTreeMap::new(),
            stats: TokenStats::default(),
            nft_parent_id: None,
            last_updated_block: 0,
            node: deps.node,
            decoder: deps.decoder,
            oracle: deps.oracle,
            spend_index: deps.spend_index,
            store: deps.store,
            sync,
            config,
            exit: exit.clone(),
        };
        Self {
            token_id,
            core: Arc::new(Mutex::new(core)),
            graph_queue: UpdateQueue::new(true),
            stats_queue: UpdateQueue::new(false),
            exit,
        }
    }

    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// Startup: preload the spend cache, replay the graph from the genesis
    /// transaction, resolve the NFT parent or back-fill known MINTs, publish
    /// first statistics, then release the graph queue. Returns whether the
    /// genesis extension succeeded.
    pub async fn initialize(&self, process_up_to: Option<u64>) -> Result<bool, GraphError> {
        let mut core = self.core.lock().await;

        match core.resolver.preload().await {
            Ok(count) => log_info(&format!(
                "Loaded {} spends into the startup cache for token {}",
                count, self.token_id
            )),
            Err(e) => log_warning(&format!(
                "Spend preload failed for token {}: {}",
                self.token_id, e
            )),
        }

        let (result, follow_ups) =
            builder::extend(&mut core, &self.token_id, false, true, process_up_to, None).await?;
        let success = result == Some(true);

        if success {
            if core.genesis_details.version_type == SlpVersionType::Nft1Child {
                if core.nft_parent_id.is_none() {
                    core.nft_parent_id = nft::resolve_nft_parent(&core, &self.token_id).await;
                }
            } else {
                let mints = match core.spend_index.mint_transactions(&self.token_id).await {
                    Ok(mints) => mints,
                    Err(e) => {
                        log_warning(&format!(
                            "MINT backfill query failed for token {}: {}",
                            self.token_id, e
                        ));
                        Vec::new()
                    }
                };
                for mint in mints {
                    builder::extend(&mut core, &mint.txid, true, true, process_up_to, None)
                        .await?;
                }
            }

            match core.node.transaction_block_hash(&self.token_id).await {
                Ok(hash) => {
                    if let Some(node) = core.graph.get_mut(&self.token_id) {
                        node.block_hash = Some(hash);
                    }
                }
                Err(e) => log_warning(&format!(
                    "No block hash for genesis {}: {}",
                    self.token_id, e
                )),
            }

            stats::update_statistics(&mut core).await?;
        }

        core.resolver.drop_startup_cache();
        drop(core);
        self.graph_queue.start();
        for follow_up in follow_ups {
            drop(self.enqueue_update(follow_up.txid, follow_up.is_parent, None, None));
        }
        log_info(&format!(
            "Token graph {} initialized (valid: {})",
            self.token_id, success
        ));
        Ok(success)
    }

    /// Graceful teardown: stop consuming work, cancel queued tasks and await
    /// the in-flight ones. The engine accepts no work afterwards.
    pub async fn stop(&self) {
        self.exit.store(true, Ordering::SeqCst);
        self.graph_queue.pause();
        self.stats_queue.pause();
        self.graph_queue.clear();
        self.stats_queue.clear();
        self.graph_queue.on_idle().await;
        self.stats_queue.on_idle().await;
        self.graph_queue.close();
        self.stats_queue.close();
        log_info(&format!("Token graph {} stopped", self.token_id));
    }

    /// Enqueue a graph update. The task is queued immediately; the returned
    /// future resolves with the extension result and may be dropped for
    /// fire-and-forget use.
    pub fn enqueue_update(
        &self,
        txid: String,
        is_parent: bool,
        process_up_to: Option<u64>,
        block: Option<BlockContext>,
    ) -> impl Future<Output = Result<Option<bool>, GraphError>> {
        enqueue_graph_task(&self.ctx(), txid, is_parent, process_up_to, block)
    }

    /// Extend the graph directly, bypassing the queue. Intended for startup
    /// backfill while the graph queue is still paused. `refresh_outputs`
    /// forces re-resolution of an already-graphed transaction's outputs;
    /// pass false to materialize without disturbing recorded statuses.
    pub async fn extend(
        &self,
        txid: &str,
        is_parent: bool,
        refresh_outputs: bool,
        process_up_to: Option<u64>,
        block: Option<&BlockContext>,
    ) -> Result<Option<bool>, GraphError> {
        let mut core = self.core.lock().await;
        let (result, follow_ups) =
            builder::extend(&mut core, txid, is_parent, refresh_outputs, process_up_to, block)
                .await?;
        drop(core);
        for follow_up in follow_ups {
            drop(self.enqueue_update(follow_up.txid, follow_up.is_parent, None, None));
        }
        Ok(result)
    }

    /// Recompute statistics once the graph queue is idle. Skipped without
    /// error if graph work is queued when the task runs.
    pub async fn recompute_statistics(&self) -> Result<(), GraphError> {
        let core = self.core.clone();
        let graph_queue = self.graph_queue.clone();
        let task = async move {
            if graph_queue.size() > 0 {
                return Ok(());
            }
            let mut core = core.lock().await;
            stats::update_statistics(&mut core).await
        };
        match self.stats_queue.add(task).await {
            Ok(result) => result,
            Err(e) => Err(GraphError::from(e)),
        }
    }

    /// Sweep every live outpoint (and the baton) against the node, repairing
    /// state for outputs that vanished outside the notification flow.
    pub async fn search_for_non_slp_burns(&self) -> Result<(), GraphError> {
        let mut core = self.core.lock().await;
        let mut outpoints = core.ledger.snapshot();
        if let Some(baton) = core.ledger.mint_baton() {
            let baton = baton.to_string();
            if !outpoints.contains(&baton) {
                outpoints.push(baton);
            }
        }
        for outpoint in outpoints {
            if self.exit.load(Ordering::SeqCst) {
                break;
            }
            let refreshes = repair::update_txo_if_spent(&mut core, &outpoint).await;
            for txid in refreshes {
                builder::extend(&mut core, &txid, true, true, None, None).await?;
            }
        }
        Ok(())
    }

    /// Wait until both queues are idle
    pub async fn on_idle(&self) {
        self.graph_queue.on_idle().await;
        self.stats_queue.on_idle().await;
    }

    /// Persisted token summary
    pub async fn token_dbo(&self) -> TokenDbo {
        serialize::token_dbo(&*self.core.lock().await)
    }

    /// Persisted graph rows
    pub async fn graph_dbos(&self) -> Vec<GraphTxnDbo> {
        serialize::graph_dbos(&*self.core.lock().await)
    }

    /// Persisted live UTXO rows
    pub async fn utxo_dbos(&self) -> Vec<UtxoDbo> {
        serialize::utxo_dbos(&*self.core.lock().await)
    }

    /// Persisted address-balance rows
    pub async fn address_dbos(&self) -> Vec<AddressBalanceDbo> {
        serialize::address_dbos(&*self.core.lock().await)
    }

    /// Rebuild an engine from its persisted snapshot. The validity oracle is
    /// re-seeded with the stored verdicts; address balances are left to the
    /// next statistics pass. The graph queue starts released.
    pub async fn from_db_snapshot(
        token: &TokenDbo,
        graph: &[GraphTxnDbo],
        utxos: &[UtxoDbo],
        deps: GraphDependencies,
        sync: Arc<SyncStatus>,
        config: GraphConfig,
    ) -> Result<Self, GraphError> {
        let details = token.token_details.to_details().ok_or_else(|| {
            GraphError::DbError(DbError::SerializationError(
                "malformed persisted token details".to_string(),
            ))
        })?;
        let engine = Self::new(details, deps, sync, config);
        {
            let mut core = engine.core.lock().await;
            core.last_updated_block = token.last_updated_block;
            core.nft_parent_id = token.nft_parent_id.clone();
            core.stats = token.token_stats.to_stats(core.genesis_details.decimals);

            let utxo_set: BTreeSet<String> = utxos.iter().map(|u| u.utxo.clone()).collect();
            core.ledger = UtxoLedger::restore(utxo_set, token.mint_baton_utxo.clone());

            for dbo in graph {
                let Some(node_details) = dbo.details.to_details() else {
                    log_warning(&format!("Skipping malformed graph row {}", dbo.txid));
                    continue;
                };
                let decimals = node_details.decimals;
                let mut node = GraphTxn::new(node_details.clone());
                node.block_hash = dbo.block_hash.clone();
                node.is_complete = true;
                for output in &dbo.outputs {
                    match output.to_output(decimals) {
                        Some(o) => node.outputs.push(o),
                        None => log_warning(&format!(
                            "Skipping malformed output row in {}",
                            dbo.txid
                        )),
                    }
                }
                for input in &dbo.inputs {
                    match input.to_input(decimals) {
                        Some(i) => node.inputs.push(i),
                        None => log_warning(&format!(
                            "Skipping malformed input row in {}",
                            dbo.txid
                        )),
                    }
                }
                core.oracle
                    .seed_validation(
                        &dbo.txid,
                        TxnValidation {
                            validity: true,
                            details: Some(node_details),
                            invalid_reason: None,
                        },
                    )
                    .await;
                core.graph.insert(dbo.txid.clone(), node);
            }
        }
        engine.graph_queue.start();
        Ok(engine)
    }

    /// Ordered snapshot of the live outpoints
    pub async fn utxos(&self) -> Vec<String> {
        self.core.lock().await.ledger.snapshot()
    }

    /// Current minting-baton outpoint
    pub async fn mint_baton(&self) -> Option<String> {
        self.core.lock().await.ledger.mint_baton().map(str::to_string)
    }

    /// Most recently published statistics
    pub async fn token_stats(&self) -> TokenStats {
        self.core.lock().await.stats.clone()
    }

    /// Snapshot of one graph node
    pub async fn graph_txn(&self, txid: &str) -> Option<GraphTxn> {
        self.core.lock().await.graph.get(txid).cloned()
    }

    /// Number of graphed transactions
    pub async fn graph_size(&self) -> usize {
        self.core.lock().await.graph.len()
    }

    /// Parent token id resolved for an NFT1 child
    pub async fn nft_parent_id(&self) -> Option<String> {
        self.core.lock().await.nft_parent_id.clone()
    }

    /// Last block height the graph was reconciled against
    pub async fn last_updated_block(&self) -> u64 {
        self.core.lock().await.last_updated_block
    }

    fn ctx(&self) -> EngineCtx {
        EngineCtx {
            core: self.core.clone(),
            graph_queue: self.graph_queue.clone(),
            stats_queue: self.stats_queue.clone(),
        }
    }
}

/// Queue a graph task and adapt queue failures into [`GraphError`]
fn enqueue_graph_task(
    ctx: &EngineCtx,
    txid: String,
    is_parent: bool,
    process_up_to: Option<u64>,
    block: Option<BlockContext>,
) -> impl Future<Output = Result<Option<bool>, GraphError>> {
    let added = ctx
        .graph_queue
        .add(graph_task(ctx.clone(), txid, is_parent, process_up_to, block));
    async move {
        match added.await {
            Ok(result) => result,
            Err(e) => Err(GraphError::from(e)),
        }
    }
}

/// One serialized graph mutation plus the queue-drain maintenance: block
/// sweep (when a block context triggered the drain), live-cache invalidation
/// and statistics scheduling.
fn graph_task(
    ctx: EngineCtx,
    txid: String,
    is_parent: bool,
    process_up_to: Option<u64>,
    block: Option<BlockContext>,
) -> BoxFuture<'static, Result<Option<bool>, GraphError>> {
    Box::pin(async move {
        let mut core = ctx.core.lock().await;
        let (result, follow_ups) =
            builder::extend(&mut core, &txid, is_parent, true, process_up_to, block.as_ref())
                .await?;

        for follow_up in follow_ups {
            drop(enqueue_graph_task(
                &ctx,
                follow_up.txid,
                follow_up.is_parent,
                None,
                None,
            ));
        }

        if ctx.graph_queue.size() == 0 && ctx.graph_queue.pending() == 1 {
            log_info(&format!(
                "Graph update queue drained for token {}",
                core.token_id
            ));
            if block.is_some() {
                repair::sweep_unconfirmed(&mut core).await;
            }
            core.resolver.clear_live_cache();
            drop(core);
            schedule_statistics(&ctx);
        }

        Ok(result)
    })
}

/// Fire-and-forget statistics pass; skipped if graph work arrived meanwhile
fn schedule_statistics(ctx: &EngineCtx) {
    let core = ctx.core.clone();
    let graph_queue = ctx.graph_queue.clone();
    drop(ctx.stats_queue.add(async move {
        if graph_queue.size() > 0 {
            return;
        }
        let mut core = core.lock().await;
        if let Err(e) = stats::update_statistics(&mut core).await {
            log_error(&format!(
                "Statistics recomputation failed for token {}: {}",
                core.token_id, e
            ));
        }
    }));
}
