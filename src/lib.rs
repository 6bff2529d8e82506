//! SLP token-graph engine: per-token transaction DAG, live UTXO/baton ledger,
//! and derived statistics for a Simple Ledger Protocol indexer.
//!
//! One [`SlpTokenGraph`] is created per token id by the surrounding indexer.
//! The engine talks to the node, the spend index, the validity oracle, the
//! transaction decoder and the persistence layer exclusively through the
//! traits in [`infrastructure`], so it can be driven against a live node or
//! fully in memory.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod utils;

pub use application::graph::SlpTokenGraph;
pub use config::AppConfig;
pub use domain::errors::GraphError;
pub use infrastructure::sync::{IndexerState, SyncStatus};
