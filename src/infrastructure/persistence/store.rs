use async_trait::async_trait;

use super::dto::{AddressBalanceDbo, GraphTxnDbo, TokenDbo, UtxoDbo};
use super::error::DbError;

/// Persistence boundary for everything the engine publishes. All operations
/// are idempotent upserts keyed by token id; the statistics pass replaces
/// whole collections, never patches them.
#[async_trait]
pub trait GraphPersistence: Send + Sync {
    /// Upsert the token summary
    async fn token_insert_replace(&self, token: &TokenDbo) -> Result<(), DbError>;

    /// Replace the token's graph rows wholesale
    async fn graph_insert_replace(
        &self,
        token_id: &str,
        graph: &[GraphTxnDbo],
    ) -> Result<(), DbError>;

    /// Replace the token's live UTXO rows wholesale
    async fn utxo_insert_replace(&self, token_id: &str, utxos: &[UtxoDbo])
        -> Result<(), DbError>;

    /// Replace the token's address-balance rows wholesale
    async fn address_insert_replace(
        &self,
        token_id: &str,
        addresses: &[AddressBalanceDbo],
    ) -> Result<(), DbError>;
}
