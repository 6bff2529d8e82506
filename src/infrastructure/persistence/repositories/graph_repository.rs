use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::fmt;

use crate::infrastructure::persistence::dto::{
    AddressBalanceDbo, GraphTxnDbo, TokenDbo, UtxoDbo,
};
use crate::infrastructure::persistence::entities::{
    graph_txn, token_address, token_summary, token_utxo,
};
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::store::GraphPersistence;

/// Rows per INSERT statement when replacing collections
const INSERT_CHUNK: usize = 500;

/// Repository for token graph persistence
#[derive(Clone)]
pub struct GraphRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for GraphRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphRepository").finish_non_exhaustive()
    }
}

impl GraphRepository {
    /// Create a new GraphRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get database connection for direct queries
    pub fn get_connection(&self) -> &DatabaseConnection {
        &self.conn
    }
}

#[async_trait]
impl GraphPersistence for GraphRepository {
    async fn token_insert_replace(&self, token: &TokenDbo) -> Result<(), DbError> {
        let details = serde_json::to_value(&token.token_details)?;
        let stats = serde_json::to_value(&token.token_stats)?;
        let now = Utc::now();

        let existing = token_summary::Entity::find_by_id(token.token_details.token_id.clone())
            .one(&self.conn)
            .await?;

        if let Some(model) = existing {
            let mut update_model: token_summary::ActiveModel = model.into();
            update_model.schema_version = Set(token.schema_version as i32);
            update_model.details = Set(details);
            update_model.stats = Set(stats);
            update_model.mint_baton_utxo = Set(token.mint_baton_utxo.clone());
            update_model.last_updated_block = Set(token.last_updated_block as i64);
            update_model.nft_parent_id = Set(token.nft_parent_id.clone());
            update_model.updated_at = Set(now);

            update_model.update(&self.conn).await?;
        } else {
            let new_model = token_summary::ActiveModel {
                token_id: Set(token.token_details.token_id.clone()),
                schema_version: Set(token.schema_version as i32),
                details: Set(details),
                stats: Set(stats),
                mint_baton_utxo: Set(token.mint_baton_utxo.clone()),
                last_updated_block: Set(token.last_updated_block as i64),
                nft_parent_id: Set(token.nft_parent_id.clone()),
                updated_at: Set(now),
            };

            new_model.insert(&self.conn).await?;
        }

        Ok(())
    }

    async fn graph_insert_replace(
        &self,
        token_id: &str,
        graph: &[GraphTxnDbo],
    ) -> Result<(), DbError> {
        graph_txn::Entity::delete_many()
            .filter(graph_txn::Column::TokenId.eq(token_id))
            .exec(&self.conn)
            .await?;

        if graph.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let mut rows = Vec::with_capacity(graph.len());
        for g in graph {
            rows.push(graph_txn::ActiveModel {
                txid: Set(g.txid.clone()),
                token_id: Set(g.token_id.clone()),
                details: Set(serde_json::to_value(&g.details)?),
                outputs: Set(serde_json::to_value(&g.outputs)?),
                inputs: Set(serde_json::to_value(&g.inputs)?),
                block_hash: Set(g.block_hash.clone()),
                updated_at: Set(now),
            });
        }
        for chunk in rows.chunks(INSERT_CHUNK) {
            graph_txn::Entity::insert_many(chunk.to_vec())
                .exec(&self.conn)
                .await?;
        }

        Ok(())
    }

    async fn utxo_insert_replace(
        &self,
        token_id: &str,
        utxos: &[UtxoDbo],
    ) -> Result<(), DbError> {
        token_utxo::Entity::delete_many()
            .filter(token_utxo::Column::TokenId.eq(token_id))
            .exec(&self.conn)
            .await?;

        if utxos.is_empty() {
            return Ok(());
        }

        let rows: Vec<token_utxo::ActiveModel> = utxos
            .iter()
            .map(|u| token_utxo::ActiveModel {
                utxo: Set(u.utxo.clone()),
                token_id: Set(u.token_id.clone()),
                txid: Set(u.txid.clone()),
                vout: Set(u.vout as i32),
                address: Set(u.address.clone()),
                satoshis: Set(u.satoshis as i64),
                token_amount: Set(u.token_amount),
                is_baton: Set(u.is_baton),
            })
            .collect();
        for chunk in rows.chunks(INSERT_CHUNK) {
            token_utxo::Entity::insert_many(chunk.to_vec())
                .exec(&self.conn)
                .await?;
        }

        Ok(())
    }

    async fn address_insert_replace(
        &self,
        token_id: &str,
        addresses: &[AddressBalanceDbo],
    ) -> Result<(), DbError> {
        token_address::Entity::delete_many()
            .filter(token_address::Column::TokenId.eq(token_id))
            .exec(&self.conn)
            .await?;

        if addresses.is_empty() {
            return Ok(());
        }

        let rows: Vec<token_address::ActiveModel> = addresses
            .iter()
            .map(|a| token_address::ActiveModel {
                token_id: Set(a.token_id.clone()),
                address: Set(a.address.clone()),
                satoshis_balance: Set(a.satoshis_balance as i64),
                token_balance: Set(a.token_balance),
            })
            .collect();
        for chunk in rows.chunks(INSERT_CHUNK) {
            token_address::Entity::insert_many(chunk.to_vec())
                .exec(&self.conn)
                .await?;
        }

        Ok(())
    }
}
