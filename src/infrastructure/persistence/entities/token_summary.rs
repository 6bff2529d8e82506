//! SeaORM Entity for the token summary table

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "token_summaries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub token_id: String,
    pub schema_version: i32,
    pub details: Json,
    pub stats: Json,
    #[sea_orm(column_type = "Text", nullable)]
    pub mint_baton_utxo: Option<String>,
    pub last_updated_block: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub nft_parent_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
