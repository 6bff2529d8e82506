//! Persisted DTO shapes. Token quantities are decimal-rendered in display
//! units; the engine's base-unit integers never reach the store directly.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::models::{
    GraphTxnInput, GraphTxnOutput, OutputStatus, SlpTokenDetails, SlpTransactionType,
    SlpVersionType, TokenBatonStatus, TokenStats,
};

/// Version tag stamped on every persisted token summary
pub const TOKEN_SCHEMA_VERSION: u16 = 1;

/// Render base units as a display-unit decimal
pub fn base_units_to_decimal(amount: u128, decimals: u8) -> Decimal {
    match i128::try_from(amount) {
        Ok(v) => Decimal::try_from_i128_with_scale(v, decimals as u32).unwrap_or(Decimal::MAX),
        Err(_) => Decimal::MAX,
    }
}

/// Recover base units from a display-unit decimal
pub fn decimal_to_base_units(amount: &Decimal, decimals: u8) -> Option<u64> {
    let mut v = *amount;
    v.rescale(decimals as u32);
    u64::try_from(v.mantissa()).ok()
}

/// Wide recovery for aggregate quantities
pub fn decimal_to_base_units_wide(amount: &Decimal, decimals: u8) -> Option<u128> {
    let mut v = *amount;
    v.rescale(decimals as u32);
    u128::try_from(v.mantissa()).ok()
}

/// Persisted form of [`SlpTokenDetails`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlpTokenDetailsDbo {
    pub transaction_type: String,
    pub token_id: String,
    pub version_type: u16,
    pub timestamp: Option<String>,
    pub timestamp_unix: Option<i64>,
    pub symbol: String,
    pub name: String,
    pub document_uri: String,
    pub document_sha256: Option<String>,
    pub decimals: u8,
    pub contains_baton: bool,
    pub baton_vout: Option<u32>,
    pub genesis_or_mint_quantity: Option<Decimal>,
    pub send_outputs: Option<Vec<Decimal>>,
}

impl SlpTokenDetailsDbo {
    pub fn from_details(details: &SlpTokenDetails) -> Self {
        let decimals = details.decimals;
        Self {
            transaction_type: details.transaction_type.to_string(),
            token_id: details.token_id.clone(),
            version_type: details.version_type.code(),
            timestamp: details.timestamp.clone(),
            timestamp_unix: details.timestamp.as_deref().and_then(timestamp_unix),
            symbol: details.symbol.clone(),
            name: details.name.clone(),
            document_uri: details.document_uri.clone(),
            document_sha256: details.document_sha256_hex.clone(),
            decimals,
            contains_baton: details.contains_baton,
            baton_vout: details.baton_vout,
            genesis_or_mint_quantity: details
                .genesis_or_mint_quantity
                .map(|q| base_units_to_decimal(q as u128, decimals)),
            send_outputs: details.send_outputs.as_ref().map(|outs| {
                outs.iter()
                    .map(|q| base_units_to_decimal(*q as u128, decimals))
                    .collect()
            }),
        }
    }

    /// Rebuild domain details; `None` when the stored record is malformed
    pub fn to_details(&self) -> Option<SlpTokenDetails> {
        let transaction_type = SlpTransactionType::from_wire(&self.transaction_type)?;
        let version_type = SlpVersionType::from_code(self.version_type)?;
        let decimals = self.decimals;
        let genesis_or_mint_quantity = match &self.genesis_or_mint_quantity {
            Some(d) => Some(decimal_to_base_units(d, decimals)?),
            None => None,
        };
        let send_outputs = match &self.send_outputs {
            Some(outs) => Some(
                outs.iter()
                    .map(|d| decimal_to_base_units(d, decimals))
                    .collect::<Option<Vec<u64>>>()?,
            ),
            None => None,
        };
        Some(SlpTokenDetails {
            transaction_type,
            token_id: self.token_id.clone(),
            version_type,
            timestamp: self.timestamp.clone(),
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            document_uri: self.document_uri.clone(),
            document_sha256_hex: self.document_sha256.clone(),
            decimals,
            contains_baton: self.contains_baton,
            baton_vout: self.baton_vout,
            genesis_or_mint_quantity,
            send_outputs,
        })
    }
}

fn timestamp_unix(timestamp: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t.and_utc().timestamp())
}

/// Persisted form of [`TokenStats`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenStatsDbo {
    pub block_created: Option<u64>,
    pub block_last_active_send: Option<u64>,
    pub block_last_active_mint: Option<u64>,
    pub qty_valid_txns_since_genesis: u64,
    pub qty_valid_token_utxos: u64,
    pub qty_valid_token_addresses: u64,
    pub qty_token_minted: Decimal,
    pub qty_token_burned: Decimal,
    pub qty_token_circulating_supply: Decimal,
    pub qty_satoshis_locked_up: u64,
    pub minting_baton_status: TokenBatonStatus,
}

impl TokenStatsDbo {
    pub fn from_stats(stats: &TokenStats, decimals: u8) -> Self {
        Self {
            block_created: stats.block_created,
            block_last_active_send: stats.block_last_active_send,
            block_last_active_mint: stats.block_last_active_mint,
            qty_valid_txns_since_genesis: stats.qty_valid_txns_since_genesis,
            qty_valid_token_utxos: stats.qty_valid_token_utxos,
            qty_valid_token_addresses: stats.qty_valid_token_addresses,
            qty_token_minted: base_units_to_decimal(stats.qty_token_minted, decimals),
            qty_token_burned: base_units_to_decimal(stats.qty_token_burned, decimals),
            qty_token_circulating_supply: base_units_to_decimal(
                stats.qty_token_circulating_supply,
                decimals,
            ),
            qty_satoshis_locked_up: stats.qty_satoshis_locked_up,
            minting_baton_status: stats.minting_baton_status,
        }
    }

    /// Rebuild domain statistics; malformed quantities fall back to zero and
    /// are corrected by the next statistics pass.
    pub fn to_stats(&self, decimals: u8) -> TokenStats {
        TokenStats {
            block_created: self.block_created,
            block_last_active_send: self.block_last_active_send,
            block_last_active_mint: self.block_last_active_mint,
            qty_valid_txns_since_genesis: self.qty_valid_txns_since_genesis,
            qty_valid_token_utxos: self.qty_valid_token_utxos,
            qty_valid_token_addresses: self.qty_valid_token_addresses,
            qty_token_minted: decimal_to_base_units_wide(&self.qty_token_minted, decimals)
                .unwrap_or(0),
            qty_token_burned: decimal_to_base_units_wide(&self.qty_token_burned, decimals)
                .unwrap_or(0),
            qty_token_circulating_supply: decimal_to_base_units_wide(
                &self.qty_token_circulating_supply,
                decimals,
            )
            .unwrap_or(0),
            qty_satoshis_locked_up: self.qty_satoshis_locked_up,
            minting_baton_status: self.minting_baton_status,
        }
    }
}

/// Persisted token summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDbo {
    pub schema_version: u16,
    pub token_details: SlpTokenDetailsDbo,
    pub token_stats: TokenStatsDbo,
    pub mint_baton_utxo: Option<String>,
    pub last_updated_block: u64,
    pub nft_parent_id: Option<String>,
}

/// Persisted form of one [`GraphTxnOutput`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphTxnOutputDbo {
    pub address: String,
    pub vout: Option<u32>,
    pub satoshis: u64,
    pub token_amount: Decimal,
    pub spend_txid: Option<String>,
    pub status: OutputStatus,
    pub invalid_reason: Option<String>,
}

impl GraphTxnOutputDbo {
    pub fn from_output(output: &GraphTxnOutput, decimals: u8) -> Self {
        Self {
            address: output.address.clone(),
            vout: output.vout,
            satoshis: output.satoshis,
            token_amount: base_units_to_decimal(output.token_amount as u128, decimals),
            spend_txid: output.spend_txid.clone(),
            status: output.status,
            invalid_reason: output.invalid_reason.clone(),
        }
    }

    pub fn to_output(&self, decimals: u8) -> Option<GraphTxnOutput> {
        Some(GraphTxnOutput {
            address: self.address.clone(),
            vout: self.vout,
            satoshis: self.satoshis,
            token_amount: decimal_to_base_units(&self.token_amount, decimals)?,
            spend_txid: self.spend_txid.clone(),
            status: self.status,
            invalid_reason: self.invalid_reason.clone(),
        })
    }
}

/// Persisted form of one [`GraphTxnInput`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphTxnInputDbo {
    pub txid: String,
    pub vout: u32,
    pub address: String,
    pub satoshis: u64,
    pub token_amount: Decimal,
}

impl GraphTxnInputDbo {
    pub fn from_input(input: &GraphTxnInput, decimals: u8) -> Self {
        Self {
            txid: input.txid.clone(),
            vout: input.vout,
            address: input.address.clone(),
            satoshis: input.satoshis,
            token_amount: base_units_to_decimal(input.token_amount as u128, decimals),
        }
    }

    pub fn to_input(&self, decimals: u8) -> Option<GraphTxnInput> {
        Some(GraphTxnInput {
            txid: self.txid.clone(),
            vout: self.vout,
            address: self.address.clone(),
            satoshis: self.satoshis,
            token_amount: decimal_to_base_units(&self.token_amount, decimals)?,
        })
    }
}

/// Persisted graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphTxnDbo {
    pub token_id: String,
    pub txid: String,
    pub details: SlpTokenDetailsDbo,
    pub outputs: Vec<GraphTxnOutputDbo>,
    pub inputs: Vec<GraphTxnInputDbo>,
    pub block_hash: Option<String>,
}

/// Persisted live UTXO entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtxoDbo {
    pub token_id: String,
    pub utxo: String,
    pub txid: String,
    pub vout: u32,
    pub address: String,
    pub satoshis: u64,
    pub token_amount: Decimal,
    pub is_baton: bool,
}

/// Persisted address balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressBalanceDbo {
    pub token_id: String,
    pub address: String,
    pub satoshis_balance: u64,
    pub token_balance: Decimal,
}
