//! Transaction structure decoding. Token-script (OP_RETURN) parsing belongs
//! to the validity oracle's decoder; this seam only exposes wire structure.

use std::error::Error;
use std::fmt;

use crate::domain::models::{RawTransaction, RawTxnInput, RawTxnOutput};

/// Represents errors that can occur while decoding a raw transaction
#[derive(Debug)]
pub enum DecodeError {
    /// The raw payload is not valid hex
    InvalidHex(String),
    /// The bytes do not form a consensus-valid transaction
    InvalidStructure(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidHex(msg) => write!(f, "Invalid hex: {}", msg),
            DecodeError::InvalidStructure(msg) => write!(f, "Invalid structure: {}", msg),
        }
    }
}

impl Error for DecodeError {}

/// Structure decoder for raw transactions
pub trait TxnDecoder: Send + Sync {
    /// Decode a raw transaction into inputs/outputs
    fn decode_transaction(&self, raw_hex: &str) -> Result<RawTransaction, DecodeError>;

    /// Address for an output script; `None` makes the engine fall back to
    /// the `scriptPubKey:<hex>` rendering
    fn address_from_script(&self, _script: &[u8]) -> Option<String> {
        None
    }
}

/// [`TxnDecoder`] backed by consensus deserialization
#[derive(Debug, Default)]
pub struct ConsensusDecoder;

impl TxnDecoder for ConsensusDecoder {
    fn decode_transaction(&self, raw_hex: &str) -> Result<RawTransaction, DecodeError> {
        let bytes = hex::decode(raw_hex).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
        let tx: bitcoin::Transaction = bitcoin::consensus::encode::deserialize(&bytes)
            .map_err(|e| DecodeError::InvalidStructure(e.to_string()))?;

        Ok(RawTransaction {
            inputs: tx
                .input
                .iter()
                .map(|i| RawTxnInput {
                    prev_txid: i.previous_output.txid.to_string(),
                    prev_vout: i.previous_output.vout,
                })
                .collect(),
            outputs: tx
                .output
                .iter()
                .map(|o| RawTxnOutput {
                    satoshis: o.value.to_sat(),
                    script_pubkey: o.script_pubkey.as_bytes().to_vec(),
                })
                .collect(),
        })
    }
}
