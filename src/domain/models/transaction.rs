/// One input of a structure-decoded transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTxnInput {
    /// Txid of the output being spent
    pub prev_txid: String,
    /// Output index being spent
    pub prev_vout: u32,
}

/// One output of a structure-decoded transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTxnOutput {
    /// Output value in satoshis
    pub satoshis: u64,
    /// Locking script bytes
    pub script_pubkey: Vec<u8>,
}

/// Structure-decoded transaction, the shape the engine walks when it
/// materializes graph nodes. Token-script contents stay behind the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTransaction {
    pub inputs: Vec<RawTxnInput>,
    pub outputs: Vec<RawTxnOutput>,
}
