pub mod graph_txn;
pub mod token_address;
pub mod token_summary;
pub mod token_utxo;
