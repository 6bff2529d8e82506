pub mod spend_resolver;
pub mod utxo_ledger;

pub use spend_resolver::{BatonSpendDetails, SpendResolver, TokenSpendDetails};
pub use utxo_ledger::UtxoLedger;
