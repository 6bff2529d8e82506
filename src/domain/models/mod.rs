pub mod details;
pub mod graph;
pub mod stats;
pub mod status;
pub mod transaction;

pub use details::{SlpTokenDetails, SlpTransactionType, SlpVersionType};
pub use graph::{outpoint_key, split_outpoint, GraphTxn, GraphTxnInput, GraphTxnOutput};
pub use stats::{AddressBalance, TokenStats};
pub use status::{BatonUtxoStatus, OutputStatus, TokenBatonStatus, TokenUtxoStatus};
pub use transaction::{RawTransaction, RawTxnInput, RawTxnOutput};
