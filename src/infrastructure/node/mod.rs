//! Node RPC boundary: the [`NodeSource`] seam and its Bitcoin Core implementation

pub mod client;
pub mod error;
pub mod source;

pub use client::BitcoinCoreNode;
pub use error::NodeClientError;
pub use source::{NodeSource, TxOutInfo};
