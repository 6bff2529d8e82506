use std::error::Error;
use std::fmt;

/// Represents errors that can occur in node RPC operations
#[derive(Debug)]
pub enum NodeClientError {
    /// Error from the node RPC client
    RpcError(bitcoincore_rpc::Error),
    /// Connection error
    ConnectionError(String),
    /// Malformed txid or hash
    ParseError(String),
    /// The node does not know the requested object
    NotFound(String),
}

impl fmt::Display for NodeClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeClientError::RpcError(e) => write!(f, "Node RPC error: {}", e),
            NodeClientError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            NodeClientError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            NodeClientError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl Error for NodeClientError {}

impl From<bitcoincore_rpc::Error> for NodeClientError {
    fn from(error: bitcoincore_rpc::Error) -> Self {
        NodeClientError::RpcError(error)
    }
}
