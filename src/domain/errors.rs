use std::error::Error;
use std::fmt;

use crate::infrastructure::decode::DecodeError;
use crate::infrastructure::node::NodeClientError;
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::query::QueryError;
use crate::infrastructure::queue::QueueError;
use crate::infrastructure::validation::OracleError;

/// Error type for token graph building and maintenance
#[derive(Debug)]
pub enum GraphError {
    NodeClientError(NodeClientError),
    DbError(DbError),
    OracleError(OracleError),
    QueryError(QueryError),
    DecodeError(DecodeError),
    QueueError(QueueError),
    /// A graphed transaction carries a type the engine cannot process
    UnknownTransactionType(String),
    /// A graphed transaction still has no block hash while the indexer is running
    MissingBlockHash(String),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::NodeClientError(e) => write!(f, "Node client error: {}", e),
            GraphError::DbError(e) => write!(f, "Database error: {}", e),
            GraphError::OracleError(e) => write!(f, "Validity oracle error: {}", e),
            GraphError::QueryError(e) => write!(f, "Spend index error: {}", e),
            GraphError::DecodeError(e) => write!(f, "Transaction decode error: {}", e),
            GraphError::QueueError(e) => write!(f, "Queue error: {}", e),
            GraphError::UnknownTransactionType(txid) => {
                write!(f, "Unknown SLP transaction type in {}", txid)
            }
            GraphError::MissingBlockHash(txid) => {
                write!(f, "No block hash for confirmed transaction {}", txid)
            }
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GraphError::NodeClientError(e) => Some(e),
            GraphError::DbError(e) => Some(e),
            GraphError::OracleError(e) => Some(e),
            GraphError::QueryError(e) => Some(e),
            GraphError::DecodeError(e) => Some(e),
            GraphError::QueueError(e) => Some(e),
            GraphError::UnknownTransactionType(_) => None,
            GraphError::MissingBlockHash(_) => None,
        }
    }
}

impl From<NodeClientError> for GraphError {
    fn from(error: NodeClientError) -> Self {
        GraphError::NodeClientError(error)
    }
}

impl From<DbError> for GraphError {
    fn from(error: DbError) -> Self {
        GraphError::DbError(error)
    }
}

impl From<OracleError> for GraphError {
    fn from(error: OracleError) -> Self {
        GraphError::OracleError(error)
    }
}

impl From<QueryError> for GraphError {
    fn from(error: QueryError) -> Self {
        GraphError::QueryError(error)
    }
}

impl From<DecodeError> for GraphError {
    fn from(error: DecodeError) -> Self {
        GraphError::DecodeError(error)
    }
}

impl From<QueueError> for GraphError {
    fn from(error: QueueError) -> Self {
        GraphError::QueueError(error)
    }
}
