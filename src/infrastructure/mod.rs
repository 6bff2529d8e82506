pub mod cache;
pub mod decode;
pub mod node;
pub mod persistence;
pub mod query;
pub mod queue;
pub mod sync;
pub mod validation;
