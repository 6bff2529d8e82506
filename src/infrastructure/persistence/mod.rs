//! Persistence boundary: DTO shapes, the [`GraphPersistence`] seam and its
//! SeaORM-backed repository implementation.

pub mod connection;
pub mod dto;
pub mod entities;
pub mod error;
pub mod repositories;
pub mod store;

pub use connection::DbPool;
pub use repositories::GraphRepository;
pub use store::GraphPersistence;
