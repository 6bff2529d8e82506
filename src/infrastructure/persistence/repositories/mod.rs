pub mod graph_repository;

pub use graph_repository::GraphRepository;
