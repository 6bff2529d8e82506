pub mod update_queue;

pub use update_queue::{QueueError, UpdateQueue};
