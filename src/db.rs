pub mod scheduling_repo;
pub use scheduling_repo::{SchedulingRepository, SchedulingStore};

#[cfg(test)]
pub mod memory_store;
