//! 持久化实现

pub mod cache_store;
pub mod memory;
pub mod postgres;

pub use cache_store::CacheStore;
