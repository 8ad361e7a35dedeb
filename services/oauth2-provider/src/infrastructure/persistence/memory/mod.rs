//! 基于 DashMap 的内存实现

pub mod cache;
pub mod repositories;

pub use cache::MemoryCache;
pub use repositories::{
    MemoryClientRepository, MemoryConsentRepository, MemoryRefreshTokenRepository,
    MemoryUserRepository,
};
