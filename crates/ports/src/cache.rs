//! Cache trait 定义

use async_trait::async_trait;
use idp_errors::AppResult;
use std::time::Duration;

/// 缓存 trait
///
/// 过期由存储端负责：写入时给定 TTL，过期后 `get` 返回 `None`。
#[async_trait]
pub trait CachePort: Send + Sync {
    /// 获取缓存值
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 设置缓存值
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()>;

    /// 删除缓存
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// 检查是否存在
    async fn exists(&self, key: &str) -> AppResult<bool>;
}
