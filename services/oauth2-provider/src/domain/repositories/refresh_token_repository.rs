//! 刷新令牌谱系仓储接口
//!
//! 一条刷新令牌谱系只有一行：(刷新令牌 ID, 最近一次签发的访问令牌 ID, 序列号)。

use async_trait::async_trait;
use idp_common::Snowflake;
use idp_errors::AppResult;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// 创建谱系，序列号为 0
    async fn create(&self, refresh_id: Snowflake, access_id: Snowflake) -> AppResult<()>;

    /// 原子比较并交换：仅当当前序列号等于 `expected_seq` 时
    /// 写入新的访问令牌 ID 并将序列号加一；未命中返回 `NotFound`
    async fn rotate(&self, refresh_id: Snowflake, expected_seq: u64, access_id: Snowflake) -> AppResult<()>;

    /// 删除整条谱系
    async fn delete(&self, refresh_id: Snowflake) -> AppResult<()>;
}
