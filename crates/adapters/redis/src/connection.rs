//! Redis 连接管理

use idp_errors::{AppError, AppResult};
use redis::Client;
use redis::aio::ConnectionManager;
use tracing::{info, warn};

/// 创建自动重连的连接管理器
pub async fn create_connection_manager(url: &str) -> AppResult<ConnectionManager> {
    let client = Client::open(url)
        .map_err(|e| AppError::validation(format!("Invalid Redis URL: {}", e)))?;

    let manager = ConnectionManager::new(client)
        .await
        .map_err(|e| AppError::external_service(format!("Redis unreachable: {}", e)))?;

    info!("Redis connection manager created");
    Ok(manager)
}

/// 启动时 PING 一次，确认临时实体存储可用
pub async fn check_connection(conn: &mut ConnectionManager) -> AppResult<()> {
    let reply: String = redis::cmd("PING").query_async(conn).await.map_err(|e| {
        warn!(error = %e, "Redis PING failed");
        AppError::external_service(format!("Redis health check failed: {}", e))
    })?;

    if reply != "PONG" {
        return Err(AppError::external_service(format!("Unexpected PING reply: {}", reply)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_connecting() {
        let err = create_connection_manager("not a redis url")
            .await
            .err()
            .expect("invalid URL must be rejected");
        assert!(matches!(err, AppError::Validation(_)));
    }
}
