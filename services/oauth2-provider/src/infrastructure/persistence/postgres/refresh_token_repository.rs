use async_trait::async_trait;
use idp_common::Snowflake;
use idp_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::debug;

use super::map_write_error;
use crate::domain::repositories::RefreshTokenRepository;

pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    async fn create(&self, refresh_id: Snowflake, access_id: Snowflake) -> AppResult<()> {
        debug!(%refresh_id, "Creating refresh token lineage");

        sqlx::query(
            r#"
            INSERT INTO oauth2_refresh_tokens (id, access_token_id, sequence)
            VALUES ($1, $2, 0)
            "#,
        )
        .bind(refresh_id.as_i64())
        .bind(access_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to create refresh token", e))?;

        Ok(())
    }

    async fn rotate(&self, refresh_id: Snowflake, expected_seq: u64, access_id: Snowflake) -> AppResult<()> {
        let expected = i64::try_from(expected_seq)
            .map_err(|_| AppError::not_found("Refresh token not found"))?;

        // 单条条件更新，两个并发轮换只有一个能匹配到 sequence
        let result = sqlx::query(
            r#"
            UPDATE oauth2_refresh_tokens
            SET access_token_id = $3, sequence = sequence + 1, updated_at = NOW()
            WHERE id = $1 AND sequence = $2
            "#,
        )
        .bind(refresh_id.as_i64())
        .bind(expected)
        .bind(access_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to rotate refresh token: {}", e)))?;

        if result.rows_affected() == 0 {
            debug!(%refresh_id, expected_seq, "Refresh token rotation matched no row");
            return Err(AppError::not_found("Refresh token not found"));
        }

        Ok(())
    }

    async fn delete(&self, refresh_id: Snowflake) -> AppResult<()> {
        sqlx::query("DELETE FROM oauth2_refresh_tokens WHERE id = $1")
            .bind(refresh_id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete refresh token: {}", e)))?;

        Ok(())
    }
}
