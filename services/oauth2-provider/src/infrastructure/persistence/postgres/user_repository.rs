use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idp_common::UserId;
use idp_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::debug;

use super::map_write_error;
use crate::domain::repositories::UserRepository;
use crate::domain::scope::ScopeVocabulary;
use crate::domain::secret::HashedSecret;
use crate::domain::user::User;

pub struct PostgresUserRepository {
    pool: PgPool,
    vocabulary: Arc<ScopeVocabulary>,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool, vocabulary: Arc<ScopeVocabulary>) -> Self {
        Self { pool, vocabulary }
    }

    fn to_user(&self, row: UserRow) -> User {
        User {
            id: UserId::from_i64(row.id),
            username: row.username,
            display_name: row.display_name,
            password_hash: HashedSecret::from_hash(row.password_hash),
            allowed_scope: self.vocabulary.parse_scopes(&row.allowed_scope),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    display_name: String,
    password_hash: String,
    allowed_scope: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: &User) -> AppResult<()> {
        debug!(user_id = %user.id, "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (id, username, display_name, password_hash, allowed_scope,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_i64())
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(user.password_hash.as_str())
        .bind(user.allowed_scope.to_string())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to create user", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, display_name, password_hash, allowed_scope, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find user: {}", e)))?;

        Ok(row.map(|r| self.to_user(r)))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, display_name, password_hash, allowed_scope, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find user: {}", e)))?;

        Ok(row.map(|r| self.to_user(r)))
    }
}
