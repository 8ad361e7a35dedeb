use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idp_common::{ClientId, UserId};
use idp_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::debug;

use super::map_write_error;
use crate::domain::client::OAuth2Client;
use crate::domain::repositories::OAuth2ClientRepository;
use crate::domain::scope::ScopeVocabulary;
use crate::domain::secret::HashedSecret;

pub struct PostgresClientRepository {
    pool: PgPool,
    vocabulary: Arc<ScopeVocabulary>,
}

impl PostgresClientRepository {
    pub fn new(pool: PgPool, vocabulary: Arc<ScopeVocabulary>) -> Self {
        Self { pool, vocabulary }
    }
}

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: i64,
    owner_id: i64,
    name: String,
    is_confidential: bool,
    hashed_secret: String,
    allowed_scope: String,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl OAuth2ClientRepository for PostgresClientRepository {
    async fn create(&self, client: &OAuth2Client) -> AppResult<()> {
        debug!(client_id = %client.id, "Creating OAuth2 client");

        sqlx::query(
            r#"
            INSERT INTO oauth2_clients (id, owner_id, name, is_confidential, hashed_secret,
                                        allowed_scope, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(client.id.as_i64())
        .bind(client.owner_id.as_i64())
        .bind(&client.name)
        .bind(client.is_confidential)
        .bind(client.hashed_secret.as_str())
        .bind(client.allowed_scope.to_string())
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to create OAuth2 client", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: ClientId) -> AppResult<Option<OAuth2Client>> {
        let row = sqlx::query_as::<_, ClientRow>(
            r#"
            SELECT id, owner_id, name, is_confidential, hashed_secret, allowed_scope, updated_at
            FROM oauth2_clients
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find OAuth2 client: {}", e)))?;

        Ok(row.map(|r| OAuth2Client {
            id: ClientId::from_i64(r.id),
            owner_id: UserId::from_i64(r.owner_id),
            name: r.name,
            is_confidential: r.is_confidential,
            hashed_secret: HashedSecret::from_hash(r.hashed_secret),
            allowed_scope: self.vocabulary.parse_scopes(&r.allowed_scope),
            updated_at: r.updated_at,
        }))
    }
}
