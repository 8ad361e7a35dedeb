use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idp_common::{ClientId, UserId};
use idp_errors::{AppError, AppResult};
use sqlx::PgPool;

use crate::domain::consent::OAuth2Consent;
use crate::domain::repositories::ConsentRepository;
use crate::domain::scope::ScopeVocabulary;

pub struct PostgresConsentRepository {
    pool: PgPool,
    vocabulary: Arc<ScopeVocabulary>,
}

impl PostgresConsentRepository {
    pub fn new(pool: PgPool, vocabulary: Arc<ScopeVocabulary>) -> Self {
        Self { pool, vocabulary }
    }
}

#[derive(sqlx::FromRow)]
struct ConsentRow {
    user_id: i64,
    client_id: i64,
    scope: String,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[async_trait]
impl ConsentRepository for PostgresConsentRepository {
    async fn upsert(&self, consent: &OAuth2Consent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth2_consents (user_id, client_id, scope, updated_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, client_id)
            DO UPDATE SET scope = EXCLUDED.scope,
                          updated_at = EXCLUDED.updated_at,
                          expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(consent.user_id.as_i64())
        .bind(consent.client_id.as_i64())
        .bind(consent.scope.to_string())
        .bind(consent.updated_at)
        .bind(consent.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert consent: {}", e)))?;

        Ok(())
    }

    async fn find(&self, user_id: UserId, client_id: ClientId) -> AppResult<Option<OAuth2Consent>> {
        let row = sqlx::query_as::<_, ConsentRow>(
            r#"
            SELECT user_id, client_id, scope, updated_at, expires_at
            FROM oauth2_consents
            WHERE user_id = $1 AND client_id = $2
            "#,
        )
        .bind(user_id.as_i64())
        .bind(client_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find consent: {}", e)))?;

        Ok(row.map(|r| OAuth2Consent {
            user_id: UserId::from_i64(r.user_id),
            client_id: ClientId::from_i64(r.client_id),
            scope: self.vocabulary.parse_scopes(&r.scope),
            updated_at: r.updated_at,
            expires_at: r.expires_at,
        }))
    }
}
