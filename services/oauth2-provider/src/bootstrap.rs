//! 服务装配：运行时初始化与基础设施连接

use std::sync::Arc;

use idp_adapter_postgres::{PostgresConfig, create_pool};
use idp_adapter_redis::{RedisCache, create_connection_manager};
use idp_common::SnowflakeGenerator;
use idp_config::{AppConfig, SigningAlgorithm, SigningConfig};
use idp_errors::{AppError, AppResult};
use idp_telemetry::{PrometheusHandle, init_metrics, init_tracing, init_tracing_json};
use secrecy::ExposeSecret;
use tracing::info;

use crate::application::{FlowSettings, OAuth2Service, Repositories, ServiceSettings};
use crate::domain::scope::ScopeVocabulary;
use crate::domain::token::{TokenFactory, TokenLifetimes};
use crate::infrastructure::hashing::Argon2Hasher;
use crate::infrastructure::persistence::CacheStore;
use crate::infrastructure::persistence::postgres::{
    PostgresClientRepository, PostgresConsentRepository, PostgresRefreshTokenRepository,
    PostgresUserRepository,
};
use crate::infrastructure::signing::JwtSigner;

/// 初始化 tracing
pub fn init_runtime(config: &AppConfig) {
    if config.is_production() {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_tracing(&config.telemetry.log_level);
    }

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        "Runtime initialized"
    );
}

/// 安装 Prometheus recorder，返回用于渲染指标的句柄
pub fn install_metrics() -> AppResult<PrometheusHandle> {
    init_metrics().map_err(|e| AppError::internal(format!("Failed to install metrics recorder: {}", e)))
}

/// 按配置选择签名算法
pub fn build_signer(config: &SigningConfig, issuer: &str) -> AppResult<JwtSigner> {
    let signer = match config.algorithm {
        SigningAlgorithm::Hs256 => {
            let secret = config
                .secret
                .as_ref()
                .ok_or_else(|| AppError::validation("signing.secret is required for HS256"))?;
            JwtSigner::hmac(secret.expose_secret().as_bytes())
        }
        SigningAlgorithm::Rs256 => {
            let private_pem = read_pem(config.private_key_path.as_deref(), "signing.private_key_path")?;
            let public_pem = read_pem(config.public_key_path.as_deref(), "signing.public_key_path")?;
            JwtSigner::rsa(&private_pem, &public_pem)?
        }
    };

    Ok(signer.with_issuer(issuer))
}

fn read_pem(path: Option<&str>, field: &str) -> AppResult<Vec<u8>> {
    let path = path.ok_or_else(|| AppError::validation(format!("{} is required for RS256", field)))?;
    std::fs::read(path).map_err(|e| AppError::internal(format!("Failed to read {}: {}", path, e)))
}

/// 连接 PostgreSQL / Redis 并装配编排服务
pub async fn connect(config: &AppConfig) -> AppResult<OAuth2Service> {
    let vocabulary = Arc::new(
        ScopeVocabulary::standard()
            .map_err(|e| AppError::internal(format!("Invalid scope vocabulary: {}", e)))?,
    );
    let ids = Arc::new(
        SnowflakeGenerator::new(config.snowflake.node_id)
            .map_err(|e| AppError::validation(e.to_string()))?,
    );
    let signer = build_signer(&config.signing, &config.issuer)?;

    let pg_config = PostgresConfig::new(config.database.url.expose_secret())
        .with_max_connections(config.database.max_connections);
    let pool = create_pool(&pg_config).await?;
    idp_adapter_postgres::check_connection(&pool).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to run migrations: {}", e)))?;

    let mut redis = create_connection_manager(config.redis.url.expose_secret()).await?;
    idp_adapter_redis::check_connection(&mut redis).await?;
    let cache = RedisCache::new(redis).with_prefix(format!("{}:", config.app_name));

    let repos = Repositories::new(
        Arc::new(PostgresUserRepository::new(pool.clone(), vocabulary.clone())),
        Arc::new(PostgresClientRepository::new(pool.clone(), vocabulary.clone())),
        Arc::new(PostgresRefreshTokenRepository::new(pool.clone())),
        Arc::new(PostgresConsentRepository::new(pool, vocabulary.clone())),
        CacheStore::new(Arc::new(cache)),
    );

    let tokens = TokenFactory::new(
        config.issuer.clone(),
        TokenLifetimes::from(&config.token),
        ids.clone(),
    );
    let settings = ServiceSettings::new(
        FlowSettings::from(&config.flow),
        config.identity_provider.callback_secret.expose_secret().clone(),
    );

    info!(issuer = %config.issuer, algorithm = ?config.signing.algorithm, "OAuth2 provider ready");

    Ok(OAuth2Service::new(
        repos,
        vocabulary,
        tokens,
        Arc::new(signer),
        Arc::new(Argon2Hasher::new()),
        ids,
        settings,
    ))
}

#[cfg(test)]
mod tests {
    use secrecy::Secret;

    use super::*;
    use crate::domain::token::TokenSigner;

    #[test]
    fn test_hmac_signer_from_config() {
        let config = SigningConfig {
            algorithm: SigningAlgorithm::Hs256,
            secret: Some(Secret::new("key".to_string())),
            private_key_path: None,
            public_key_path: None,
        };
        let signer = build_signer(&config, "https://id.example.com").unwrap();
        assert_eq!(signer.token_type(), "Bearer");
    }

    #[test]
    fn test_shipped_config_builds_signer() {
        let config = AppConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config")).unwrap();
        assert_eq!(config.signing.algorithm, SigningAlgorithm::Hs256);
        assert!(build_signer(&config.signing, &config.issuer).is_ok());

        let flow = FlowSettings::from(&config.flow);
        assert_eq!(flow.persistence_timeout, std::time::Duration::from_millis(5000));
    }

    #[test]
    fn test_missing_key_material() {
        let hmac = SigningConfig {
            algorithm: SigningAlgorithm::Hs256,
            secret: None,
            private_key_path: None,
            public_key_path: None,
        };
        assert!(build_signer(&hmac, "iss").is_err());

        let rsa = SigningConfig {
            algorithm: SigningAlgorithm::Rs256,
            secret: None,
            private_key_path: Some("/nonexistent/private.pem".to_string()),
            public_key_path: Some("/nonexistent/public.pem".to_string()),
        };
        assert!(build_signer(&rsa, "iss").is_err());
    }
}
