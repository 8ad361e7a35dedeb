//! idp-config - 配置加载库

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    // 开发环境: 10, 生产环境: 50
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
}

/// 令牌有效期配置（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_access_expires_in")]
    pub access_expires_in: u64,
    #[serde(default = "default_refresh_expires_in")]
    pub refresh_expires_in: u64,
    #[serde(default = "default_id_expires_in")]
    pub id_expires_in: u64,
}

fn default_access_expires_in() -> u64 {
    3600
}

fn default_refresh_expires_in() -> u64 {
    604800
}

fn default_id_expires_in() -> u64 {
    3600
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_expires_in: default_access_expires_in(),
            refresh_expires_in: default_refresh_expires_in(),
            id_expires_in: default_id_expires_in(),
        }
    }
}

/// 签名算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SigningAlgorithm {
    /// HMAC-SHA256 共享密钥
    Hs256,
    /// RSA-SHA256
    Rs256,
}

/// 令牌签名配置
#[derive(Debug, Clone, Deserialize)]
pub struct SigningConfig {
    pub algorithm: SigningAlgorithm,
    /// HS256 共享密钥
    pub secret: Option<Secret<String>>,
    /// RS256 私钥（PEM）路径
    pub private_key_path: Option<String>,
    /// RS256 公钥（PEM）路径
    pub public_key_path: Option<String>,
}

/// 授权流程中各临时实体的 TTL（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct FlowConfig {
    #[serde(default = "default_authorization_code_ttl")]
    pub authorization_code_ttl: u64,
    #[serde(default = "default_authorization_store_ttl")]
    pub authorization_store_ttl: u64,
    #[serde(default = "default_authentication_result_ttl")]
    pub authentication_result_ttl: u64,
    #[serde(default = "default_session_ttl")]
    pub session_ttl: u64,
    #[serde(default = "default_consent_ttl")]
    pub consent_ttl: u64,
    #[serde(default = "default_consent_result_ttl")]
    pub consent_result_ttl: u64,
    #[serde(default = "default_persistence_timeout_ms")]
    pub persistence_timeout_ms: u64,
}

fn default_authorization_code_ttl() -> u64 {
    600
}

fn default_authorization_store_ttl() -> u64 {
    600
}

fn default_authentication_result_ttl() -> u64 {
    60
}

fn default_session_ttl() -> u64 {
    86400
}

fn default_consent_ttl() -> u64 {
    2592000
}

fn default_consent_result_ttl() -> u64 {
    60
}

fn default_persistence_timeout_ms() -> u64 {
    5000
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            authorization_code_ttl: default_authorization_code_ttl(),
            authorization_store_ttl: default_authorization_store_ttl(),
            authentication_result_ttl: default_authentication_result_ttl(),
            session_ttl: default_session_ttl(),
            consent_ttl: default_consent_ttl(),
            consent_result_ttl: default_consent_result_ttl(),
            persistence_timeout_ms: default_persistence_timeout_ms(),
        }
    }
}

impl FlowConfig {
    pub fn persistence_timeout(&self) -> Duration {
        Duration::from_millis(self.persistence_timeout_ms)
    }
}

/// 外部身份前端配置
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityProviderConfig {
    /// 认证回调共享密钥
    pub callback_secret: Secret<String>,
}

/// ID 生成器配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnowflakeConfig {
    #[serde(default)]
    pub node_id: u16,
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    /// 令牌签发者（iss）
    pub issuer: String,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub token: TokenConfig,
    pub signing: SigningConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    pub identity_provider: IdentityProviderConfig,
    #[serde(default)]
    pub snowflake: SnowflakeConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 优先级：`IDP_` 前缀环境变量 > `{APP_ENV}.toml` > `default.toml`，
    /// 嵌套字段用 `__` 分隔，例如 `IDP_TOKEN__ACCESS_EXPIRES_IN`。
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("IDP_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
