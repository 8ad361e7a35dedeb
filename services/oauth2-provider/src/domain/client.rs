//! OAuth2 客户端

use chrono::{DateTime, Utc};
use idp_common::{ClientId, UserId};
use idp_errors::AppError;
use rand::Rng;
use thiserror::Error;

use super::scope::{ScopeVocabulary, Scopes};
use super::secret::{HashedSecret, SecretHasher};

const NAME_MIN_LEN: usize = 3;
const NAME_MAX_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client name must be {NAME_MIN_LEN}-{NAME_MAX_LEN} letters, digits, underscores or spaces")]
    InvalidName,

    #[error("client id mismatch")]
    IdMismatch,

    #[error("client is not confidential")]
    NotConfidential,

    #[error("invalid client secret")]
    InvalidSecret,

    #[error(transparent)]
    Infrastructure(#[from] AppError),
}

/// 客户端认证要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidentialRequirement {
    /// 必须是机密客户端且密钥正确
    RequireConfidential,
    /// 只校验 ID
    NotRequireConfidential,
    /// 机密客户端校验密钥，公开客户端只校验 ID
    DependOnClientConfidential,
}

/// OAuth2 客户端实体
#[derive(Debug, Clone)]
pub struct OAuth2Client {
    pub id: ClientId,
    pub owner_id: UserId,
    pub name: String,
    pub is_confidential: bool,
    /// 公开客户端为空
    pub hashed_secret: HashedSecret,
    /// 该客户端能够请求的全部 scope 的上界
    pub allowed_scope: Scopes,
    pub updated_at: DateTime<Utc>,
}

impl OAuth2Client {
    /// 创建客户端
    ///
    /// 机密客户端生成随机密钥并只保存哈希，明文仅在此处返回一次；
    /// 机密客户端获得完整 scope，公开客户端只获得默认只读 scope。
    pub fn create(
        id: ClientId,
        owner_id: UserId,
        name: &str,
        is_confidential: bool,
        vocabulary: &ScopeVocabulary,
        hasher: &dyn SecretHasher,
    ) -> Result<(Self, Option<String>), ClientError> {
        validate_name(name)?;

        let (hashed_secret, secret, allowed_scope) = if is_confidential {
            let secret = generate_secret();
            (hasher.hash(&secret)?, Some(secret), vocabulary.full_scope())
        } else {
            (HashedSecret::default(), None, vocabulary.default_public_scope())
        };

        let client = Self {
            id,
            owner_id,
            name: name.to_string(),
            is_confidential,
            hashed_secret,
            allowed_scope,
            updated_at: Utc::now(),
        };

        Ok((client, secret))
    }

    /// 校验调用方声称的客户端身份
    pub fn validate(
        &self,
        claimed_id: ClientId,
        claimed_secret: Option<&str>,
        requirement: ConfidentialRequirement,
        hasher: &dyn SecretHasher,
    ) -> Result<(), ClientError> {
        if claimed_id != self.id {
            return Err(ClientError::IdMismatch);
        }

        let check_secret = match requirement {
            ConfidentialRequirement::RequireConfidential => {
                if !self.is_confidential {
                    return Err(ClientError::NotConfidential);
                }
                true
            }
            ConfidentialRequirement::NotRequireConfidential => false,
            ConfidentialRequirement::DependOnClientConfidential => self.is_confidential,
        };

        if check_secret {
            let secret = claimed_secret.ok_or(ClientError::InvalidSecret)?;
            if !hasher.verify(secret, &self.hashed_secret)? {
                return Err(ClientError::InvalidSecret);
            }
        }

        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), ClientError> {
    let len = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(ClientError::InvalidName);
    }

    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ' ') {
        return Err(ClientError::InvalidName);
    }

    Ok(())
}

fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}
