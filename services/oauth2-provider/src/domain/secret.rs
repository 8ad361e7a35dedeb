//! 单向哈希能力（客户端密钥与用户密码共用）

use idp_errors::AppResult;
use serde::{Deserialize, Serialize};

/// 哈希后的密钥；公开客户端为空串
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedSecret(pub String);

impl HashedSecret {
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 哈希 / 校验
#[cfg_attr(test, mockall::automock)]
pub trait SecretHasher: Send + Sync {
    fn hash(&self, plain: &str) -> AppResult<HashedSecret>;

    /// 明文与哈希不匹配时返回 `Ok(false)`，哈希格式损坏时返回错误
    fn verify(&self, plain: &str, hashed: &HashedSecret) -> AppResult<bool>;
}
