//! 资源所有者

use chrono::{DateTime, Utc};
use idp_common::UserId;

use super::scope::Scopes;
use super::secret::HashedSecret;

/// 用户实体
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub password_hash: HashedSecret,
    /// 该用户可以授予任何客户端的最大 scope
    pub allowed_scope: Scopes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        display_name: impl Into<String>,
        password_hash: HashedSecret,
        allowed_scope: Scopes,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            username: username.into(),
            display_name: display_name.into(),
            password_hash,
            allowed_scope,
            created_at: now,
            updated_at: now,
        }
    }
}
