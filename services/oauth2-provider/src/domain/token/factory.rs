//! 令牌工厂

use std::sync::Arc;

use chrono::Utc;
use idp_common::{ClientId, SnowflakeGenerator, UserId};
use idp_config::TokenConfig;

use super::{OAuth2AccessToken, OAuth2IdToken, OAuth2RefreshToken, TokenMetadata};
use crate::domain::scope::Scopes;
use crate::domain::user::User;

/// 各类令牌的有效期（秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: i64,
    pub refresh: i64,
    pub id: i64,
}

impl From<&TokenConfig> for TokenLifetimes {
    fn from(config: &TokenConfig) -> Self {
        Self {
            access: saturating_secs(config.access_expires_in),
            refresh: saturating_secs(config.refresh_expires_in),
            id: saturating_secs(config.id_expires_in),
        }
    }
}

fn saturating_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// 构造令牌声明
///
/// 过期时间基于 ID 内嵌的创建时间而不是读取时钟，
/// 因此同一 ID 的元数据是确定的。
#[derive(Debug, Clone)]
pub struct TokenFactory {
    issuer: String,
    lifetimes: TokenLifetimes,
    ids: Arc<SnowflakeGenerator>,
}

impl TokenFactory {
    pub fn new(issuer: impl Into<String>, lifetimes: TokenLifetimes, ids: Arc<SnowflakeGenerator>) -> Self {
        Self {
            issuer: issuer.into(),
            lifetimes,
            ids,
        }
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    pub fn create_metadata(&self, audience: ClientId, subject: UserId, expiration: i64) -> TokenMetadata {
        let id = self.ids.generate();
        let issued_at = id.timestamp();

        TokenMetadata {
            id,
            issuer: self.issuer.clone(),
            audience,
            subject,
            expires_at: issued_at.saturating_add(expiration),
            not_before: issued_at,
        }
    }

    pub fn create_access_token(&self, audience: ClientId, scope: Scopes, user: UserId) -> OAuth2AccessToken {
        OAuth2AccessToken {
            metadata: self.create_metadata(audience, user, self.lifetimes.access),
            scope,
        }
    }

    pub fn create_refresh_token(&self, audience: ClientId, scope: Scopes, user: UserId) -> OAuth2RefreshToken {
        OAuth2RefreshToken {
            metadata: self.create_metadata(audience, user, self.lifetimes.refresh),
            scope,
            sequence: 0,
        }
    }

    pub fn create_id_token(&self, audience: ClientId, user: &User) -> OAuth2IdToken {
        OAuth2IdToken {
            metadata: self.create_metadata(audience, user.id, self.lifetimes.id),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }

    /// 刷新令牌轮换：沿用原 ID，重新计算有效窗口，序列号加一
    pub fn next_refresh_token(&self, current: &OAuth2RefreshToken) -> OAuth2RefreshToken {
        self.next_refresh_token_at(current, Utc::now().timestamp())
    }

    pub fn next_refresh_token_at(&self, current: &OAuth2RefreshToken, now: i64) -> OAuth2RefreshToken {
        let mut metadata = current.metadata.clone();
        metadata.not_before = now;
        metadata.expires_at = now.saturating_add(self.lifetimes.refresh);

        OAuth2RefreshToken {
            metadata,
            scope: current.scope.clone(),
            sequence: current.sequence + 1,
        }
    }
}
