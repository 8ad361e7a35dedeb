//! 令牌声明（JWT 载荷）

use std::fmt::Display;
use std::str::FromStr;

use idp_common::{ClientId, Snowflake, UserId};
use serde::{Deserialize, Serialize};

/// 所有令牌共用的声明信封
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(rename = "jti", with = "string_id")]
    pub id: Snowflake,
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "aud", with = "string_id")]
    pub audience: ClientId,
    /// 仅代表客户端自身的令牌为 0
    #[serde(rename = "sub", with = "string_id")]
    pub subject: UserId,
    /// 过期时间（epoch 秒）
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// 生效时间（epoch 秒）
    #[serde(rename = "nbf")]
    pub not_before: i64,
}

impl TokenMetadata {
    pub fn expires_in(&self) -> i64 {
        self.expires_at - self.not_before
    }

    /// 未过期、已生效，且 ID 内嵌的创建时间不在未来
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at && now >= self.not_before && self.id.timestamp() <= now
    }
}

/// 带公共信封的声明集合
pub trait ClaimSet {
    fn metadata(&self) -> &TokenMetadata;

    fn is_valid_at(&self, now: i64) -> bool {
        self.metadata().is_valid_at(now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    #[serde(flatten)]
    pub metadata: TokenMetadata,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    #[serde(flatten)]
    pub metadata: TokenMetadata,
    pub scope: String,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    #[serde(flatten)]
    pub metadata: TokenMetadata,
    pub username: String,
    pub display_name: String,
}

/// 封闭的声明联合
///
/// 按字段区分：带 `seq` 的是刷新令牌，带 `scope` 的是访问令牌，
/// 带 `username` 的是 ID 令牌。变体顺序即反序列化尝试顺序。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenClaims {
    Refresh(RefreshTokenClaims),
    Access(AccessTokenClaims),
    Id(IdTokenClaims),
}

impl TokenClaims {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Refresh(_) => "refresh",
            Self::Access(_) => "access",
            Self::Id(_) => "id",
        }
    }

    pub fn into_refresh(self) -> Option<RefreshTokenClaims> {
        match self {
            Self::Refresh(claims) => Some(claims),
            _ => None,
        }
    }

    pub fn into_access(self) -> Option<AccessTokenClaims> {
        match self {
            Self::Access(claims) => Some(claims),
            _ => None,
        }
    }
}

impl ClaimSet for AccessTokenClaims {
    fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }
}

impl ClaimSet for RefreshTokenClaims {
    fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }
}

impl ClaimSet for IdTokenClaims {
    fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }
}

impl ClaimSet for TokenClaims {
    fn metadata(&self) -> &TokenMetadata {
        match self {
            Self::Refresh(claims) => &claims.metadata,
            Self::Access(claims) => &claims.metadata,
            Self::Id(claims) => &claims.metadata,
        }
    }
}

impl From<AccessTokenClaims> for TokenClaims {
    fn from(claims: AccessTokenClaims) -> Self {
        Self::Access(claims)
    }
}

impl From<RefreshTokenClaims> for TokenClaims {
    fn from(claims: RefreshTokenClaims) -> Self {
        Self::Refresh(claims)
    }
}

impl From<IdTokenClaims> for TokenClaims {
    fn from(claims: IdTokenClaims) -> Self {
        Self::Id(claims)
    }
}

/// 数值 ID 在 JWT 中以字符串形式出现
mod string_id {
    use super::*;
    use serde::{Deserializer, Serializer, de};

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> TokenMetadata {
        TokenMetadata {
            id: Snowflake(1 << 22),
            issuer: "https://id.example.com".to_string(),
            audience: ClientId::from_i64(42),
            subject: UserId::from_i64(7),
            expires_at: 1_577_836_900,
            not_before: 1_577_836_800,
        }
    }

    #[test]
    fn test_wire_shape() {
        let claims = TokenClaims::from(RefreshTokenClaims {
            metadata: metadata(),
            scope: "read:user".to_string(),
            seq: 3,
        });
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            value,
            json!({
                "jti": "4194304",
                "iss": "https://id.example.com",
                "aud": "42",
                "sub": "7",
                "exp": 1_577_836_900,
                "nbf": 1_577_836_800,
                "scope": "read:user",
                "seq": 3,
            })
        );
    }

    #[test]
    fn test_untagged_dispatch() {
        let access = serde_json::to_string(&TokenClaims::from(AccessTokenClaims {
            metadata: metadata(),
            scope: "*:".to_string(),
        }))
        .unwrap();
        let id = serde_json::to_string(&TokenClaims::from(IdTokenClaims {
            metadata: metadata(),
            username: "alice".to_string(),
            display_name: "Alice".to_string(),
        }))
        .unwrap();

        assert_eq!(serde_json::from_str::<TokenClaims>(&access).unwrap().kind(), "access");
        assert_eq!(serde_json::from_str::<TokenClaims>(&id).unwrap().kind(), "id");
    }

    #[test]
    fn test_validity_window() {
        let meta = metadata();
        assert_eq!(meta.expires_in(), 100);
        assert!(meta.is_valid_at(1_577_836_800));
        assert!(meta.is_valid_at(1_577_836_899));
        assert!(!meta.is_valid_at(1_577_836_900));
        assert!(!meta.is_valid_at(1_577_836_799));
    }

    #[test]
    fn test_identifier_from_the_future_is_invalid() {
        let mut meta = metadata();
        // ID 内嵌时间比 nbf 晚一天
        meta.id = Snowflake((86_400_000_i64 + 1_000) << 22);
        meta.expires_at = meta.id.timestamp() + 10_000;
        assert!(!meta.is_valid_at(meta.not_before + 1));
    }
}
