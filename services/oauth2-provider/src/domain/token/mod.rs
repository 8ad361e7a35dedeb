//! 令牌领域：声明构造与有效期计算

pub mod claims;
pub mod factory;
pub mod signer;

pub use claims::{
    AccessTokenClaims, ClaimSet, IdTokenClaims, RefreshTokenClaims, TokenClaims, TokenMetadata,
};
pub use factory::{TokenFactory, TokenLifetimes};
pub use signer::TokenSigner;

use super::scope::{ScopeVocabulary, Scopes};

/// 访问令牌
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2AccessToken {
    pub metadata: TokenMetadata,
    pub scope: Scopes,
}

/// 刷新令牌
///
/// 轮换时 `metadata.id` 保持不变，只有 `sequence` 递增。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2RefreshToken {
    pub metadata: TokenMetadata,
    pub scope: Scopes,
    pub sequence: u64,
}

/// ID 令牌
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2IdToken {
    pub metadata: TokenMetadata,
    pub username: String,
    pub display_name: String,
}

impl OAuth2AccessToken {
    pub fn claims(&self) -> TokenClaims {
        TokenClaims::Access(AccessTokenClaims {
            metadata: self.metadata.clone(),
            scope: self.scope.to_string(),
        })
    }

    pub fn from_claims(claims: AccessTokenClaims, vocabulary: &ScopeVocabulary) -> Self {
        Self {
            scope: vocabulary.parse_scopes(&claims.scope),
            metadata: claims.metadata,
        }
    }
}

impl OAuth2RefreshToken {
    pub fn claims(&self) -> TokenClaims {
        TokenClaims::Refresh(RefreshTokenClaims {
            metadata: self.metadata.clone(),
            scope: self.scope.to_string(),
            seq: self.sequence,
        })
    }

    pub fn from_claims(claims: RefreshTokenClaims, vocabulary: &ScopeVocabulary) -> Self {
        Self {
            scope: vocabulary.parse_scopes(&claims.scope),
            sequence: claims.seq,
            metadata: claims.metadata,
        }
    }
}

impl OAuth2IdToken {
    pub fn claims(&self) -> TokenClaims {
        TokenClaims::Id(IdTokenClaims {
            metadata: self.metadata.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        })
    }
}
