//! 基于 jsonwebtoken 的签名器（HS256 / RS256）

use std::collections::HashSet;

use chrono::Utc;
use idp_errors::{AppError, AppResult};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::domain::token::{ClaimSet, TokenClaims, TokenSigner};

/// JWT 签名器
///
/// 时间窗口不交给 jsonwebtoken 校验，统一由令牌领域的有效性判断处理。
#[derive(Clone)]
pub struct JwtSigner {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSigner {
    /// HMAC-SHA256 共享密钥
    pub fn hmac(secret: &[u8]) -> Self {
        Self::new(
            Algorithm::HS256,
            EncodingKey::from_secret(secret),
            DecodingKey::from_secret(secret),
        )
    }

    /// RSA-SHA256，PEM 格式密钥对
    pub fn rsa(private_pem: &[u8], public_pem: &[u8]) -> AppResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| AppError::internal(format!("Invalid RSA private key: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| AppError::internal(format!("Invalid RSA public key: {}", e)))?;

        Ok(Self::new(Algorithm::RS256, encoding_key, decoding_key))
    }

    fn new(algorithm: Algorithm, encoding_key: EncodingKey, decoding_key: DecodingKey) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// 只接受指定签发者
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }
}

impl TokenSigner for JwtSigner {
    fn token_type(&self) -> &'static str {
        "Bearer"
    }

    fn generate(&self, claims: &TokenClaims) -> AppResult<String> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign {} token: {}", claims.kind(), e)))
    }

    fn validate(&self, token: &str) -> AppResult<Option<TokenClaims>> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidKeyFormat | ErrorKind::InvalidRsaKey(_) | ErrorKind::Crypto(_) => {
                    AppError::internal(format!("Token verification failed: {}", e))
                }
                _ => AppError::unauthorized(format!("Invalid token: {}", e)),
            }
        })?;

        if data.claims.is_valid_at(Utc::now().timestamp()) {
            Ok(Some(data.claims))
        } else {
            Ok(None)
        }
    }
}
