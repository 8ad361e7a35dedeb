//! 签名 / 校验协作者

use idp_errors::AppResult;

use super::claims::TokenClaims;

#[cfg_attr(test, mockall::automock)]
pub trait TokenSigner: Send + Sync {
    /// 令牌方案名，如 `Bearer`
    fn token_type(&self) -> &'static str;

    fn generate(&self, claims: &TokenClaims) -> AppResult<String>;

    /// 签名有效但声明已失效时返回 `Ok(None)`；格式错误或签名无法验证时返回错误
    fn validate(&self, token: &str) -> AppResult<Option<TokenClaims>>;
}
