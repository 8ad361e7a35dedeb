//! 仓储接口
//!
//! 仓储只负责存取，不判断业务有效性。未找到返回 `Ok(None)`，
//! 条件更新未命中返回 `AppError::NotFound`。

pub mod client_repository;
pub mod consent_repository;
pub mod ephemeral;
pub mod refresh_token_repository;
pub mod user_repository;

pub use client_repository::OAuth2ClientRepository;
pub use consent_repository::ConsentRepository;
pub use ephemeral::{
    AuthenticationResultRepository, AuthorizationCodeRepository, AuthorizationStoreRepository,
    ConsentResultRepository, SessionRepository,
};
pub use refresh_token_repository::RefreshTokenRepository;
pub use user_repository::UserRepository;
