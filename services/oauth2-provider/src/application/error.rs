//! 面向调用方的 OAuth2 错误词汇

use idp_errors::AppError;
use thiserror::Error;
use tracing::error;

use crate::domain::client::ClientError;

#[derive(Debug, Error)]
pub enum OAuth2Error {
    #[error("unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    #[error("invalid client: {0}")]
    InvalidClient(String),

    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// 不向调用方泄露内部细节
    #[error("server error")]
    ServerError,
}

impl OAuth2Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::InvalidScope(_) => "invalid_scope",
            Self::InvalidRequest(_) => "invalid_request",
            Self::AccessDenied(_) => "access_denied",
            Self::NotFound(_) => "not_found",
            Self::ServerError => "server_error",
        }
    }

    pub fn unsupported_grant_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedGrantType(msg.into())
    }

    pub fn invalid_client(msg: impl Into<String>) -> Self {
        Self::InvalidClient(msg.into())
    }

    pub fn invalid_grant(msg: impl Into<String>) -> Self {
        Self::InvalidGrant(msg.into())
    }

    pub fn invalid_scope(msg: impl Into<String>) -> Self {
        Self::InvalidScope(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ServerError)
    }
}

/// 基础设施错误一律视为服务端故障
impl From<AppError> for OAuth2Error {
    fn from(err: AppError) -> Self {
        error!(error = %err, "OAuth2 request failed with server fault");
        Self::ServerError
    }
}

impl From<ClientError> for OAuth2Error {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidName => Self::invalid_request(err.to_string()),
            ClientError::IdMismatch | ClientError::NotConfidential | ClientError::InvalidSecret => {
                Self::invalid_client(err.to_string())
            }
            ClientError::Infrastructure(e) => e.into(),
        }
    }
}

pub type OAuth2Result<T> = Result<T, OAuth2Error>;
