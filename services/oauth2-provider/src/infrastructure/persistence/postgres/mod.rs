//! PostgreSQL 持久仓储

mod client_repository;
mod consent_repository;
mod refresh_token_repository;
mod user_repository;

pub use client_repository::PostgresClientRepository;
pub use consent_repository::PostgresConsentRepository;
pub use refresh_token_repository::PostgresRefreshTokenRepository;
pub use user_repository::PostgresUserRepository;

use idp_errors::AppError;

/// 唯一约束冲突映射为 `Conflict`，其余为数据库错误
fn map_write_error(context: &str, e: sqlx::Error) -> AppError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => AppError::conflict(format!("{}: already exists", context)),
        _ => AppError::database(format!("{}: {}", context, e)),
    }
}
