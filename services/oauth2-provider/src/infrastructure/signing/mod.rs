//! 令牌签名实现

mod jwt;

pub use jwt::JwtSigner;
