//! idp-oauth2 - OAuth2 / OIDC 身份提供方协议核心
//!
//! - `domain`: scope 引擎、令牌 / 客户端 / 同意领域、仓储接口
//! - `application`: 授权与令牌状态机
//! - `infrastructure`: 签名、哈希、持久化实现

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;

pub use application::{OAuth2Error, OAuth2Service, RequestContext};
