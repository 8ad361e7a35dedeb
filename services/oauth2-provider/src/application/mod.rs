//! 应用层：OAuth2 协议编排

mod authorize;
pub mod context;
pub mod dto;
pub mod error;
mod management;
pub mod metrics;
pub mod service;
mod token;

pub use context::RequestContext;
pub use dto::{
    AuthenticationCallback, AuthorizeResponse, ConsentPrompt, RegisteredClient, TokenRequest, TokenResponse,
};
pub use error::{OAuth2Error, OAuth2Result};
pub use service::{FlowSettings, OAuth2Service, Repositories, ServiceSettings};

#[cfg(test)]
mod tests;
