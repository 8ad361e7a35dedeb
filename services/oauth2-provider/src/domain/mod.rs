//! 领域层

pub mod client;
pub mod consent;
pub mod flow;
pub mod projection;
pub mod repositories;
pub mod scope;
pub mod secret;
pub mod token;
pub mod user;
