//! idp-common - 通用类型和工具库

pub mod snowflake;
pub mod types;

pub use snowflake::*;
pub use types::*;
