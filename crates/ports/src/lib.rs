//! idp-ports - 端口定义（六边形架构）

pub mod cache;

pub use cache::*;
