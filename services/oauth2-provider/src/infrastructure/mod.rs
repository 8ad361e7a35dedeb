//! 基础设施层

pub mod hashing;
pub mod persistence;
pub mod signing;
