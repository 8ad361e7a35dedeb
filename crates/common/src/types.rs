//! 通用类型定义

use std::str::FromStr;

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::Snowflake;

/// 用户 ID
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, Display, From,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct UserId(pub Snowflake);

impl UserId {
    /// 仅代表客户端自身的令牌使用零主体
    pub const NONE: UserId = UserId(Snowflake::ZERO);

    pub fn from_i64(id: i64) -> Self {
        Self(Snowflake(id))
    }

    pub fn as_i64(&self) -> i64 {
        self.0.as_i64()
    }

    pub fn is_none(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Snowflake>().map(Self)
    }
}

/// OAuth2 Client ID
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct ClientId(pub Snowflake);

impl ClientId {
    pub fn from_i64(id: i64) -> Self {
        Self(Snowflake(id))
    }

    pub fn as_i64(&self) -> i64 {
        self.0.as_i64()
    }
}

impl FromStr for ClientId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Snowflake>().map(Self)
    }
}
