//! Snowflake 风格的 64 位时间有序 ID
//!
//! 布局（高位到低位）：1 位符号 | 41 位毫秒时间戳 | 10 位节点 | 12 位序列号

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 自定义纪元：2020-01-01T00:00:00Z
pub const SNOWFLAKE_EPOCH_MILLIS: i64 = 1_577_836_800_000;

const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const TIMESTAMP_SHIFT: u32 = NODE_BITS + SEQUENCE_BITS;

/// 最大节点 ID
pub const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;
const MAX_SEQUENCE: i64 = (1 << SEQUENCE_BITS) - 1;

/// Snowflake ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snowflake(pub i64);

impl Snowflake {
    /// 零值，用于没有主体的令牌
    pub const ZERO: Snowflake = Snowflake(0);

    pub fn as_i64(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// 嵌入的创建时间（毫秒）
    pub fn timestamp_millis(self) -> i64 {
        (self.0 >> TIMESTAMP_SHIFT) + SNOWFLAKE_EPOCH_MILLIS
    }

    /// 嵌入的创建时间（秒）
    pub fn timestamp(self) -> i64 {
        self.timestamp_millis().div_euclid(1000)
    }

    pub fn created_at(self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_millis()).unwrap_or_default()
    }

    pub fn node_id(self) -> u16 {
        ((self.0 >> SEQUENCE_BITS) & i64::from(MAX_NODE_ID)) as u16
    }

    pub fn sequence(self) -> i64 {
        self.0 & MAX_SEQUENCE
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Snowflake)
    }
}

#[derive(Debug, Error)]
pub enum SnowflakeError {
    #[error("Node id {0} exceeds maximum {MAX_NODE_ID}")]
    InvalidNodeId(u16),
}

#[derive(Debug)]
struct GeneratorState {
    last_millis: i64,
    sequence: i64,
}

/// Snowflake 生成器（同一生成器内严格递增）
#[derive(Debug)]
pub struct SnowflakeGenerator {
    node_id: i64,
    state: Mutex<GeneratorState>,
}

impl SnowflakeGenerator {
    pub fn new(node_id: u16) -> Result<Self, SnowflakeError> {
        if node_id > MAX_NODE_ID {
            return Err(SnowflakeError::InvalidNodeId(node_id));
        }

        Ok(Self {
            node_id: i64::from(node_id),
            state: Mutex::new(GeneratorState {
                last_millis: 0,
                sequence: 0,
            }),
        })
    }

    /// 生成下一个 ID
    pub fn generate(&self) -> Snowflake {
        let mut state = self.state.lock();

        // 时钟回拨时沿用上一次的毫秒
        let mut now = current_millis().max(state.last_millis);

        if now == state.last_millis {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                // 本毫秒序列号耗尽，等待下一毫秒
                while now <= state.last_millis {
                    std::hint::spin_loop();
                    now = current_millis();
                }
            }
        } else {
            state.sequence = 0;
        }

        state.last_millis = now;

        Snowflake(
            ((now - SNOWFLAKE_EPOCH_MILLIS) << TIMESTAMP_SHIFT)
                | (self.node_id << SEQUENCE_BITS)
                | state.sequence,
        )
    }
}

fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}
