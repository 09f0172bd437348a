//! 运行时配置模块

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// 运行时配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// 关闭超时时间（默认 5 秒），超时后放弃注销；配置文件中以秒为单位
    #[serde(serialize_with = "serialize_secs", deserialize_with = "deserialize_secs")]
    pub shutdown_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl RuntimeConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置关闭超时时间
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

// 不足一秒的部分向上取整，写回后再读取不会变短
fn serialize_secs<S>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
    serializer.serialize_u64(secs)
}
