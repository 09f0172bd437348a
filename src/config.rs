//! 配置文件
//!
//! ```toml
//! [discovery]
//! provider = "Consul"
//!
//! [discovery.registration]
//! service_name = "order-api"
//!
//! [runtime]
//! shutdown_timeout = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::discovery::{DiscoveryOptions, DiscoveryProvider};
use crate::error::{DiscoveryError, Result};
use crate::runtime::RuntimeConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub discovery: DiscoveryOptions,
    pub runtime: RuntimeConfig,
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DiscoveryError::ConfigFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            unsupported_provider(&content).unwrap_or_else(|| DiscoveryError::ConfigFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        config.discovery.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| {
            unsupported_provider(content).unwrap_or_else(|| DiscoveryError::invalid_config(e.to_string()))
        })?;
        config.discovery.validate()?;
        Ok(config)
    }
}

/// 解析失败时检查 `discovery.provider`，未知的提供者单独报告
fn unsupported_provider(content: &str) -> Option<DiscoveryError> {
    let table: toml::Table = toml::from_str(content).ok()?;
    let provider = table.get("discovery")?.get("provider")?.as_str()?;
    provider.parse::<DiscoveryProvider>().err()
}
