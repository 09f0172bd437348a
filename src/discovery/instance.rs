//! 服务实例定义

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

/// 服务实例
///
/// 由发现后端在转换注册中心/DNS 记录时构建，构建完成后不再修改；
/// 拓扑变化时整体替换，而不是原地更新。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInstance {
    /// 服务名（如 "orders", "order-api"），同一服务的所有实例共享
    service_name: String,

    /// 实例 ID（同一服务名下唯一）
    service_id: String,

    /// 服务地址（IP 字面量或主机名）
    address: String,

    /// 服务端口
    port: u16,

    /// 标签（保持插入顺序，去重）
    #[serde(default)]
    tags: Vec<String>,

    /// 元数据（仅用于展示，不参与正确性判断）
    #[serde(default)]
    metadata: HashMap<String, String>,

    /// 发现时刻的健康快照，来源缺失时视为健康
    #[serde(default = "default_healthy")]
    is_healthy: bool,
}

fn default_healthy() -> bool {
    true
}

impl ServiceInstance {
    /// 创建新的服务实例
    pub fn new(
        service_name: impl Into<String>,
        service_id: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            service_id: service_id.into(),
            address: address.into(),
            port,
            tags: Vec::new(),
            metadata: HashMap::new(),
            is_healthy: true,
        }
    }

    /// 添加标签（重复标签忽略）
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// 批量添加标签
    pub fn with_tags<I, T>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        tags.into_iter().fold(self, |instance, tag| instance.with_tag(tag))
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 批量添加元数据
    pub fn with_metadata_map(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// 设置健康状态
    pub fn with_health(mut self, healthy: bool) -> Self {
        self.is_healthy = healthy;
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }

    /// 按 key 获取元数据
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// 检查是否带有指定标签（不区分大小写）
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// `host:port` 形式的授权部分，IPv6 地址加方括号
    pub fn authority(&self) -> String {
        match self.address.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, self.port),
            _ => format!("{}:{}", self.address, self.port),
        }
    }

    /// 转换为指定 scheme 的服务 URL
    pub fn service_url(&self, scheme: &str) -> String {
        format!("{}://{}", scheme, self.authority())
    }

    /// 转换为 HTTP URL
    pub fn http_url(&self) -> String {
        self.service_url("http")
    }

    /// 地址为 IP 字面量时返回 SocketAddr
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.address
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, self.port))
    }
}
