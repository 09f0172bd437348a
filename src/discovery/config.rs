//! 服务发现配置

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DiscoveryError, Result};

/// Kubernetes 命名空间环境变量
pub const KUBERNETES_NAMESPACE_ENV: &str = "KUBERNETES_NAMESPACE";

/// 未设置命名空间时使用的默认值
pub const DEFAULT_KUBERNETES_NAMESPACE: &str = "default";

/// 服务发现配置
///
/// 进程启动时加载一次，之后只读。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
    /// 提供方：Consul, Kubernetes
    pub provider: DiscoveryProvider,

    /// 负载均衡策略
    pub load_balance: LoadBalanceStrategy,

    /// Consul 配置
    pub consul: ConsulOptions,

    /// Kubernetes DNS 配置
    pub kubernetes: KubernetesOptions,

    /// 自身注册配置
    pub registration: RegistrationOptions,

    /// 请求拦截配置
    pub interceptor: InterceptorOptions,
}

impl DiscoveryOptions {
    /// 以编程方式覆盖注册配置
    pub fn configure_registration(mut self, configure: impl FnOnce(&mut RegistrationOptions)) -> Self {
        configure(&mut self.registration);
        self
    }

    /// 校验配置，启动前快速失败
    pub fn validate(&self) -> Result<()> {
        let registration = &self.registration;
        if registration.auto_register && registration.service_name.trim().is_empty() {
            return Err(DiscoveryError::invalid_config(
                "registration.service_name is required when auto_register is enabled",
            ));
        }
        if registration.port == 0 {
            return Err(DiscoveryError::invalid_config("registration.port must be non-zero"));
        }
        if !registration.health_check_endpoint.starts_with('/') {
            return Err(DiscoveryError::invalid_config(format!(
                "registration.health_check_endpoint must start with '/': {}",
                registration.health_check_endpoint
            )));
        }
        if registration.health_check_interval == 0 {
            return Err(DiscoveryError::invalid_config("registration.health_check_interval must be non-zero"));
        }
        if registration.health_check_timeout == 0 {
            return Err(DiscoveryError::invalid_config("registration.health_check_timeout must be non-zero"));
        }
        match self.provider {
            DiscoveryProvider::Consul => {
                if self.consul.address.trim().is_empty() {
                    return Err(DiscoveryError::invalid_config("consul.address must not be empty"));
                }
                if self.consul.timeout == 0 {
                    return Err(DiscoveryError::invalid_config("consul.timeout must be non-zero"));
                }
            }
            DiscoveryProvider::Kubernetes => {
                if self.kubernetes.port == 0 {
                    return Err(DiscoveryError::invalid_config("kubernetes.port must be non-zero"));
                }
                if self.kubernetes.lookup_timeout == 0 {
                    return Err(DiscoveryError::invalid_config("kubernetes.lookup_timeout must be non-zero"));
                }
            }
        }
        Ok(())
    }
}

/// 服务发现提供方
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum DiscoveryProvider {
    /// Consul 注册中心
    #[default]
    Consul,
    /// Kubernetes 集群 DNS
    Kubernetes,
}

impl DiscoveryProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryProvider::Consul => "Consul",
            DiscoveryProvider::Kubernetes => "Kubernetes",
        }
    }
}

impl std::fmt::Display for DiscoveryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscoveryProvider {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "consul" => Ok(DiscoveryProvider::Consul),
            "kubernetes" | "k8s" => Ok(DiscoveryProvider::Kubernetes),
            _ => Err(DiscoveryError::UnsupportedProvider(s.to_string())),
        }
    }
}

impl TryFrom<String> for DiscoveryProvider {
    type Error = DiscoveryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DiscoveryProvider> for String {
    fn from(provider: DiscoveryProvider) -> Self {
        provider.as_str().to_string()
    }
}

/// 负载均衡策略
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceStrategy {
    /// 随机（默认）
    #[default]
    Random,
    /// 轮询
    RoundRobin,
}

impl std::str::FromStr for LoadBalanceStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "random" => Ok(LoadBalanceStrategy::Random),
            "round_robin" | "roundrobin" => Ok(LoadBalanceStrategy::RoundRobin),
            _ => Err(format!("Unknown load balance strategy: {}", s)),
        }
    }
}

/// Consul 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsulOptions {
    /// Consul 地址
    pub address: String,

    /// 数据中心
    pub datacenter: Option<String>,

    /// ACL token
    pub token: Option<String>,

    /// 请求超时（秒）
    pub timeout: u64,
}

impl ConsulOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for ConsulOptions {
    fn default() -> Self {
        Self {
            address: "http://localhost:8500".to_string(),
            datacenter: Some("dc1".to_string()),
            token: None,
            timeout: 10,
        }
    }
}

/// Kubernetes DNS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesOptions {
    /// 命名空间，未设置时读取 `KUBERNETES_NAMESPACE`，仍未设置则为 "default"
    pub namespace: Option<String>,

    /// 解析出的实例使用的端口
    pub port: u16,

    /// 集群域名
    pub cluster_domain: String,

    /// DNS 解析超时（秒）
    pub lookup_timeout: u64,
}

impl KubernetesOptions {
    /// 解析最终使用的命名空间
    pub fn resolved_namespace(&self) -> String {
        self.namespace
            .clone()
            .filter(|ns| !ns.trim().is_empty())
            .or_else(|| {
                std::env::var(KUBERNETES_NAMESPACE_ENV)
                    .ok()
                    .filter(|ns| !ns.trim().is_empty())
            })
            .unwrap_or_else(|| DEFAULT_KUBERNETES_NAMESPACE.to_string())
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout)
    }
}

impl Default for KubernetesOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            port: 80,
            cluster_domain: "cluster.local".to_string(),
            lookup_timeout: 5,
        }
    }
}

/// 自身注册配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationOptions {
    /// 注册的服务名
    pub service_name: String,

    /// 实例 ID，为空时自动生成 `{service_name}-{host}-{pid}`
    pub service_id: String,

    /// 对外地址
    pub address: String,

    /// 对外端口
    pub port: u16,

    /// 标签
    pub tags: Vec<String>,

    /// 健康检查路径
    pub health_check_endpoint: String,

    /// 健康检查间隔（秒）
    pub health_check_interval: u64,

    /// 健康检查超时（秒）
    pub health_check_timeout: u64,

    /// 启动时自动注册
    pub auto_register: bool,

    /// 关闭时注销
    pub deregister_on_shutdown: bool,
}

impl RegistrationOptions {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout)
    }
}

impl Default for RegistrationOptions {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            service_id: String::new(),
            address: "localhost".to_string(),
            port: 5000,
            tags: Vec::new(),
            health_check_endpoint: "/health".to_string(),
            health_check_interval: 10,
            health_check_timeout: 3,
            auto_register: true,
            deregister_on_shutdown: true,
        }
    }
}

/// 请求拦截配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptorOptions {
    /// 除 `service://` 外，是否把 `http://` 下不含 '.' 的主机名也视为服务名
    ///
    /// 单标签主机名（如 `http://intranet/`）会被误判为服务名，
    /// 只使用 `service://` 的部署可以关掉它。
    pub bare_host_fallback: bool,
}

impl Default for InterceptorOptions {
    fn default() -> Self {
        Self {
            bare_host_fallback: true,
        }
    }
}
