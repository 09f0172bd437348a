//! 服务发现后端抽象和实现

pub mod consul;
pub mod kubernetes;

use async_trait::async_trait;

use crate::discovery::config::DiscoveryProvider;
use crate::discovery::instance::ServiceInstance;
use crate::error::Result;

pub use consul::ConsulBackend;
pub use kubernetes::{HostResolver, KubernetesBackend, SystemResolver};

/// 服务发现后端 trait
///
/// 后端只负责与注册中心/DNS 交互并如实返回错误；
/// 错误降级（发现失败返回空列表、健康检查失败返回 false）由
/// [`ServiceDiscovery`](crate::discovery::ServiceDiscovery) 统一处理。
///
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// 后端对应的提供方
    fn provider(&self) -> DiscoveryProvider;

    /// 查询服务实例
    ///
    /// # 参数
    /// * `service_name` - 服务名
    ///
    /// # 返回
    /// 后端已知的实例列表（可能包含不健康实例）
    async fn fetch_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>>;

    /// 注册（或更新）服务实例，幂等
    async fn register(&self, instance: &ServiceInstance) -> Result<()>;

    /// 注销服务实例，幂等：注销不存在的实例视为成功
    async fn deregister(&self, service_id: &str) -> Result<()>;

    /// 查询单个实例的健康状态
    async fn check_health(&self, service_id: &str) -> Result<bool>;
}
