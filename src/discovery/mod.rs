//! 服务发现与负载均衡模块
//!
//! 提供统一的服务发现抽象，支持 Consul 注册中心和 Kubernetes DNS 两种后端。

pub mod backend;
pub mod config;
pub mod discover;
pub mod factory;
pub mod instance;
pub mod load_balancer;

pub use backend::{ConsulBackend, DiscoveryBackend, HostResolver, KubernetesBackend, SystemResolver};
pub use config::{
    ConsulOptions, DiscoveryOptions, DiscoveryProvider, InterceptorOptions, KubernetesOptions,
    LoadBalanceStrategy, RegistrationOptions,
};
pub use discover::ServiceDiscovery;
pub use factory::DiscoveryFactory;
pub use instance::ServiceInstance;
pub use load_balancer::LoadBalancer;
