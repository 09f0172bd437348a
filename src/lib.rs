//! Flare Discovery Library
//!
//! Resolves logical service names to healthy endpoints through Consul or Kubernetes DNS,
//! rewrites outbound requests addressed as `service://name/...`, and registers the running
//! process with the registry for the duration of its lifetime.

pub mod config;
pub mod discovery;
pub mod error;
pub mod interceptor;
pub mod registration;
pub mod runtime;
pub mod telemetry;
pub mod utils;

// Re-exports
pub use config::Config;
pub use error::{DiscoveryError, ErrorCategory, ErrorCode, Result};

// 服务发现
pub use discovery::{
    ConsulBackend, ConsulOptions, DiscoveryBackend, DiscoveryFactory, DiscoveryOptions,
    DiscoveryProvider, InterceptorOptions, KubernetesBackend, KubernetesOptions, LoadBalanceStrategy,
    LoadBalancer, RegistrationOptions, ServiceDiscovery, ServiceInstance,
};

// 请求拦截
pub use interceptor::{DiscoveryHttpClient, DiscoveryLayer, DiscoveryService, ServiceUriResolver};

// 生命周期与运行时
pub use registration::{RegistrationLifecycle, RegistrationState};
pub use runtime::{RuntimeConfig, ServiceRuntime};
