//! 服务发现工厂
//!
//! 在配置加载阶段根据提供方构建后端，不支持或不合法的配置在启动前直接失败。

use std::sync::Arc;
use tracing::info;

use crate::discovery::backend::{ConsulBackend, DiscoveryBackend, KubernetesBackend};
use crate::discovery::config::{DiscoveryOptions, DiscoveryProvider};
use crate::discovery::discover::ServiceDiscovery;
use crate::error::Result;

/// 服务发现工厂
pub struct DiscoveryFactory;

impl DiscoveryFactory {
    /// 从配置创建服务发现后端
    pub fn create_backend(options: &DiscoveryOptions) -> Result<Arc<dyn DiscoveryBackend>> {
        match options.provider {
            DiscoveryProvider::Consul => {
                let backend = ConsulBackend::new(&options.consul, &options.registration)?;
                Ok(Arc::new(backend))
            }
            DiscoveryProvider::Kubernetes => {
                let backend = KubernetesBackend::new(&options.kubernetes);
                Ok(Arc::new(backend))
            }
        }
    }

    /// 从配置创建 ServiceDiscovery
    pub fn create(options: &DiscoveryOptions) -> Result<Arc<ServiceDiscovery>> {
        options.validate()?;
        let backend = Self::create_backend(options)?;

        info!(
            provider = %options.provider,
            load_balance = ?options.load_balance,
            "Service discovery configured"
        );

        Ok(Arc::new(ServiceDiscovery::with_strategy(backend, options.load_balance)))
    }
}
