//! 服务发现入口
//!
//! `ServiceDiscovery` 组合一个后端和一个负载均衡器，对外提供统一的
//! 发现、选择、注册、注销和健康检查接口。

use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::discovery::backend::DiscoveryBackend;
use crate::discovery::config::{DiscoveryProvider, LoadBalanceStrategy};
use crate::discovery::instance::ServiceInstance;
use crate::discovery::load_balancer::LoadBalancer;
use crate::error::Result;

/// 服务发现
///
/// 不持有可变状态，通过 `Arc` 在任意请求路径之间共享。
pub struct ServiceDiscovery {
    backend: Arc<dyn DiscoveryBackend>,
    balancer: LoadBalancer,
}

impl ServiceDiscovery {
    /// 从后端创建服务发现（默认随机负载均衡）
    pub fn new(backend: Arc<dyn DiscoveryBackend>) -> Self {
        Self::with_strategy(backend, LoadBalanceStrategy::default())
    }

    /// 从后端和负载均衡策略创建服务发现
    pub fn with_strategy(backend: Arc<dyn DiscoveryBackend>, strategy: LoadBalanceStrategy) -> Self {
        Self {
            backend,
            balancer: LoadBalancer::new(strategy),
        }
    }

    pub fn provider(&self) -> DiscoveryProvider {
        self.backend.provider()
    }

    pub fn balancer(&self) -> &LoadBalancer {
        &self.balancer
    }

    /// 发现服务的所有健康实例
    ///
    /// 后端失败时记录日志并返回空列表：服务暂时不可发现是常态，不是崩溃。
    pub async fn discover_services(&self, service_name: &str) -> Vec<ServiceInstance> {
        debug!(service_name = %service_name, "Discovering services");

        match self.backend.fetch_instances(service_name).await {
            Ok(instances) => {
                let healthy: Vec<ServiceInstance> =
                    instances.into_iter().filter(ServiceInstance::is_healthy).collect();
                debug!(
                    service_name = %service_name,
                    count = healthy.len(),
                    "Discovered healthy instances"
                );
                healthy
            }
            Err(e) => {
                error!(
                    service_name = %service_name,
                    provider = %self.backend.provider(),
                    code = %e.code(),
                    error = %e,
                    "Failed to discover services"
                );
                Vec::new()
            }
        }
    }

    /// 发现单个健康实例（经过负载均衡）
    pub async fn discover_service(&self, service_name: &str) -> Option<ServiceInstance> {
        let instances = self.discover_services(service_name).await;

        if instances.is_empty() {
            warn!(service_name = %service_name, "No healthy instances found for service");
            return None;
        }

        let selected = self.balancer.select(&instances).cloned();
        if let Some(instance) = &selected {
            debug!(
                service_name = %service_name,
                service_id = %instance.service_id(),
                "Selected instance"
            );
        }
        selected
    }

    /// 注册服务实例
    ///
    /// 调用方明确要求注册，因此错误向上传递。
    pub async fn register_service(&self, instance: &ServiceInstance) -> Result<()> {
        self.backend.register(instance).await.map_err(|e| {
            error!(
                service_name = %instance.service_name(),
                service_id = %instance.service_id(),
                error = %e,
                "Failed to register service"
            );
            e
        })
    }

    /// 注销服务实例
    pub async fn deregister_service(&self, service_id: &str) -> Result<()> {
        self.backend.deregister(service_id).await.map_err(|e| {
            error!(service_id = %service_id, error = %e, "Failed to deregister service");
            e
        })
    }

    /// 检查服务实例是否健康，任何失败都视为不健康
    pub async fn is_service_healthy(&self, service_id: &str) -> bool {
        match self.backend.check_health(service_id).await {
            Ok(healthy) => healthy,
            Err(e) => {
                debug!(service_id = %service_id, error = %e, "Health check failed");
                false
            }
        }
    }
}
