//! Kubernetes DNS 服务发现后端
//!
//! 通过集群 DNS 把 `{service}.{namespace}.svc.{cluster_domain}` 解析成地址列表，
//! 每个地址合成一个实例。注册和注销由 Kubernetes 自己负责，这里只是空操作。

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::discovery::backend::DiscoveryBackend;
use crate::discovery::config::{DiscoveryProvider, KubernetesOptions};
use crate::discovery::instance::ServiceInstance;
use crate::error::{DiscoveryError, Result};

/// 主机名解析器
///
/// 默认实现使用系统解析器，测试时可以替换。
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn lookup(&self, host: &str) -> std::io::Result<Vec<IpAddr>>;
}

/// 基于 `tokio::net::lookup_host` 的系统解析器
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        // lookup_host 需要端口，解析结果里只取 IP
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Kubernetes DNS 后端
pub struct KubernetesBackend {
    resolver: Arc<dyn HostResolver>,
    namespace: String,
    cluster_domain: String,
    port: u16,
    lookup_timeout: Duration,
}

impl KubernetesBackend {
    /// 使用系统解析器创建后端
    pub fn new(options: &KubernetesOptions) -> Self {
        Self::with_resolver(options, Arc::new(SystemResolver))
    }

    /// 使用指定解析器创建后端
    pub fn with_resolver(options: &KubernetesOptions, resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            resolver,
            namespace: options.resolved_namespace(),
            cluster_domain: options.cluster_domain.trim_matches('.').to_string(),
            port: options.port,
            lookup_timeout: options.lookup_timeout(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 服务的集群内完整域名
    pub fn service_host(&self, service_name: &str) -> String {
        format!("{}.{}.svc.{}", service_name, self.namespace, self.cluster_domain)
    }

    /// 实例 ID 格式：`{service_name}-{ip}`
    fn instance_id(service_name: &str, ip: &IpAddr) -> String {
        format!("{}-{}", service_name, ip)
    }

    /// 从实例 ID 还原服务名
    ///
    /// 服务名本身可能带 '-'，因此只在最后一段能解析成 IP 时才剥掉它。
    fn service_name_from_id(service_id: &str) -> &str {
        match service_id.rsplit_once('-') {
            Some((name, suffix)) if !name.is_empty() && suffix.parse::<IpAddr>().is_ok() => name,
            _ => service_id,
        }
    }

    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
        match tokio::time::timeout(self.lookup_timeout, self.resolver.lookup(host)).await {
            Ok(Ok(addrs)) => Ok(addrs),
            Ok(Err(source)) => Err(DiscoveryError::Lookup {
                host: host.to_string(),
                source,
            }),
            Err(_) => Err(DiscoveryError::LookupTimeout {
                host: host.to_string(),
            }),
        }
    }
}

#[async_trait]
impl DiscoveryBackend for KubernetesBackend {
    fn provider(&self) -> DiscoveryProvider {
        DiscoveryProvider::Kubernetes
    }

    async fn fetch_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>> {
        let host = self.service_host(service_name);
        debug!(
            service_name = %service_name,
            namespace = %self.namespace,
            host = %host,
            "Resolving Kubernetes service"
        );

        // 同一地址可能重复返回，去重保证 service_id 唯一
        let addrs: BTreeSet<IpAddr> = self.resolve(&host).await?.into_iter().collect();

        let instances = addrs
            .iter()
            .map(|ip| {
                ServiceInstance::new(
                    service_name,
                    Self::instance_id(service_name, ip),
                    ip.to_string(),
                    self.port,
                )
                .with_tags(["kubernetes", self.namespace.as_str()])
                .with_metadata("namespace", self.namespace.as_str())
                .with_metadata("provider", "kubernetes")
            })
            .collect();

        Ok(instances)
    }

    async fn register(&self, instance: &ServiceInstance) -> Result<()> {
        info!(
            service_name = %instance.service_name(),
            "Service registration is handled by Kubernetes"
        );
        Ok(())
    }

    async fn deregister(&self, service_id: &str) -> Result<()> {
        info!(
            service_id = %service_id,
            "Service deregistration is handled by Kubernetes"
        );
        Ok(())
    }

    async fn check_health(&self, service_id: &str) -> Result<bool> {
        // 没有更细粒度的信号：还能解析到地址就算健康
        let service_name = Self::service_name_from_id(service_id);
        let addrs = self.resolve(&self.service_host(service_name)).await?;
        Ok(!addrs.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 固定表解析器，记录调用次数
    #[derive(Default)]
    struct StaticResolver {
        hosts: HashMap<String, Vec<IpAddr>>,
        calls: AtomicUsize,
    }

    impl StaticResolver {
        fn with(mut self, host: &str, addrs: &[&str]) -> Self {
            self.hosts
                .insert(host.to_string(), addrs.iter().map(|a| a.parse().unwrap()).collect());
            self
        }
    }

    #[async_trait]
    impl HostResolver for StaticResolver {
        async fn lookup(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.hosts
                .get(host)
                .cloned()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no such host"))
        }
    }

    fn options() -> KubernetesOptions {
        KubernetesOptions {
            namespace: Some("shop".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn synthesizes_one_instance_per_address() {
        let resolver = StaticResolver::default().with(
            "orders.shop.svc.cluster.local",
            &["10.1.0.4", "10.1.0.3", "10.1.0.4"],
        );
        let backend = KubernetesBackend::with_resolver(&options(), Arc::new(resolver));

        let instances = backend.fetch_instances("orders").await.unwrap();

        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].service_id(), "orders-10.1.0.3");
        assert_eq!(instances[1].service_id(), "orders-10.1.0.4");
        for instance in &instances {
            assert_eq!(instance.port(), 80);
            assert_eq!(instance.service_name(), "orders");
            assert!(instance.has_tag("kubernetes"));
            assert!(instance.has_tag("shop"));
            assert_eq!(instance.metadata_value("provider"), Some("kubernetes"));
            assert_eq!(instance.metadata_value("namespace"), Some("shop"));
        }
    }

    #[tokio::test]
    async fn lookup_failure_is_reported_to_caller() {
        let backend = KubernetesBackend::with_resolver(&options(), Arc::new(StaticResolver::default()));
        let err = backend.fetch_instances("missing").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Lookup { ref host, .. } if host == "missing.shop.svc.cluster.local"));
    }

    /// 永远不返回的解析器
    struct HangingResolver;

    #[async_trait]
    impl HostResolver for HangingResolver {
        async fn lookup(&self, _host: &str) -> std::io::Result<Vec<IpAddr>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn stalled_lookup_times_out() {
        let options = KubernetesOptions {
            lookup_timeout: 1,
            ..options()
        };
        let backend = KubernetesBackend::with_resolver(&options, Arc::new(HangingResolver));

        let err = backend.fetch_instances("orders").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::LookupTimeout { ref host } if host == "orders.shop.svc.cluster.local"));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn register_and_deregister_never_touch_the_resolver() {
        let resolver = Arc::new(StaticResolver::default());
        let backend = KubernetesBackend::with_resolver(&options(), resolver.clone());
        let instance = ServiceInstance::new("orders", "orders-1", "10.1.0.3", 80);

        backend.register(&instance).await.unwrap();
        backend.deregister("orders-1").await.unwrap();
        backend.deregister("never-registered").await.unwrap();

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn health_follows_resolvability() {
        let resolver = StaticResolver::default().with("order-api.shop.svc.cluster.local", &["10.1.0.9"]);
        let backend = KubernetesBackend::with_resolver(&options(), Arc::new(resolver));

        assert!(backend.check_health("order-api-10.1.0.9").await.unwrap());
        assert!(backend.check_health("order-api").await.unwrap());
        assert!(backend.check_health("payments-10.1.0.2").await.is_err());
    }

    #[test]
    fn service_name_is_recovered_from_generated_ids() {
        assert_eq!(KubernetesBackend::service_name_from_id("order-api-10.0.0.1"), "order-api");
        assert_eq!(KubernetesBackend::service_name_from_id("order-api-fd00::1"), "order-api");
        assert_eq!(KubernetesBackend::service_name_from_id("order-api"), "order-api");
    }

    #[test]
    fn custom_cluster_domain() {
        let backend = KubernetesBackend::new(&KubernetesOptions {
            namespace: Some("shop".to_string()),
            cluster_domain: "corp.internal.".to_string(),
            ..Default::default()
        });
        assert_eq!(backend.service_host("orders"), "orders.shop.svc.corp.internal");
    }
}
