//! 服务自注册生命周期
//!
//! 启动时注册当前进程，关闭时注销。两处的失败都只记录日志，
//! 注册中心不可用不能阻止进程启动，也不能阻止进程退出。

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::discovery::{RegistrationOptions, ServiceDiscovery, ServiceInstance};
use crate::utils::{app_environment, cancellable, host_identifier, process_identifier};

/// 生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// 尚未注册（未启动，或启动时注册失败）
    NotStarted,
    /// 自动注册已关闭，启动时跳过
    Skipped,
    /// 已注册
    Registered,
    /// 已停止
    Stopped,
}

/// 服务自注册生命周期管理器
///
/// 唯一的可变状态是自身注册的实例；`start`/`stop` 通过 `&mut self`
/// 驱动，宿主运行时保证二者不会并发调用。
pub struct RegistrationLifecycle {
    discovery: Arc<ServiceDiscovery>,
    options: RegistrationOptions,
    registered: Option<ServiceInstance>,
    state: RegistrationState,
}

impl RegistrationLifecycle {
    pub fn new(discovery: Arc<ServiceDiscovery>, options: RegistrationOptions) -> Self {
        Self {
            discovery,
            options,
            registered: None,
            state: RegistrationState::NotStarted,
        }
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// 已注册的自身实例
    pub fn registered_instance(&self) -> Option<&ServiceInstance> {
        self.registered.as_ref()
    }

    /// 自身实例 ID：配置值，或 `{service_name}-{host}-{pid}`
    pub fn self_service_id(&self) -> String {
        if self.options.service_id.trim().is_empty() {
            format!(
                "{}-{}-{}",
                self.options.service_name,
                host_identifier(),
                process_identifier()
            )
        } else {
            self.options.service_id.clone()
        }
    }

    /// 构建自身实例描述
    pub fn build_self_instance(&self) -> ServiceInstance {
        ServiceInstance::new(
            self.options.service_name.as_str(),
            self.self_service_id(),
            self.options.address.as_str(),
            self.options.port,
        )
        .with_tags(self.options.tags.iter().cloned())
        .with_metadata("version", env!("CARGO_PKG_VERSION"))
        .with_metadata("environment", app_environment())
        .with_metadata("host", host_identifier())
        .with_metadata("process_id", process_identifier().to_string())
        .with_metadata("start_time", chrono::Utc::now().to_rfc3339())
    }

    /// 启动钩子
    pub async fn start(&mut self, cancel: &CancellationToken) {
        if !self.options.auto_register {
            info!("Auto-registration is disabled, skipping service registration");
            self.state = RegistrationState::Skipped;
            return;
        }

        let instance = self.build_self_instance();
        match cancellable(cancel, self.discovery.register_service(&instance)).await {
            Ok(()) => {
                info!(
                    service_name = %instance.service_name(),
                    service_id = %instance.service_id(),
                    "Service registration completed successfully"
                );
                self.registered = Some(instance);
                self.state = RegistrationState::Registered;
            }
            Err(e) => {
                // 不抛出：注册中心故障时进程照常启动
                error!(
                    service_name = %instance.service_name(),
                    service_id = %instance.service_id(),
                    code = %e.code(),
                    error = %e,
                    "Failed to register service during startup"
                );
            }
        }
    }

    /// 关闭钩子
    pub async fn stop(&mut self, cancel: &CancellationToken) {
        let registered = self.registered.take();
        self.state = RegistrationState::Stopped;

        let Some(instance) = registered else {
            return;
        };
        if !self.options.deregister_on_shutdown {
            info!(
                service_id = %instance.service_id(),
                "Deregister on shutdown is disabled, leaving registration in place"
            );
            return;
        }

        match cancellable(cancel, self.discovery.deregister_service(instance.service_id())).await {
            Ok(()) => {
                info!(service_id = %instance.service_id(), "Service deregistration completed successfully");
            }
            Err(e) => {
                error!(
                    service_id = %instance.service_id(),
                    code = %e.code(),
                    error = %e,
                    "Failed to deregister service during shutdown"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{DiscoveryBackend, DiscoveryProvider};
    use crate::error::{DiscoveryError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 记录调用的后端，可模拟注册中心故障
    #[derive(Default)]
    struct RecordingBackend {
        registry_down: bool,
        hang: bool,
        registered: Mutex<Vec<ServiceInstance>>,
        deregistered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DiscoveryBackend for RecordingBackend {
        fn provider(&self) -> DiscoveryProvider {
            DiscoveryProvider::Consul
        }

        async fn fetch_instances(&self, _service_name: &str) -> Result<Vec<ServiceInstance>> {
            Ok(self.registered.lock().unwrap().clone())
        }

        async fn register(&self, instance: &ServiceInstance) -> Result<()> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.registry_down {
                return Err(DiscoveryError::registry(503, "registry unavailable"));
            }
            self.registered.lock().unwrap().push(instance.clone());
            Ok(())
        }

        async fn deregister(&self, service_id: &str) -> Result<()> {
            if self.registry_down {
                return Err(DiscoveryError::registry(503, "registry unavailable"));
            }
            self.deregistered.lock().unwrap().push(service_id.to_string());
            Ok(())
        }

        async fn check_health(&self, _service_id: &str) -> Result<bool> {
            Ok(true)
        }
    }

    fn registration() -> RegistrationOptions {
        RegistrationOptions {
            service_name: "order-api".to_string(),
            address: "10.0.0.7".to_string(),
            port: 5000,
            tags: vec!["api".to_string()],
            ..Default::default()
        }
    }

    fn lifecycle(backend: Arc<RecordingBackend>, options: RegistrationOptions) -> RegistrationLifecycle {
        RegistrationLifecycle::new(Arc::new(ServiceDiscovery::new(backend)), options)
    }

    #[tokio::test]
    async fn registers_on_start_and_deregisters_on_stop() {
        let backend = Arc::new(RecordingBackend::default());
        let mut lifecycle = lifecycle(backend.clone(), registration());
        let token = CancellationToken::new();

        lifecycle.start(&token).await;
        assert_eq!(lifecycle.state(), RegistrationState::Registered);

        let instance = lifecycle.registered_instance().unwrap().clone();
        assert_eq!(instance.service_name(), "order-api");
        assert_eq!(instance.authority(), "10.0.0.7:5000");
        assert!(instance.has_tag("api"));
        assert!(instance.service_id().starts_with("order-api-"));
        assert!(instance.service_id().ends_with(&format!("-{}", std::process::id())));
        assert_eq!(instance.metadata_value("version"), Some(env!("CARGO_PKG_VERSION")));
        assert!(instance.metadata_value("start_time").is_some());
        assert_eq!(backend.registered.lock().unwrap().len(), 1);

        lifecycle.stop(&token).await;
        assert_eq!(lifecycle.state(), RegistrationState::Stopped);
        assert!(lifecycle.registered_instance().is_none());
        assert_eq!(*backend.deregistered.lock().unwrap(), vec![instance.service_id().to_string()]);
    }

    #[tokio::test]
    async fn configured_service_id_is_used_verbatim() {
        let backend = Arc::new(RecordingBackend::default());
        let mut options = registration();
        options.service_id = "order-api-blue".to_string();
        let mut lifecycle = lifecycle(backend, options);

        lifecycle.start(&CancellationToken::new()).await;
        assert_eq!(lifecycle.registered_instance().unwrap().service_id(), "order-api-blue");
    }

    #[tokio::test]
    async fn disabled_auto_register_skips_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let mut options = registration();
        options.auto_register = false;
        let mut lifecycle = lifecycle(backend.clone(), options);
        let token = CancellationToken::new();

        lifecycle.start(&token).await;
        assert_eq!(lifecycle.state(), RegistrationState::Skipped);

        lifecycle.stop(&token).await;
        assert!(backend.registered.lock().unwrap().is_empty());
        assert!(backend.deregistered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn registry_outage_does_not_block_start_or_stop() {
        let backend = Arc::new(RecordingBackend {
            registry_down: true,
            ..Default::default()
        });
        let mut lifecycle = lifecycle(backend.clone(), registration());
        let token = CancellationToken::new();

        lifecycle.start(&token).await;
        assert_eq!(lifecycle.state(), RegistrationState::NotStarted);
        assert!(lifecycle.registered_instance().is_none());

        lifecycle.stop(&token).await;
        assert_eq!(lifecycle.state(), RegistrationState::Stopped);
        assert!(backend.deregistered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn deregistration_failure_still_completes_shutdown() {
        let backend = Arc::new(RecordingBackend::default());
        let mut lifecycle = lifecycle(backend, registration());
        let token = CancellationToken::new();
        lifecycle.start(&token).await;
        assert_eq!(lifecycle.state(), RegistrationState::Registered);

        // 注销时注册中心已不可用
        lifecycle.discovery = Arc::new(ServiceDiscovery::new(Arc::new(RecordingBackend {
            registry_down: true,
            ..Default::default()
        })));
        lifecycle.stop(&token).await;
        assert_eq!(lifecycle.state(), RegistrationState::Stopped);
    }

    #[tokio::test]
    async fn keeps_registration_when_deregister_on_shutdown_disabled() {
        let backend = Arc::new(RecordingBackend::default());
        let mut options = registration();
        options.deregister_on_shutdown = false;
        let mut lifecycle = lifecycle(backend.clone(), options);
        let token = CancellationToken::new();

        lifecycle.start(&token).await;
        lifecycle.stop(&token).await;

        assert_eq!(lifecycle.state(), RegistrationState::Stopped);
        assert!(backend.deregistered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_aborts_hanging_registration() {
        let backend = Arc::new(RecordingBackend {
            hang: true,
            ..Default::default()
        });
        let mut lifecycle = lifecycle(backend, registration());
        let token = CancellationToken::new();
        token.cancel();

        lifecycle.start(&token).await;
        assert_eq!(lifecycle.state(), RegistrationState::NotStarted);
    }
}
