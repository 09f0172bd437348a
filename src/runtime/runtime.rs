//! 服务运行时实现

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::discovery::{DiscoveryFactory, DiscoveryOptions, ServiceDiscovery};
use crate::interceptor::{DiscoveryHttpClient, DiscoveryLayer, ServiceUriResolver};
use crate::registration::{RegistrationLifecycle, RegistrationState};
use crate::runtime::config::RuntimeConfig;

/// 服务运行时
///
/// 持有共享的 [`ServiceDiscovery`]，对外提供出站请求的改写组件，
/// 并驱动自身注册的启动与关闭钩子。
pub struct ServiceRuntime {
    discovery: Arc<ServiceDiscovery>,
    resolver: Arc<ServiceUriResolver>,
    lifecycle: RegistrationLifecycle,
    config: RuntimeConfig,
    shutdown: CancellationToken,
}

impl ServiceRuntime {
    /// 根据配置创建运行时，不合法的配置直接返回错误
    pub fn new(options: &DiscoveryOptions) -> Result<Self> {
        let discovery = DiscoveryFactory::create(options).context("Failed to configure service discovery")?;
        Ok(Self::with_discovery(discovery, options))
    }

    /// 使用已构建的服务发现创建运行时
    pub fn with_discovery(discovery: Arc<ServiceDiscovery>, options: &DiscoveryOptions) -> Self {
        let resolver = Arc::new(ServiceUriResolver::new(discovery.clone(), &options.interceptor));
        let lifecycle = RegistrationLifecycle::new(discovery.clone(), options.registration.clone());
        Self {
            discovery,
            resolver,
            lifecycle,
            config: RuntimeConfig::default(),
            shutdown: CancellationToken::new(),
        }
    }

    /// 设置运行时配置
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn discovery(&self) -> &Arc<ServiceDiscovery> {
        &self.discovery
    }

    pub fn resolver(&self) -> &Arc<ServiceUriResolver> {
        &self.resolver
    }

    /// 带服务发现的 HTTP 客户端
    pub fn http_client(&self) -> DiscoveryHttpClient {
        DiscoveryHttpClient::new(self.resolver.clone())
    }

    /// tower 服务发现中间件层
    pub fn layer(&self) -> DiscoveryLayer {
        DiscoveryLayer::new(self.resolver.clone())
    }

    /// 关闭令牌，取消后运行时开始优雅停机
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 运行直到收到 Ctrl+C 或关闭令牌被取消
    pub async fn run(self) -> Result<RegistrationState> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C, waiting for shutdown token only");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received (Ctrl+C)");
        })
        .await
    }

    /// 运行直到 `signal` 完成或关闭令牌被取消，返回最终的注册状态
    pub async fn run_until<F>(mut self, signal: F) -> Result<RegistrationState>
    where
        F: Future<Output = ()>,
    {
        info!(provider = %self.discovery.provider(), "Starting service runtime");

        // 启动期间收到关闭信号时放弃注册
        self.lifecycle.start(&self.shutdown).await;
        info!(state = ?self.lifecycle.state(), "Service runtime started");

        tokio::select! {
            _ = signal => {}
            _ = self.shutdown.cancelled() => {
                info!("Shutdown signal received (shutdown token)");
            }
        }
        self.shutdown.cancel();

        let timeout = self.config.shutdown_timeout();
        let stop_token = CancellationToken::new();
        if tokio::time::timeout(timeout, self.lifecycle.stop(&stop_token)).await.is_err() {
            warn!(timeout = ?timeout, "Service deregistration did not finish before shutdown timeout");
        }

        info!("Service runtime stopped");
        Ok(self.lifecycle.state())
    }
}
