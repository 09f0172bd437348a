//! Consul 服务发现后端

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::discovery::config::{ConsulOptions, DiscoveryProvider, RegistrationOptions};
use crate::discovery::instance::ServiceInstance;
use crate::discovery::backend::DiscoveryBackend;
use crate::error::{DiscoveryError, Result};

/// 实例进入 critical 状态多久后由 Consul 自动注销
pub const DEREGISTER_CRITICAL_AFTER: &str = "1m";

const CONSUL_TOKEN_HEADER: &str = "X-Consul-Token";
const PASSING: &str = "passing";

/// Consul 服务发现后端
pub struct ConsulBackend {
    http_client: HttpClient,
    consul_url: Url,
    datacenter: Option<String>,
    token: Option<String>,
    health_check_endpoint: String,
    health_check_interval: u64,
    health_check_timeout: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    address: &'a str,
    port: u16,
    tags: &'a [String],
    meta: &'a HashMap<String, String>,
    check: ConsulCheck,
}

#[derive(Serialize)]
struct ConsulCheck {
    #[serde(rename = "HTTP")]
    http: String,
    #[serde(rename = "Interval")]
    interval: String,
    #[serde(rename = "Timeout")]
    timeout: String,
    #[serde(rename = "DeregisterCriticalServiceAfter")]
    deregister_critical_service_after: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulServiceEntry {
    #[serde(default)]
    node: Option<ConsulNode>,
    service: ConsulAgentService,
    #[serde(default)]
    checks: Option<Vec<ConsulHealthCheck>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulNode {
    #[serde(default)]
    address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulAgentService {
    #[serde(rename = "ID")]
    id: String,
    service: String,
    #[serde(default)]
    address: String,
    port: u16,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    meta: Option<HashMap<String, String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulHealthCheck {
    status: String,
}

impl ConsulServiceEntry {
    /// 转换为服务实例
    ///
    /// 健康状态取所有检查的合取；没有任何检查的记录视为健康。
    fn into_instance(self) -> ServiceInstance {
        let address = if self.service.address.is_empty() {
            self.node.map(|n| n.address).unwrap_or_default()
        } else {
            self.service.address
        };

        let healthy = self
            .checks
            .map(|checks| checks.iter().all(|c| c.status == PASSING))
            .unwrap_or(true);

        ServiceInstance::new(self.service.service, self.service.id, address, self.service.port)
            .with_tags(self.service.tags.unwrap_or_default())
            .with_metadata_map(self.service.meta.unwrap_or_default())
            .with_health(healthy)
    }
}

impl ConsulBackend {
    /// 创建新的 Consul 后端
    pub fn new(consul: &ConsulOptions, registration: &RegistrationOptions) -> Result<Self> {
        let consul_url = Url::parse(consul.address.trim())
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| DiscoveryError::invalid_config(format!("invalid consul.address: {}", consul.address)))?;
        let http_client = HttpClient::builder()
            .timeout(consul.timeout())
            .build()?;

        Ok(Self {
            http_client,
            consul_url,
            datacenter: consul.datacenter.clone().filter(|dc| !dc.is_empty()),
            token: consul.token.clone().filter(|t| !t.is_empty()),
            health_check_endpoint: registration.health_check_endpoint.clone(),
            health_check_interval: registration.health_check_interval,
            health_check_timeout: registration.health_check_timeout,
        })
    }

    /// 拼接 API 地址，每个片段单独做百分号编码
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.consul_url.clone();
        url.path_segments_mut()
            .map_err(|_| DiscoveryError::InvalidUri(self.consul_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// 附加 ACL token
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(CONSUL_TOKEN_HEADER, token),
            None => request,
        }
    }

    fn health_check_for(&self, instance: &ServiceInstance) -> ConsulCheck {
        ConsulCheck {
            http: format!("{}{}", instance.http_url(), self.health_check_endpoint),
            interval: format!("{}s", self.health_check_interval),
            timeout: format!("{}s", self.health_check_timeout),
            deregister_critical_service_after: DEREGISTER_CRITICAL_AFTER.to_string(),
        }
    }
}

/// 非 2xx 响应转换为注册中心错误
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(DiscoveryError::registry(status.as_u16(), body))
}

#[async_trait]
impl DiscoveryBackend for ConsulBackend {
    fn provider(&self) -> DiscoveryProvider {
        DiscoveryProvider::Consul
    }

    async fn fetch_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>> {
        let url = self.url(&["v1", "health", "service", service_name])?;
        let mut request = self
            .authorize(self.http_client.get(url))
            .query(&[("passing", "true")]);
        if let Some(dc) = &self.datacenter {
            request = request.query(&[("dc", dc)]);
        }

        let resp = ensure_success(request.send().await?).await?;
        let entries: Vec<ConsulServiceEntry> = resp.json().await?;

        let instances: Vec<ServiceInstance> = entries
            .into_iter()
            .map(ConsulServiceEntry::into_instance)
            .collect();

        debug!(
            service_name = %service_name,
            count = instances.len(),
            "Fetched instances from Consul"
        );

        Ok(instances)
    }

    async fn register(&self, instance: &ServiceInstance) -> Result<()> {
        let url = self.url(&["v1", "agent", "service", "register"])?;
        let payload = ConsulRegistration {
            id: instance.service_id(),
            name: instance.service_name(),
            address: instance.address(),
            port: instance.port(),
            tags: instance.tags(),
            meta: instance.metadata(),
            check: self.health_check_for(instance),
        };

        let request = self.authorize(self.http_client.put(url)).json(&payload);
        ensure_success(request.send().await?).await?;

        info!(
            service_name = %instance.service_name(),
            service_id = %instance.service_id(),
            address = %instance.authority(),
            "Registered service with Consul"
        );
        Ok(())
    }

    async fn deregister(&self, service_id: &str) -> Result<()> {
        let url = self.url(&["v1", "agent", "service", "deregister", service_id])?;
        let resp = self.authorize(self.http_client.put(url)).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!(service_id = %service_id, "Service was not registered with Consul, nothing to deregister");
            return Ok(());
        }
        ensure_success(resp).await?;

        info!(service_id = %service_id, "Deregistered service from Consul");
        Ok(())
    }

    async fn check_health(&self, service_id: &str) -> Result<bool> {
        // 200 passing, 429 warning, 503 critical, 404 unknown
        let url = self.url(&["v1", "agent", "health", "service", "id", service_id])?;
        let resp = self.authorize(self.http_client.get(url)).send().await?;
        Ok(resp.status() == StatusCode::OK)
    }
}
