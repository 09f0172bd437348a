//! 请求拦截模块
//!
//! 在请求发出前把 `service://orders/...` 这类符号地址改写为实际的
//! `http://{address}:{port}/...`。每次请求都重新发现，不缓存、不重试。
//!
//! - [`ServiceUriResolver`]：识别与改写
//! - [`DiscoveryLayer`]：tower 中间件
//! - [`DiscoveryHttpClient`]：带服务发现的 reqwest 客户端

pub mod client;
pub mod layer;

pub use client::DiscoveryHttpClient;
pub use layer::{BoxError, DiscoveryLayer, DiscoveryService};

use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::discovery::{InterceptorOptions, ServiceDiscovery, ServiceInstance};
use crate::error::{DiscoveryError, Result};

/// 保留给服务发现的 scheme
pub const SERVICE_SCHEME: &str = "service";

/// 服务地址解析器
pub struct ServiceUriResolver {
    discovery: Arc<ServiceDiscovery>,
    bare_host_fallback: bool,
}

impl ServiceUriResolver {
    pub fn new(discovery: Arc<ServiceDiscovery>, options: &InterceptorOptions) -> Self {
        Self {
            discovery,
            bare_host_fallback: options.bare_host_fallback,
        }
    }

    pub fn discovery(&self) -> &Arc<ServiceDiscovery> {
        &self.discovery
    }

    /// 判断地址是否为符号地址
    ///
    /// `service://` 一定是；`http://` 只有在开启兼容回退、且主机名是不含 '.'
    /// 的单段域名（非 IP、非 localhost）时才算。
    pub fn is_symbolic(&self, url: &Url) -> bool {
        match url.scheme() {
            SERVICE_SCHEME => url.host_str().is_some_and(|host| !host.is_empty()),
            "http" if self.bare_host_fallback => url.domain().is_some_and(is_bare_host),
            _ => false,
        }
    }

    /// 提取符号地址中的服务名
    pub fn service_name<'a>(&self, url: &'a Url) -> Option<&'a str> {
        if self.is_symbolic(url) {
            url.host_str()
        } else {
            None
        }
    }

    /// 解析并改写地址，非符号地址原样返回
    pub async fn resolve(&self, url: Url) -> Result<Url> {
        let Some(service_name) = self.service_name(&url) else {
            return Ok(url);
        };

        match self.discovery.discover_service(service_name).await {
            Some(instance) => {
                let resolved = rewrite(&url, &instance)?;
                debug!(
                    service_name = %service_name,
                    service_url = %instance.http_url(),
                    "Resolved service"
                );
                Ok(resolved)
            }
            None => {
                warn!(service_name = %service_name, "Could not resolve service through service discovery");
                Err(DiscoveryError::unresolved(service_name))
            }
        }
    }

    /// 解析字符串形式的地址
    pub async fn resolve_str(&self, url: &str) -> Result<Url> {
        let url = Url::parse(url).map_err(|e| DiscoveryError::InvalidUri(format!("{}: {}", url, e)))?;
        self.resolve(url).await
    }
}

fn is_bare_host(host: &str) -> bool {
    !host.contains('.') && !host.eq_ignore_ascii_case("localhost")
}

/// 把符号地址改写到实例地址，path、query、fragment 原样保留
///
/// `service` 不是特殊 scheme，path 中的 `\` 和 query 中的 `'` 不会被编码；
/// 改写为 http 时先百分号编码，避免 `\` 被当作路径分隔符。
pub fn rewrite(url: &Url, instance: &ServiceInstance) -> Result<Url> {
    let mut target = instance.http_url();
    target.push_str(&url.path().replace('\\', "%5C"));
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(&query.replace('\'', "%27"));
    }
    if let Some(fragment) = url.fragment() {
        target.push('#');
        target.push_str(fragment);
    }

    Url::parse(&target).map_err(|e| DiscoveryError::InvalidUri(format!("{}: {}", target, e)))
}
