//! 带服务发现的 HTTP 客户端

use reqwest::{Client, Method, Request, Response};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::ServiceUriResolver;
use crate::error::Result;

/// 在每次发送前解析符号地址的 reqwest 客户端
#[derive(Clone)]
pub struct DiscoveryHttpClient {
    client: Client,
    resolver: Arc<ServiceUriResolver>,
}

impl DiscoveryHttpClient {
    pub fn new(resolver: Arc<ServiceUriResolver>) -> Self {
        Self::with_client(Client::new(), resolver)
    }

    /// 复用已有的 reqwest 客户端（超时、连接池等配置保持不变）
    pub fn with_client(client: Client, resolver: Arc<ServiceUriResolver>) -> Self {
        Self { client, resolver }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        let url = self.resolver.resolve_str(url).await?;
        let request = self.client.request(Method::GET, url).build()?;
        self.send(request).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Response> {
        let url = self.resolver.resolve_str(url).await?;
        let request = self.client.request(Method::POST, url).json(body).build()?;
        self.send(request).await
    }

    /// 发送预先构建好的请求，必要时改写其 URL
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        if self.resolver.is_symbolic(request.url()) {
            let resolved = self.resolver.resolve(request.url().clone()).await?;
            *request.url_mut() = resolved;
        }
        self.send(request).await
    }

    async fn send(&self, request: Request) -> Result<Response> {
        debug!(method = %request.method(), url = %request.url(), "Sending request");
        Ok(self.client.execute(request).await?)
    }
}
