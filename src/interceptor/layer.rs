//! tower 服务发现中间件

use futures::future::BoxFuture;
use http::{Request, Uri};
use reqwest::Url;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use super::ServiceUriResolver;
use crate::error::{DiscoveryError, Result};

/// 中间件统一错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 服务发现中间件层
#[derive(Clone)]
pub struct DiscoveryLayer {
    resolver: Arc<ServiceUriResolver>,
}

impl DiscoveryLayer {
    pub fn new(resolver: Arc<ServiceUriResolver>) -> Self {
        Self { resolver }
    }
}

impl<S> Layer<S> for DiscoveryLayer {
    type Service = DiscoveryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DiscoveryService {
            inner,
            resolver: self.resolver.clone(),
        }
    }
}

/// 服务发现中间件
///
/// 在转发给内层服务前改写请求 URI；无法解析时请求不会发出。
#[derive(Clone)]
pub struct DiscoveryService<S> {
    inner: S,
    resolver: Arc<ServiceUriResolver>,
}

impl<S, B> Service<Request<B>> for DiscoveryService<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // 使用已经 ready 的实例，留一个克隆给下一次调用
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let resolver = self.resolver.clone();

        Box::pin(async move {
            let resolved = resolve_uri(&resolver, req.uri()).await?;
            if let Some(uri) = resolved {
                *req.uri_mut() = uri;
            }
            inner.call(req).await.map_err(Into::into)
        })
    }
}

/// 解析请求 URI，无需改写时返回 `None`
async fn resolve_uri(resolver: &ServiceUriResolver, uri: &Uri) -> Result<Option<Uri>> {
    // 相对 URI 没有主机，不可能是符号地址
    let Ok(url) = Url::parse(&uri.to_string()) else {
        return Ok(None);
    };
    if !resolver.is_symbolic(&url) {
        return Ok(None);
    }

    let resolved = resolver.resolve(url).await?;
    let uri = resolved
        .as_str()
        .parse::<Uri>()
        .map_err(|e| DiscoveryError::InvalidUri(format!("{}: {}", resolved, e)))?;
    Ok(Some(uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ServiceInstance;
    use crate::interceptor::tests::resolver_with;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    fn layer() -> DiscoveryLayer {
        let (resolver, _) = resolver_with(vec![ServiceInstance::new("orders", "orders-1", "10.0.0.5", 8080)]);
        DiscoveryLayer::new(Arc::new(resolver))
    }

    async fn echo_uri(req: Request<()>) -> std::result::Result<String, Infallible> {
        Ok(req.uri().to_string())
    }

    #[tokio::test]
    async fn rewrites_request_uri_before_inner_service() {
        let service = ServiceBuilder::new().layer(layer()).service(service_fn(echo_uri));

        let req = Request::builder()
            .uri("service://orders/api/data?page=2")
            .body(())
            .unwrap();
        let seen = service.oneshot(req).await.unwrap();

        assert_eq!(seen, "http://10.0.0.5:8080/api/data?page=2");
    }

    #[tokio::test]
    async fn leaves_concrete_and_relative_uris_alone() {
        let service = ServiceBuilder::new().layer(layer()).service(service_fn(echo_uri));
        let req = Request::builder().uri("http://10.0.0.9:81/health").body(()).unwrap();
        assert_eq!(service.oneshot(req).await.unwrap(), "http://10.0.0.9:81/health");

        let service = ServiceBuilder::new().layer(layer()).service(service_fn(echo_uri));
        let req = Request::builder().uri("/health").body(()).unwrap();
        assert_eq!(service.oneshot(req).await.unwrap(), "/health");
    }

    #[tokio::test]
    async fn unresolved_service_never_reaches_inner_service() {
        let dispatched = Arc::new(AtomicBool::new(false));
        let flag = dispatched.clone();
        let service = ServiceBuilder::new().layer(layer()).service(service_fn(move |_req: Request<()>| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok::<_, Infallible>(String::new())
            }
        }));

        let req = Request::builder().uri("service://payments/charge").body(()).unwrap();
        let err = service.oneshot(req).await.unwrap_err();

        assert!(!dispatched.load(Ordering::SeqCst));
        let err = err.downcast::<DiscoveryError>().unwrap();
        assert!(matches!(*err, DiscoveryError::ServiceUnresolved { .. }));
    }
}
