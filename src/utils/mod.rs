//! 工具函数模块

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::{DiscoveryError, Result};

/// 运行环境环境变量
pub const APP_ENVIRONMENT_ENV: &str = "APP_ENVIRONMENT";

/// 未设置运行环境时的默认值
pub const DEFAULT_ENVIRONMENT: &str = "Production";

/// 在取消信号触发前执行 future
///
/// 取消时 future 会被直接丢弃，返回 [`DiscoveryError::Cancelled`]。
///
/// # 示例
/// ```rust,no_run
/// use flare_discovery::utils::cancellable;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> flare_discovery::error::Result<()> {
/// let token = CancellationToken::new();
/// let value = cancellable(&token, async { Ok(42) }).await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
pub async fn cancellable<T, F>(token: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(DiscoveryError::Cancelled),
        result = future => result,
    }
}

/// 当前主机标识
///
/// 优先使用系统主机名，获取失败时回退到 `HOSTNAME` 环境变量，最后为 "localhost"。
pub fn host_identifier() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|name| !name.is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}

/// 当前进程 ID
pub fn process_identifier() -> u32 {
    std::process::id()
}

/// 运行环境名称（`APP_ENVIRONMENT`，默认 "Production"）
pub fn app_environment() -> String {
    std::env::var(APP_ENVIRONMENT_ENV)
        .ok()
        .filter(|env| !env.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let value = cancellable(&token, async { Ok::<_, DiscoveryError>("done") }).await.unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn cancelled_token_aborts_pending_future() {
        let token = CancellationToken::new();
        token.cancel();

        let result = cancellable(&token, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(DiscoveryError::Cancelled)));
    }

    #[test]
    fn cancellable_on_blocking_executor() {
        let token = CancellationToken::new();
        let value = tokio_test::block_on(cancellable(&token, async { Ok::<_, DiscoveryError>(7) }));
        assert_eq!(value.unwrap(), 7);
    }

    #[test]
    fn host_identifier_is_never_empty() {
        assert!(!host_identifier().is_empty());
    }
}
