//! 服务运行时
//!
//! 托管注册生命周期：启动时注册，等待关闭信号，关闭时在超时内注销。
//!
//! # 使用示例
//! ```rust,no_run
//! use flare_discovery::config::Config;
//! use flare_discovery::runtime::ServiceRuntime;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load_from_file("config/discovery.toml")?;
//! let runtime = ServiceRuntime::new(&config.discovery)?.with_config(config.runtime);
//!
//! // 出站请求通过服务发现解析
//! let client = runtime.http_client();
//! let _ = client.get("service://orders/api/data").await;
//!
//! runtime.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod runtime;

pub use config::RuntimeConfig;
pub use runtime::ServiceRuntime;
