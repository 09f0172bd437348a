//! 服务发现统一错误类型

use super::code::ErrorCode;
use thiserror::Error;

/// 服务发现错误
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// 与注册中心通信失败（连接、超时、响应体解析）
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// 注册中心返回了非成功状态码
    #[error("registry rejected request with status {status}: {message}")]
    Registry { status: u16, message: String },

    /// DNS 解析失败
    #[error("failed to resolve {host}: {source}")]
    Lookup {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// DNS 解析超时
    #[error("lookup of {host} timed out")]
    LookupTimeout { host: String },

    /// 服务名无法解析到任何健康实例
    #[error("service '{service_name}' could not be resolved through service discovery")]
    ServiceUnresolved { service_name: String },

    /// 不支持的服务发现提供方
    #[error("unsupported service discovery provider: {0}")]
    UnsupportedProvider(String),

    /// 配置不合法
    #[error("invalid discovery configuration: {0}")]
    InvalidConfig(String),

    /// 配置文件读取或解析失败
    #[error("failed to load configuration file {path}: {reason}")]
    ConfigFile { path: String, reason: String },

    /// 请求地址不合法
    #[error("invalid request uri: {0}")]
    InvalidUri(String),

    /// 调用方取消了操作
    #[error("operation cancelled")]
    Cancelled,
}

impl DiscoveryError {
    /// 创建注册中心错误
    pub fn registry(status: u16, message: impl Into<String>) -> Self {
        DiscoveryError::Registry {
            status,
            message: message.into(),
        }
    }

    /// 创建服务无法解析错误
    pub fn unresolved(service_name: impl Into<String>) -> Self {
        DiscoveryError::ServiceUnresolved {
            service_name: service_name.into(),
        }
    }

    /// 创建配置错误
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        DiscoveryError::InvalidConfig(reason.into())
    }

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            DiscoveryError::Http(e) if e.is_timeout() => ErrorCode::RegistryTimeout,
            DiscoveryError::Http(e) if e.is_decode() => ErrorCode::RegistryResponseInvalid,
            DiscoveryError::Http(_) => ErrorCode::RegistryUnreachable,
            DiscoveryError::Registry { .. } => ErrorCode::RegistrationRejected,
            DiscoveryError::Lookup { .. } => ErrorCode::LookupFailed,
            DiscoveryError::LookupTimeout { .. } => ErrorCode::LookupTimeout,
            DiscoveryError::ServiceUnresolved { .. } => ErrorCode::ServiceUnresolved,
            DiscoveryError::UnsupportedProvider(_) => ErrorCode::UnsupportedProvider,
            DiscoveryError::InvalidConfig(_) => ErrorCode::ConfigurationError,
            DiscoveryError::ConfigFile { .. } => ErrorCode::ConfigurationFileError,
            DiscoveryError::InvalidUri(_) => ErrorCode::InvalidServiceUri,
            DiscoveryError::Cancelled => ErrorCode::OperationCancelled,
        }
    }

    /// 是否为瞬时故障
    pub fn is_transient(&self) -> bool {
        self.code().is_transient()
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, DiscoveryError>;
