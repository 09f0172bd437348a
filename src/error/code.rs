//! 错误代码和错误类别定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 服务发现错误代码
///
/// 错误代码按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 注册中心连接相关错误
/// - 2000-2999: 服务解析相关错误
/// - 3000-3999: 服务注册相关错误
/// - 4000-4999: 配置相关错误
/// - 9000-9999: 通用错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 注册中心连接相关错误 (1000-1999)
    // ============================================================
    RegistryUnreachable = 1000,
    RegistryTimeout = 1001,
    RegistryResponseInvalid = 1002,

    // ============================================================
    // 服务解析相关错误 (2000-2999)
    // ============================================================
    ServiceUnresolved = 2000,
    LookupFailed = 2001,
    LookupTimeout = 2002,
    InvalidServiceUri = 2003,

    // ============================================================
    // 服务注册相关错误 (3000-3999)
    // ============================================================
    RegistrationRejected = 3000,

    // ============================================================
    // 配置相关错误 (4000-4999)
    // ============================================================
    ConfigurationError = 4000,
    UnsupportedProvider = 4001,
    ConfigurationFileError = 4002,

    // ============================================================
    // 通用错误 (9000-9999)
    // ============================================================
    OperationCancelled = 9000,
    UnknownError = 9999,
}

impl ErrorCode {
    /// 获取错误代码的数值
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RegistryUnreachable => "REGISTRY_UNREACHABLE",
            ErrorCode::RegistryTimeout => "REGISTRY_TIMEOUT",
            ErrorCode::RegistryResponseInvalid => "REGISTRY_RESPONSE_INVALID",
            ErrorCode::ServiceUnresolved => "SERVICE_UNRESOLVED",
            ErrorCode::LookupFailed => "LOOKUP_FAILED",
            ErrorCode::LookupTimeout => "LOOKUP_TIMEOUT",
            ErrorCode::InvalidServiceUri => "INVALID_SERVICE_URI",
            ErrorCode::RegistrationRejected => "REGISTRATION_REJECTED",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::UnsupportedProvider => "UNSUPPORTED_PROVIDER",
            ErrorCode::ConfigurationFileError => "CONFIGURATION_FILE_ERROR",
            ErrorCode::OperationCancelled => "OPERATION_CANCELLED",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// 获取错误代码的类别
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Connection,
            2000..=2999 => ErrorCategory::Resolution,
            3000..=3999 => ErrorCategory::Registration,
            4000..=4999 => ErrorCategory::Configuration,
            _ => ErrorCategory::General,
        }
    }

    /// 是否属于瞬时故障（注册中心或 DNS 暂时不可用）
    ///
    /// 本模块不做重试，这个标记只供上层调用方参考。
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorCode::RegistryUnreachable
                | ErrorCode::RegistryTimeout
                | ErrorCode::LookupFailed
                | ErrorCode::LookupTimeout
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Connection,
    Resolution,
    Registration,
    Configuration,
    General,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Connection => write!(f, "CONNECTION"),
            ErrorCategory::Resolution => write!(f, "RESOLUTION"),
            ErrorCategory::Registration => write!(f, "REGISTRATION"),
            ErrorCategory::Configuration => write!(f, "CONFIGURATION"),
            ErrorCategory::General => write!(f, "GENERAL"),
        }
    }
}
