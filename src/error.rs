//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Service Pulse 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum ServicePulseError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 历史记录持久化错误
    #[error("持久化错误: {0}")]
    Persistence(#[from] PersistenceError),

    /// 通知相关错误
    #[error("通知错误: {0}")]
    Notification(#[from] NotificationError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 历史记录持久化错误类型
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// 读取状态文件失败
    #[error("读取状态文件失败 {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 写入状态文件失败
    #[error("写入状态文件失败 {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 状态文件格式错误
    #[error("状态文件格式错误: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// 通知错误类型
#[derive(Error, Debug)]
pub enum NotificationError {
    /// 发送失败
    #[error("通知发送失败: {0}")]
    SendError(String),

    /// 模板渲染错误
    #[error("模板渲染失败: {0}")]
    TemplateError(String),

    /// 配置错误
    #[error("通知配置错误: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::SendError(err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ServicePulseError>;
