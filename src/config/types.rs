//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// 主配置结构，包含全局配置和服务列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// 服务配置列表
    pub services: Vec<ServiceConfig>,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 单次探测超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// 慢响应阈值（毫秒），超过即判定为 SLOW
    #[serde(default = "default_slow_threshold")]
    pub slow_threshold_ms: u64,
    /// 检测间隔（分钟）
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u64,
    /// 历史记录保存间隔（分钟）
    #[serde(default = "default_save_interval")]
    pub save_interval_minutes: u64,
    /// 每个服务保留的历史记录条数
    #[serde(default = "default_history_entries")]
    pub history_entries: usize,
    /// 历史记录文件路径
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Web 服务器配置
    #[serde(default)]
    pub web: WebConfig,
    /// 通知配置
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// 服务配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ServiceConfig {
    /// 服务名称（唯一）
    pub name: String,
    /// 服务URL
    pub url: String,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Web 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebConfig {
    /// 是否启用状态页和指标端点
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 绑定地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// 端口
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl WebConfig {
    /// 解析监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| format!("无效的监听地址 {}:{}: {}", self.bind_address, self.port, e))
    }
}

/// Webhook 消息体格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WebhookFormat {
    /// `{"text": "..."}`
    #[default]
    Plain,
    /// 飞书机器人文本消息
    Feishu,
}

/// 通知配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NotificationConfig {
    /// Webhook URL，未配置时不发送通知
    pub webhook_url: Option<String>,
    /// 消息体格式
    #[serde(default)]
    pub format: WebhookFormat,
    /// DOWN 告警模板（handlebars）
    pub down_template: Option<String>,
    /// SLOW 告警模板（handlebars）
    pub slow_template: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            slow_threshold_ms: default_slow_threshold(),
            check_interval_minutes: default_check_interval(),
            save_interval_minutes: default_save_interval(),
            history_entries: default_history_entries(),
            state_file: default_state_file(),
            log_level: default_log_level(),
            web: WebConfig::default(),
            notification: NotificationConfig::default(),
        }
    }
}

impl GlobalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_minutes.saturating_mul(60))
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_minutes.saturating_mul(60))
    }
}

/// 检测和保存间隔上限（分钟），即7天
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

// 默认值函数
fn default_timeout() -> u64 {
    10
}
fn default_slow_threshold() -> u64 {
    crate::health::classifier::DEFAULT_SLOW_THRESHOLD_MS
}
fn default_check_interval() -> u64 {
    5
}
fn default_save_interval() -> u64 {
    5
}
fn default_history_entries() -> usize {
    288
}
fn default_state_file() -> PathBuf {
    PathBuf::from("status_history.json")
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_enabled() -> bool {
    true
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    let global = &config.global;

    if global.timeout_seconds == 0 {
        return Err("请求超时时间不能为0".to_string());
    }

    if global.check_interval_minutes == 0 {
        return Err("检测间隔不能为0".to_string());
    }

    if global.save_interval_minutes == 0 {
        return Err("保存间隔不能为0".to_string());
    }

    if global.check_interval_minutes > MAX_INTERVAL_MINUTES
        || global.save_interval_minutes > MAX_INTERVAL_MINUTES
    {
        return Err(format!("检测和保存间隔不能超过{}分钟", MAX_INTERVAL_MINUTES));
    }

    if global.history_entries == 0 {
        return Err("历史记录条数不能为0".to_string());
    }

    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            global.log_level, valid_log_levels
        ));
    }

    if global.web.enabled {
        if global.web.port == 0 {
            return Err("Web服务器端口不能为0".to_string());
        }
        if global.web.bind_address.is_empty() {
            return Err("Web服务器绑定地址不能为空".to_string());
        }
    }

    if let Some(ref url) = global.notification.webhook_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err("通知webhook URL格式无效".to_string());
        }
    }

    if config.services.is_empty() {
        return Err("至少需要配置一个服务".to_string());
    }

    let mut seen = HashSet::new();
    for service in &config.services {
        if service.name.trim().is_empty() {
            return Err("服务名称不能为空".to_string());
        }

        if !seen.insert(service.name.as_str()) {
            return Err(format!("服务名称重复: {}", service.name));
        }

        if !service.url.starts_with("http://") && !service.url.starts_with("https://") {
            return Err(format!("服务 {} 的URL格式无效", service.name));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        Config {
            global: GlobalConfig::default(),
            services: vec![
                ServiceConfig::new("KRA iTax", "https://itax.kra.go.ke"),
                ServiceConfig::new("eCitizen", "https://accounts.ecitizen.go.ke"),
            ],
        }
    }

    #[test]
    fn test_default_values() {
        let global = GlobalConfig::default();

        assert_eq!(global.timeout_seconds, 10);
        assert_eq!(global.slow_threshold_ms, 4000);
        assert_eq!(global.check_interval_minutes, 5);
        assert_eq!(global.save_interval_minutes, 5);
        assert_eq!(global.history_entries, 288);
        assert_eq!(global.state_file, PathBuf::from("status_history.json"));
        assert_eq!(global.web.port, 8000);
        assert!(global.notification.webhook_url.is_none());
        assert_eq!(global.check_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_config_serialization() {
        let config = create_test_config();

        let serialized = toml::to_string(&config).expect("序列化失败");
        let deserialized: Config = toml::from_str(&serialized).expect("反序列化失败");

        assert_eq!(config.global, deserialized.global);
        assert_eq!(config.services, deserialized.services);
    }

    #[test]
    fn test_config_validation() {
        assert!(validate_config(&create_test_config()).is_ok());
    }

    #[test]
    fn test_config_validation_empty_services() {
        let mut config = create_test_config();
        config.services.clear();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("至少需要配置一个服务"));
    }

    #[test]
    fn test_config_validation_duplicate_name() {
        let mut config = create_test_config();
        config
            .services
            .push(ServiceConfig::new("KRA iTax", "https://example.com"));

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("服务名称重复"));
    }

    #[test]
    fn test_config_validation_invalid_url() {
        let mut config = create_test_config();
        config.services[0].url = "itax.kra.go.ke".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("URL格式无效"));
    }

    #[test]
    fn test_config_validation_zero_capacity() {
        let mut config = create_test_config();
        config.global.history_entries = 0;

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_config_validation_interval_upper_bound() {
        let mut config = create_test_config();
        config.global.check_interval_minutes = MAX_INTERVAL_MINUTES;
        assert!(validate_config(&config).is_ok());

        config.global.check_interval_minutes = u64::MAX;
        assert!(validate_config(&config).unwrap_err().contains("不能超过"));

        config.global.check_interval_minutes = 5;
        config.global.save_interval_minutes = MAX_INTERVAL_MINUTES + 1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_interval_accessors_saturate() {
        let global = GlobalConfig {
            check_interval_minutes: u64::MAX,
            save_interval_minutes: u64::MAX / 2,
            ..GlobalConfig::default()
        };

        assert_eq!(global.check_interval(), Duration::from_secs(u64::MAX));
        assert_eq!(global.save_interval(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_web_config_socket_addr() {
        let config = WebConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            ..Default::default()
        };

        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_webhook_format_parsing() {
        let notification: NotificationConfig =
            toml::from_str("webhook_url = \"https://hooks.example.com/x\"\nformat = \"feishu\"")
                .unwrap();
        assert_eq!(notification.format, WebhookFormat::Feishu);
    }
}
