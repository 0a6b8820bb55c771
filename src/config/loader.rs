//! 配置加载
//!
//! 读取 TOML 配置文件，在解析前展开 `${VAR}` / `${VAR:-默认值}` 形式的环境变量，
//! 解析后统一执行 [`validate_config`]。

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// 配置来源
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    async fn load_from_string(&self, content: &str) -> Result<Config>;

    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML 配置加载器
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    expand_env: bool,
}

impl TomlConfigLoader {
    /// `expand_env` 为 false 时原样解析，不展开环境变量
    pub fn new(expand_env: bool) -> Self {
        Self { expand_env }
    }

    fn parse(&self, content: &str) -> Result<Config> {
        let content = if self.expand_env {
            expand_env_vars(content, |name| std::env::var(name).ok())?
        } else {
            content.to_string()
        };

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {}", e)))?;
        self.validate(&config)?;
        Ok(config)
    }
}

impl Default for TomlConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
                .into())
            }
            Err(e) => {
                return Err(ConfigError::ParseError(format!(
                    "读取 {} 失败: {}",
                    path.display(),
                    e
                ))
                .into())
            }
        };

        let config = self.parse(&content)?;
        info!(
            "已加载配置 {}: {} 个服务",
            path.display(),
            config.services.len()
        );
        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse(content)?;
        debug!("已解析配置字符串: {} 个服务", config.services.len());
        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

fn env_var_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, String>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)).into())
}

/// 展开环境变量
///
/// 注释行保持原样。变量未设置且没有默认值时报错，错误中列出所有缺失的变量。
pub fn expand_env_vars<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = env_var_pattern()?;
    let mut missing: Vec<String> = Vec::new();

    let lines: Vec<String> = content
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }
            pattern
                .replace_all(line, |caps: &Captures| {
                    let name = &caps[1];
                    match (lookup(name), caps.get(2)) {
                        (Some(value), _) => value,
                        (None, Some(default)) => default.as_str().to_string(),
                        (None, None) => {
                            if !missing.iter().any(|m| m == name) {
                                missing.push(name.to_string());
                            }
                            String::new()
                        }
                    }
                })
                .into_owned()
        })
        .collect();

    if !missing.is_empty() {
        return Err(ConfigError::EnvVarError {
            var: missing.join(", "),
        }
        .into());
    }

    let mut expanded = lines.join("\n");
    if content.ends_with('\n') {
        expanded.push('\n');
    }
    Ok(expanded)
}

/// 默认配置文件路径
///
/// 当前目录存在 `config.toml` 时优先使用，否则使用用户配置目录下的
/// `service-pulse/config.toml`。
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from("config.toml");
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join("service-pulse").join("config.toml"))
        .unwrap_or(local)
}
