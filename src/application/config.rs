use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::FindError;

/// 配置文件内容 (命令行参数的默认值)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 搜索相关配置
    pub search: SearchDefaults,
    /// 日志相关配置
    pub logging: LoggingConfig,
}

/// 搜索默认值
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    /// 视为归档文件的扩展名
    pub extensions: Vec<String>,
    /// 归档路径与条目名之间的分隔符
    pub separator: String,
    /// 是否输出绝对路径
    pub absolute_path: bool,
    /// 是否在终端上显示查找进度
    pub show_progress: bool,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 是否写入诊断日志文件
    pub enabled: bool,
    /// 日志文件所在目录
    pub log_dir: PathBuf,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            extensions: vec!["jar".to_string()],
            separator: "!".to_string(),
            absolute_path: false,
            show_progress: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: PathBuf::from("."),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 加载配置
    ///
    /// 显式指定的路径必须可读；未指定时读取程序同级目录下的 config.toml，
    /// 文件不存在则使用内置默认值。
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_config_path() {
                Ok(path) if path.is_file() => Self::load_from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn load_from_file(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("cannot read config file {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("cannot parse config file {}", config_path.display()))?;

        Ok(config)
    }

    /// 获取配置文件的默认路径
    pub fn default_config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe()
            .context("cannot locate the executable")?;

        let exe_dir = exe_path.parent()
            .context("cannot locate the executable directory")?;

        Ok(exe_dir.join("config.toml"))
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), FindError> {
        if self.search.extensions.is_empty() {
            return Err(FindError::InvalidConfig("extensions must not be empty".into()));
        }

        if self.search.extensions.iter().any(|ext| normalize_extension(ext).is_empty()) {
            return Err(FindError::InvalidConfig("extension names must not be blank".into()));
        }

        if self.search.separator.is_empty() {
            return Err(FindError::InvalidConfig("separator must not be empty".into()));
        }

        Ok(())
    }
}

/// 规范化扩展名: 去掉首尾空白和开头的 `.`
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_string()
}
