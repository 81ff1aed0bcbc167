// 配置管理模块

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 检测器配置
    #[serde(default)]
    pub checker: CheckerConfig,
    /// 批量检测配置
    #[serde(default)]
    pub batch: BatchConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志保留天数（默认 7 天）
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u32,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_enabled() -> bool {
    false
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            level: default_log_level(),
        }
    }
}

/// 各平台检测器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// 夸克网盘
    #[serde(default)]
    pub quark: ProviderConfig,
}

/// 单个平台的检测配置
///
/// 提取码长度和重定向次数是平台相关的策略，不同平台可以不同
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// 是否启用该平台
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 最大并发检测数
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// 单次检测超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 相邻两次请求的最小间隔（毫秒）
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// 等待限流放行的最长时间（秒）
    #[serde(default = "default_admission_timeout_secs")]
    pub admission_timeout_secs: u64,
    /// 别名域名重定向超时（秒）
    #[serde(default = "default_redirect_timeout_secs")]
    pub redirect_timeout_secs: u64,
    /// 最大重定向次数
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// 提取码最短长度
    #[serde(default = "default_password_min_len")]
    pub password_min_len: usize,
    /// 提取码最长长度
    #[serde(default = "default_password_max_len")]
    pub password_max_len: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_concurrency_limit() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_min_interval_ms() -> u64 {
    100
}

fn default_admission_timeout_secs() -> u64 {
    300
}

fn default_redirect_timeout_secs() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    crate::share::DEFAULT_MAX_REDIRECTS
}

fn default_password_min_len() -> usize {
    2
}

fn default_password_max_len() -> usize {
    50
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            concurrency_limit: default_concurrency_limit(),
            timeout_secs: default_timeout_secs(),
            min_interval_ms: default_min_interval_ms(),
            admission_timeout_secs: default_admission_timeout_secs(),
            redirect_timeout_secs: default_redirect_timeout_secs(),
            max_redirects: default_max_redirects(),
            password_min_len: default_password_min_len(),
            password_max_len: default_password_max_len(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn admission_timeout(&self) -> Duration {
        Duration::from_secs(self.admission_timeout_secs)
    }

    pub fn redirect_timeout(&self) -> Duration {
        Duration::from_secs(self.redirect_timeout_secs)
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            anyhow::bail!("concurrency_limit 必须大于 0");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs 必须大于 0");
        }
        if self.redirect_timeout_secs == 0 {
            anyhow::bail!("redirect_timeout_secs 必须大于 0");
        }
        if self.password_min_len > self.password_max_len {
            anyhow::bail!(
                "提取码长度范围无效: {}-{}",
                self.password_min_len,
                self.password_max_len
            );
        }
        Ok(())
    }
}

/// 批量检测配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// 同时进行中的检测任务上限（各平台限流仍然生效）
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_max_in_flight() -> usize {
    64
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;

        config
            .checker
            .quark
            .validate()
            .context("配置文件中的夸克网盘检测配置无效")?;

        Ok(config)
    }

    /// 保存配置到文件
    pub async fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // 确保父目录存在
        if let Some(parent) = std::path::Path::new(path).parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        fs::write(path, content)
            .await
            .context("Failed to write config file")?;

        tracing::info!("✓ 配置已保存: {}", path);
        Ok(())
    }

    /// 加载配置，文件不存在或加载失败时使用默认配置
    ///
    /// 加载失败的原因随默认配置一起返回，由调用方在日志系统就绪后输出
    pub async fn load_or_default(path: &str) -> (Self, Option<anyhow::Error>) {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return (Self::default(), None);
        }

        match Self::load_from_file(path).await {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }
}
