// 检测结果与链接定位类型

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::CheckFailure;

/// 网盘平台标识
///
/// 每个平台对应一套独立的限流配置与探测逻辑
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// 夸克网盘
    Quark,
}

impl Platform {
    /// 平台标识名（用于日志与配置）
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Quark => "quark",
        }
    }

    /// 分享链接使用的域名，第一个为规范域名
    pub fn hosts(&self) -> &'static [&'static str] {
        match self {
            Platform::Quark => &["pan.quark.cn", "pan.qoark.cn"],
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 从分享链接中解析出的资源定位信息
///
/// 只在一次检测内有效，不做持久化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    /// 资源ID（非空）
    pub resource_id: String,
    /// 提取码（可能为空）
    pub pass_code: String,
}

/// 单条链接的检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// 链接是否有效
    pub valid: bool,
    /// 失效原因（有效时为空）
    #[serde(default)]
    pub failure_reason: String,
    /// 检测耗时（毫秒）
    pub duration_ms: i64,
}

impl CheckResult {
    pub fn valid(elapsed: Duration) -> Self {
        Self {
            valid: true,
            failure_reason: String::new(),
            duration_ms: millis(elapsed),
        }
    }

    pub fn invalid(failure: &CheckFailure, elapsed: Duration) -> Self {
        Self {
            valid: false,
            failure_reason: failure.to_string(),
            duration_ms: millis(elapsed),
        }
    }

    /// 由检测流程的最终状态生成结果
    pub fn from_outcome(outcome: &Result<(), CheckFailure>, elapsed: Duration) -> Self {
        match outcome {
            Ok(()) => Self::valid(elapsed),
            Err(failure) => Self::invalid(failure, elapsed),
        }
    }
}

fn millis(elapsed: Duration) -> i64 {
    i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
}
