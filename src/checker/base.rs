// 检测器公共部分：限流与超时配置

use std::time::Duration;

use super::governor::{AdmitPermit, RateGovernor};
use super::types::Platform;

/// 默认等待放行超时
const DEFAULT_ADMISSION_TIMEOUT: Duration = Duration::from_secs(300);

/// 各平台检测器共享的基础部分
#[derive(Debug)]
pub struct BaseChecker {
    platform: Platform,
    governor: RateGovernor,
    /// 单次检测超时（从放行开始计时）
    timeout: Duration,
    /// 等待放行的最长时间
    admission_timeout: Duration,
}

impl BaseChecker {
    /// 创建基础检测器，默认不限制请求间隔
    pub fn new(platform: Platform, concurrency_limit: usize, timeout: Duration) -> Self {
        Self {
            platform,
            governor: RateGovernor::new(platform, concurrency_limit, Duration::ZERO),
            timeout,
            admission_timeout: DEFAULT_ADMISSION_TIMEOUT,
        }
    }

    /// 设置相邻请求的最小间隔
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.governor = RateGovernor::new(
            self.platform,
            self.governor.concurrency_limit(),
            min_interval,
        );
        self
    }

    pub fn with_admission_timeout(mut self, admission_timeout: Duration) -> Self {
        self.admission_timeout = admission_timeout;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn admission_timeout(&self) -> Duration {
        self.admission_timeout
    }

    pub fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    /// 应用频率限制，等待放行
    pub async fn apply_rate_limit(&self) -> AdmitPermit {
        self.governor.admit().await
    }
}
