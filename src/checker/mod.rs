//! 链接检测模块
//!
//! 检测流程：限流放行 -> 链接解析（别名域名先重定向）-> 平台探测 -> 检测结果
//!
//! 各平台只需提供自己的链接规则与 [`ProviderProbe`]，
//! 限流、计时与结果归一由 [`ShareChecker`] 统一完成。

mod base;
mod error;
mod governor;
mod registry;
mod share_checker;
mod types;

pub use base::BaseChecker;
pub use error::{CheckFailure, FormatError};
pub use governor::{AdmitPermit, RateGovernor};
pub use registry::CheckerRegistry;
pub use share_checker::ShareChecker;
pub use types::{CheckResult, Platform, ResourceLocator};

use async_trait::async_trait;
use tokio::time::Instant;

/// 统一的链接检测接口
///
/// 正常的失败情况全部编码在 [`CheckResult`] 中，不会返回错误
#[async_trait]
pub trait LinkChecker: Send + Sync {
    /// 所属平台
    fn platform(&self) -> Platform;

    /// 是否能处理该域名的链接（含别名域名）
    fn handles_host(&self, host: &str) -> bool;

    /// 检测链接，等待放行最多到 `admission_deadline`
    async fn check_with_deadline(&self, link: &str, admission_deadline: Instant) -> CheckResult;

    /// 默认等待放行的最长时间
    fn admission_timeout(&self) -> std::time::Duration;

    /// 检测链接
    async fn check(&self, link: &str) -> CheckResult {
        let deadline = Instant::now() + self.admission_timeout();
        self.check_with_deadline(link, deadline).await
    }
}

/// 平台探测接口
///
/// 将解析后的资源定位信息转换为有效/失效结论，每一步只请求一次
#[async_trait]
pub trait ProviderProbe: Send + Sync {
    /// 所有网络请求必须在 `deadline` 前完成
    async fn probe(&self, locator: &ResourceLocator, deadline: Instant) -> Result<(), CheckFailure>;
}
