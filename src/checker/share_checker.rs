// 分享链接检测器（组合根）

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::base::BaseChecker;
use super::error::CheckFailure;
use super::types::{CheckResult, Platform};
use super::{LinkChecker, ProviderProbe};
use crate::share::ShareLinkParser;

/// 分享链接检测器
///
/// 组合限流器、链接解析器和平台探测，对外只暴露 `check`
pub struct ShareChecker<P> {
    base: BaseChecker,
    parser: ShareLinkParser,
    probe: P,
}

impl<P: ProviderProbe> ShareChecker<P> {
    pub fn new(base: BaseChecker, parser: ShareLinkParser, probe: P) -> Self {
        Self {
            base,
            parser,
            probe,
        }
    }

    pub fn base(&self) -> &BaseChecker {
        &self.base
    }

    pub fn parser(&self) -> &ShareLinkParser {
        &self.parser
    }

    /// 放行后的检测流程：解析 -> 探测
    async fn run(&self, link: &str, deadline: Instant) -> Result<(), CheckFailure> {
        let locator = self.parser.parse(link).await?;
        debug!(
            "[{}] 解析链接成功: resource_id={}, has_password={}",
            self.base.platform(),
            locator.resource_id,
            !locator.pass_code.is_empty()
        );
        self.probe.probe(&locator, deadline).await
    }
}

#[async_trait]
impl<P: ProviderProbe> LinkChecker for ShareChecker<P> {
    fn platform(&self) -> Platform {
        self.base.platform()
    }

    fn handles_host(&self, host: &str) -> bool {
        self.parser.policy().accepts_host(host)
    }

    async fn check_with_deadline(&self, link: &str, admission_deadline: Instant) -> CheckResult {
        let waiting_since = Instant::now();
        let _permit =
            match tokio::time::timeout_at(admission_deadline, self.base.apply_rate_limit()).await {
                Ok(permit) => permit,
                Err(_) => {
                    info!("[{}] 等待限流放行超时: {}", self.base.platform(), link);
                    return CheckResult::invalid(
                        &CheckFailure::RequestTimeout,
                        waiting_since.elapsed(),
                    );
                }
            };

        let start = Instant::now();
        let deadline = start + self.base.timeout();
        let outcome = self.run(link, deadline).await;
        let result = CheckResult::from_outcome(&outcome, start.elapsed());

        match &outcome {
            Ok(()) => info!(
                "[{}] 链接有效: {} ({}ms)",
                self.base.platform(),
                link,
                result.duration_ms
            ),
            Err(failure) => info!(
                "[{}] 链接失效: {}, 原因: {} ({}ms)",
                self.base.platform(),
                link,
                failure.detail(),
                result.duration_ms
            ),
        }

        result
    }

    fn admission_timeout(&self) -> Duration {
        self.base.admission_timeout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::ResourceLocator;
    use crate::share::{RedirectResolve, ResolveError, SharePolicy};
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// 不应被调用的重定向解析器
    struct NoRedirect;

    #[async_trait]
    impl RedirectResolve for NoRedirect {
        async fn resolve(&self, _url: &str, _timeout: Duration) -> Result<String, ResolveError> {
            Err(ResolveError::Network("unexpected redirect".to_string()))
        }
    }

    /// 固定重定向到指定地址
    struct FixedRedirect(&'static str);

    #[async_trait]
    impl RedirectResolve for FixedRedirect {
        async fn resolve(&self, _url: &str, _timeout: Duration) -> Result<String, ResolveError> {
            Ok(self.0.to_string())
        }
    }

    /// 可注入延迟、统计并发的探测替身
    #[derive(Default)]
    struct FakeProbe {
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl ProviderProbe for Arc<FakeProbe> {
        async fn probe(
            &self,
            _locator: &ResourceLocator,
            deadline: Instant,
        ) -> Result<(), CheckFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let slept = tokio::time::timeout_at(deadline, tokio::time::sleep(self.delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            slept.map_err(|_| CheckFailure::RequestTimeout)
        }
    }

    fn checker(
        limit: usize,
        timeout: Duration,
        probe: Arc<FakeProbe>,
    ) -> ShareChecker<Arc<FakeProbe>> {
        let base = BaseChecker::new(Platform::Quark, limit, timeout);
        let parser = ShareLinkParser::new(
            SharePolicy::quark(),
            Arc::new(NoRedirect),
            Duration::from_secs(1),
        );
        ShareChecker::new(base, parser, probe)
    }

    const LINK: &str = "https://pan.quark.cn/s/39749e1fb630";

    #[tokio::test]
    async fn test_malformed_link_never_probes() {
        let probe = Arc::new(FakeProbe::default());
        let checker = checker(2, Duration::from_secs(1), Arc::clone(&probe));

        for link in [
            "http://pan.quark.cn/s/abc",
            "https://pan.example.com/s/abc",
            "https://pan.quark.cn/s/",
            "https://pan.quark.cn/s/abc?pwd=x",
            "not a url",
        ] {
            let result = checker.check(link).await;
            assert!(!result.valid, "{} should be invalid", link);
            assert!(result.duration_ms >= 0);
            assert!(!result.failure_reason.is_empty());
        }
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duration_grows_with_probe_delay() {
        let fast = Arc::new(FakeProbe::default());
        let slow = Arc::new(FakeProbe {
            delay: Duration::from_millis(150),
            ..Default::default()
        });

        let fast_result = checker(1, Duration::from_secs(2), fast).check(LINK).await;
        let slow_result = checker(1, Duration::from_secs(2), slow).check(LINK).await;

        assert!(fast_result.valid && slow_result.valid);
        assert!(slow_result.duration_ms >= 150);
        assert!(slow_result.duration_ms >= fast_result.duration_ms);
    }

    #[tokio::test]
    async fn test_timeout_duration_approximates_limit() {
        let probe = Arc::new(FakeProbe {
            delay: Duration::from_secs(5),
            ..Default::default()
        });
        let result = checker(1, Duration::from_millis(100), probe)
            .check(LINK)
            .await;

        assert!(!result.valid);
        assert_eq!(result.failure_reason, "request timeout");
        assert!(result.duration_ms >= 100);
        assert!(result.duration_ms < 1000);
    }

    #[tokio::test]
    async fn test_admission_deadline_expires() {
        let probe = Arc::new(FakeProbe {
            delay: Duration::from_millis(500),
            ..Default::default()
        });
        let checker = Arc::new(checker(1, Duration::from_secs(2), probe));

        let busy = {
            let checker = Arc::clone(&checker);
            tokio::spawn(async move { checker.check(LINK).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let deadline = Instant::now() + Duration::from_millis(50);
        let starved = checker.check_with_deadline(LINK, deadline).await;
        assert!(!starved.valid);
        assert_eq!(starved.failure_reason, "request timeout");

        assert!(busy.await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_concurrency_limit_under_load() {
        let probe = Arc::new(FakeProbe {
            delay: Duration::from_millis(20),
            ..Default::default()
        });
        let checker = Arc::new(checker(3, Duration::from_secs(5), Arc::clone(&probe)));

        let checks = (0..20).map(|_| {
            let checker = Arc::clone(&checker);
            tokio::spawn(async move { checker.check(LINK).await })
        });
        for handle in join_all(checks).await {
            assert!(handle.unwrap().valid);
        }

        assert_eq!(probe.calls.load(Ordering::SeqCst), 20);
        assert!(probe.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert!(checker.base().governor().peak_admitted() <= 3);
        assert_eq!(checker.base().governor().admitted(), 0);
    }

    #[tokio::test]
    async fn test_recheck_gives_same_verdict() {
        let probe = Arc::new(FakeProbe::default());
        let checker = checker(1, Duration::from_secs(1), probe);

        let first = checker.check(LINK).await;
        let second = checker.check(LINK).await;
        assert_eq!(first.valid, second.valid);
        assert!(first.valid);
    }

    #[tokio::test]
    async fn test_alias_redirecting_off_platform_fails_without_probe() {
        let probe = Arc::new(FakeProbe::default());
        let parser = ShareLinkParser::new(
            SharePolicy::quark(),
            Arc::new(FixedRedirect("https://evil.example/s/x")),
            Duration::from_secs(1),
        );
        let checker = ShareChecker::new(
            BaseChecker::new(Platform::Quark, 1, Duration::from_secs(1)),
            parser,
            Arc::clone(&probe),
        );

        let result = checker.check("https://pan.qoark.cn/s/short1").await;

        assert!(!result.valid);
        assert_eq!(result.failure_reason, "redirect failure");
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(checker.base().governor().admitted(), 0);
    }

    #[tokio::test]
    async fn test_alias_redirecting_to_canonical_is_probed() {
        let probe = Arc::new(FakeProbe::default());
        let parser = ShareLinkParser::new(
            SharePolicy::quark(),
            Arc::new(FixedRedirect("https://pan.quark.cn/s/39749e1fb630")),
            Duration::from_secs(1),
        );
        let checker = ShareChecker::new(
            BaseChecker::new(Platform::Quark, 1, Duration::from_secs(1)),
            parser,
            Arc::clone(&probe),
        );

        let result = checker.check("https://pan.qoark.cn/s/short1").await;

        assert!(result.valid);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handles_alias_host() {
        let checker = checker(1, Duration::from_secs(1), Arc::new(FakeProbe::default()));
        assert!(checker.handles_host("pan.quark.cn"));
        assert!(checker.handles_host("pan.qoark.cn"));
        assert!(!checker.handles_host("pan.baidu.com"));
        assert_eq!(checker.platform(), Platform::Quark);
    }
}
