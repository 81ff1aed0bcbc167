// 检测器注册表：按链接域名分发到对应平台的检测器

use anyhow::Result;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::error::{CheckFailure, FormatError};
use super::types::{CheckResult, Platform};
use super::LinkChecker;
use crate::config::CheckerConfig;
use crate::netdisk::QuarkChecker;

/// 检测器注册表
///
/// 每个平台一个检测器实例，各自持有独立的限流器
#[derive(Default, Clone)]
pub struct CheckerRegistry {
    checkers: HashMap<Platform, Arc<dyn LinkChecker>>,
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按配置创建所有启用的平台检测器
    pub fn from_config(config: &CheckerConfig) -> Result<Self> {
        let mut registry = Self::new();
        if config.quark.enabled {
            registry.register(Arc::new(QuarkChecker::quark(&config.quark)?));
        }
        info!("已启用检测平台: {:?}", registry.platforms());
        Ok(registry)
    }

    /// 注册检测器，同一平台重复注册时替换旧实例
    pub fn register(&mut self, checker: Arc<dyn LinkChecker>) {
        self.checkers.insert(checker.platform(), checker);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn LinkChecker>> {
        self.checkers.get(&platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<_> = self.checkers.keys().copied().collect();
        platforms.sort_by_key(|p| p.name());
        platforms
    }

    /// 根据链接域名找到对应平台的检测器
    pub fn detect(&self, link: &str) -> Result<Arc<dyn LinkChecker>, FormatError> {
        let url = Url::parse(link.trim()).map_err(|_| FormatError::BadLinkFormat)?;
        let host = url.host_str().ok_or(FormatError::BadLinkFormat)?;

        self.checkers
            .values()
            .find(|checker| checker.handles_host(host))
            .cloned()
            .ok_or(FormatError::UnsupportedHost)
    }

    /// 检测单条链接
    pub async fn check(&self, link: &str) -> CheckResult {
        match self.detect(link) {
            Ok(checker) => checker.check(link).await,
            Err(e) => {
                debug!("无法识别链接所属平台: {}, 原因: {}", link, e);
                CheckResult::invalid(&CheckFailure::Format(e), Duration::ZERO)
            }
        }
    }
}
