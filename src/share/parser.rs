// 分享链接解析
//
// 支持的链接格式：
// - https://pan.quark.cn/s/{pwd_id}
// - https://pan.quark.cn/s/{pwd_id}?pwd={password}
// - https://pan.quark.cn/s/{pwd_id}#/list/share
// - https://pan.qoark.cn/s/{short_code}（别名域名，重定向后才能拿到真实 pwd_id）

use reqwest::Url;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::resolver::RedirectResolve;
use crate::checker::{FormatError, Platform, ResourceLocator};

/// 分享链接规则
///
/// 域名、路径标记、提取码参数和长度限制都按平台配置
#[derive(Debug, Clone)]
pub struct SharePolicy {
    /// 官方域名
    pub canonical_hosts: Vec<String>,
    /// 别名域名（会重定向到官方域名）
    pub alias_hosts: Vec<String>,
    /// 分享路径前缀
    pub share_marker: String,
    /// 提取码查询参数名
    pub password_param: String,
    /// 提取码长度范围（字符数）
    pub password_len: RangeInclusive<usize>,
}

impl SharePolicy {
    /// 夸克网盘链接规则
    pub fn quark() -> Self {
        let (canonical, aliases) = Platform::Quark.hosts().split_at(1);
        Self {
            canonical_hosts: canonical.iter().map(|h| h.to_string()).collect(),
            alias_hosts: aliases.iter().map(|h| h.to_string()).collect(),
            share_marker: "/s/".to_string(),
            password_param: "pwd".to_string(),
            password_len: 2..=50,
        }
    }

    pub fn with_password_len(mut self, password_len: RangeInclusive<usize>) -> Self {
        self.password_len = password_len;
        self
    }

    pub fn is_canonical(&self, host: &str) -> bool {
        self.canonical_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    pub fn is_alias(&self, host: &str) -> bool {
        self.alias_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    /// 官方域名或别名域名
    pub fn accepts_host(&self, host: &str) -> bool {
        self.is_canonical(host) || self.is_alias(host)
    }

    /// 从路径中提取资源ID
    ///
    /// `strict` 为 true 时资源ID之后不允许再有路径段（末尾斜杠除外）
    fn resource_id(&self, path: &str, strict: bool) -> Result<String, FormatError> {
        let rest = path
            .strip_prefix(self.share_marker.as_str())
            .ok_or(FormatError::BadLinkFormat)?;

        let mut segments = rest.split('/');
        let id = segments.next().unwrap_or_default().trim();
        if strict && segments.any(|s| !s.is_empty()) {
            return Err(FormatError::BadLinkFormat);
        }
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FormatError::MissingResourceId);
        }

        Ok(id.to_string())
    }

    /// 读取提取码（去除首尾空白，不存在时为空）
    fn password(&self, url: &Url) -> String {
        url.query_pairs()
            .find(|(key, _)| key == self.password_param.as_str())
            .map(|(_, value)| value.trim().to_string())
            .unwrap_or_default()
    }

    /// 查询参数中是否有提取码以外的参数
    fn has_extra_query(&self, url: &Url) -> bool {
        url.query_pairs()
            .any(|(key, _)| key != self.password_param.as_str())
    }

    fn check_password(&self, password: &str) -> Result<(), FormatError> {
        if password.is_empty() || self.password_len.contains(&password.chars().count()) {
            Ok(())
        } else {
            Err(FormatError::InvalidPasswordLength)
        }
    }
}

/// 分享链接解析器
pub struct ShareLinkParser {
    policy: SharePolicy,
    resolver: Arc<dyn RedirectResolve>,
    /// 别名重定向超时，与单次检测超时相互独立
    redirect_timeout: Duration,
}

impl ShareLinkParser {
    pub fn new(
        policy: SharePolicy,
        resolver: Arc<dyn RedirectResolve>,
        redirect_timeout: Duration,
    ) -> Self {
        Self {
            policy,
            resolver,
            redirect_timeout,
        }
    }

    pub fn policy(&self) -> &SharePolicy {
        &self.policy
    }

    /// 解析分享链接，提取资源ID和提取码
    pub async fn parse(&self, raw_url: &str) -> Result<ResourceLocator, FormatError> {
        let url = Url::parse(raw_url.trim()).map_err(|e| {
            debug!("URL解析失败: {}, 错误: {}", raw_url, e);
            FormatError::BadLinkFormat
        })?;

        if url.scheme() != "https" {
            return Err(FormatError::BadScheme);
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if !self.policy.accepts_host(&host) {
            return Err(FormatError::UnsupportedHost);
        }

        if !url.username().is_empty()
            || url.password().is_some()
            || url.port().is_some()
            || self.policy.has_extra_query(&url)
        {
            return Err(FormatError::BadLinkFormat);
        }

        let mut resource_id = self.policy.resource_id(url.path(), true)?;
        let mut pass_code = self.policy.password(&url);

        if self.policy.is_alias(&host) {
            let (resolved_id, resolved_password) = self.follow_alias(&url).await?;
            resource_id = resolved_id;
            // 重定向后的 URL 也带提取码时以其为准
            if !resolved_password.is_empty() {
                pass_code = resolved_password;
            }
        }

        self.policy.check_password(&pass_code)?;

        Ok(ResourceLocator {
            resource_id,
            pass_code,
        })
    }

    /// 别名域名：重定向到官方域名后提取真实资源ID
    async fn follow_alias(&self, url: &Url) -> Result<(String, String), FormatError> {
        let resolved = self
            .resolver
            .resolve(url.as_str(), self.redirect_timeout)
            .await
            .map_err(|e| {
                warn!("别名链接重定向失败: {}, 错误: {}", url, e);
                FormatError::RedirectFailure
            })?;

        let target = Url::parse(&resolved).map_err(|_| FormatError::RedirectFailure)?;
        let target_host = target.host_str().unwrap_or_default();
        if target.scheme() != "https" || !self.policy.is_canonical(target_host) {
            warn!("重定向后的域名不正确: {} -> {}", url, resolved);
            return Err(FormatError::RedirectFailure);
        }

        let resource_id = self
            .policy
            .resource_id(target.path(), false)
            .map_err(|_| FormatError::RedirectFailure)?;

        Ok((resource_id, self.policy.password(&target)))
    }
}
