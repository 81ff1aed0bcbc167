//! 夸克网盘分享链接探测
//!
//! 两步请求，线性执行，不重试：
//! 1. 获取 stoken：POST sharepage/token
//! 2. 获取文件列表：GET sharepage/detail
//!
//! 文件列表非空即视为有效

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::headers::BrowserHeaders;
use crate::checker::{
    BaseChecker, CheckFailure, Platform, ProviderProbe, ResourceLocator, ShareChecker,
};
use crate::config::ProviderConfig;
use crate::share::{HttpRedirectResolver, ShareLinkParser, SharePolicy};

/// 获取 stoken 接口
pub const QUARK_TOKEN_URL: &str = "https://drive-h.quark.cn/1/clouddrive/share/sharepage/token";
/// 分享详情（文件列表）接口
pub const QUARK_DETAIL_URL: &str = "https://drive-pc.quark.cn/1/clouddrive/share/sharepage/detail";

/// 夸克网盘检测器
pub type QuarkChecker = ShareChecker<QuarkProbe>;

/// 接口地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarkEndpoints {
    pub token_url: String,
    pub detail_url: String,
}

impl Default for QuarkEndpoints {
    fn default() -> Self {
        Self {
            token_url: QUARK_TOKEN_URL.to_string(),
            detail_url: QUARK_DETAIL_URL.to_string(),
        }
    }
}

/// 获取 stoken 请求体
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    pwd_id: &'a str,
    passcode: &'a str,
    support_visit_limit_private_share: bool,
}

/// 获取 stoken 响应
///
/// 只解析判定需要的字段，其余字段（包括值为 null 的）一律忽略
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenResponse {
    pub status: Option<i64>,
    pub code: Option<i64>,
    pub message: Option<String>,
    pub data: Option<TokenData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenData {
    pub stoken: Option<String>,
}

impl TokenResponse {
    fn is_ok(&self) -> bool {
        self.status.unwrap_or_default() == 200 && self.code.unwrap_or_default() == 0
    }

    fn share_failure(&self) -> CheckFailure {
        CheckFailure::ShareExpiredOrMissing {
            status: self.status.unwrap_or_default(),
            code: self.code.unwrap_or_default(),
            message: self.message.clone().unwrap_or_default(),
        }
    }

    /// 去除空白后的 stoken，缺失时为空
    fn stoken(&self) -> String {
        self.data
            .as_ref()
            .and_then(|d| d.stoken.as_deref())
            .map(|t| t.trim().to_string())
            .unwrap_or_default()
    }
}

/// 分享详情响应
///
/// 文件条目只关心数量，不解析具体字段
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetailResponse {
    pub status: Option<i64>,
    pub code: Option<i64>,
    pub message: Option<String>,
    pub data: Option<DetailData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetailData {
    pub list: Option<Vec<IgnoredAny>>,
}

impl DetailResponse {
    /// 文件条目数
    pub fn entry_count(&self) -> usize {
        self.data
            .as_ref()
            .and_then(|d| d.list.as_ref())
            .map_or(0, Vec::len)
    }
}

/// 夸克网盘探测
#[derive(Debug, Clone)]
pub struct QuarkProbe {
    client: Client,
    endpoints: QuarkEndpoints,
    token_headers: HeaderMap,
    detail_headers: HeaderMap,
}

impl QuarkProbe {
    pub fn new(endpoints: QuarkEndpoints, headers: &BrowserHeaders) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoints,
            token_headers: headers.json_api_headers()?,
            detail_headers: headers.api_headers()?,
        })
    }

    /// 第一步：获取访问令牌 stoken
    async fn request_token(
        &self,
        locator: &ResourceLocator,
        deadline: Instant,
    ) -> Result<String, CheckFailure> {
        let body = TokenRequest {
            pwd_id: &locator.resource_id,
            passcode: &locator.pass_code,
            support_visit_limit_private_share: true,
        };
        let request = self
            .client
            .post(&self.endpoints.token_url)
            .headers(self.token_headers.clone())
            .json(&body);

        let (status, text) = send_before(request, deadline).await?;
        debug!("stoken 响应: status={}, body_len={}", status, text.len());

        if !status.is_success() {
            if let Ok(response) = serde_json::from_str::<TokenResponse>(&text) {
                debug!(
                    "stoken 接口HTTP错误附带业务码: status={:?}, code={:?}, message={:?}",
                    response.status, response.code, response.message
                );
            }
            return Err(CheckFailure::RequestError(format!(
                "API返回错误状态码: {}",
                status
            )));
        }

        let response: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| CheckFailure::RequestError(format!("解析JSON失败: {}", e)))?;

        if !response.is_ok() {
            return Err(response.share_failure());
        }

        let stoken = response.stoken();
        if stoken.is_empty() {
            return Err(CheckFailure::MissingAccessToken);
        }

        Ok(stoken)
    }

    /// 第二步：用 stoken 获取文件列表
    async fn request_detail(
        &self,
        locator: &ResourceLocator,
        stoken: &str,
        deadline: Instant,
    ) -> Result<DetailResponse, CheckFailure> {
        let request = self
            .client
            .get(&self.endpoints.detail_url)
            .headers(self.detail_headers.clone())
            .query(&[("pwd_id", locator.resource_id.as_str()), ("stoken", stoken)]);

        let (status, text) = send_before(request, deadline).await?;
        debug!("详情响应: status={}, body_len={}", status, text.len());

        if !status.is_success() {
            return Err(CheckFailure::RequestError(format!(
                "API返回错误状态码: {}",
                status
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| CheckFailure::RequestError(format!("解析JSON失败: {}", e)))
    }
}

#[async_trait]
impl ProviderProbe for QuarkProbe {
    async fn probe(&self, locator: &ResourceLocator, deadline: Instant) -> Result<(), CheckFailure> {
        let stoken = self.request_token(locator, deadline).await?;
        let detail = self.request_detail(locator, &stoken, deadline).await?;

        if detail.entry_count() == 0 {
            if detail.code.unwrap_or_default() != 0 {
                warn!(
                    "详情接口返回错误: pwd_id={}, code={:?}, message={:?}",
                    locator.resource_id, detail.code, detail.message
                );
            }
            return Err(CheckFailure::EmptyListing);
        }

        debug!(
            "分享文件数: pwd_id={}, count={}",
            locator.resource_id,
            detail.entry_count()
        );
        Ok(())
    }
}

/// 在截止时间前完成请求并读取响应体
///
/// 超时会直接丢弃进行中的请求
async fn send_before(
    request: RequestBuilder,
    deadline: Instant,
) -> Result<(StatusCode, String), CheckFailure> {
    let exchange = async {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok::<_, reqwest::Error>((status, text))
    };

    match tokio::time::timeout_at(deadline, exchange).await {
        Err(_) => Err(CheckFailure::RequestTimeout),
        Ok(Err(e)) if e.is_timeout() => Err(CheckFailure::RequestTimeout),
        Ok(Err(e)) => Err(CheckFailure::RequestError(format!("发送请求失败: {}", e))),
        Ok(Ok(exchanged)) => Ok(exchanged),
    }
}

impl ShareChecker<QuarkProbe> {
    /// 按配置创建夸克网盘检测器
    pub fn quark(config: &ProviderConfig) -> Result<Self> {
        Self::quark_with_endpoints(config, QuarkEndpoints::default())
    }

    pub fn quark_with_endpoints(config: &ProviderConfig, endpoints: QuarkEndpoints) -> Result<Self> {
        config.validate().context("夸克网盘检测配置无效")?;

        let headers = BrowserHeaders::quark();
        let resolver = HttpRedirectResolver::new(&headers, config.max_redirects)?;
        let policy = SharePolicy::quark()
            .with_password_len(config.password_min_len..=config.password_max_len);
        let parser = ShareLinkParser::new(policy, Arc::new(resolver), config.redirect_timeout());
        let probe = QuarkProbe::new(endpoints, &headers)?;
        let base = BaseChecker::new(Platform::Quark, config.concurrency_limit, config.timeout())
            .with_min_interval(config.min_interval())
            .with_admission_timeout(config.admission_timeout());

        Ok(ShareChecker::new(base, parser, probe))
    }
}
