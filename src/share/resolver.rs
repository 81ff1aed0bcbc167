//! 别名域名重定向解析
//!
//! 跟随 HTTP 重定向拿到最终 URL，交给解析器按官方域名规则重新校验。
//! 只返回 URL 字符串，不解析路径内容。

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::netdisk::BrowserHeaders;

/// 默认最大重定向次数
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// 重定向解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("重定向请求超时")]
    Timeout,
    #[error("重定向次数过多 (上限 {0})")]
    TooManyRedirects(usize),
    #[error("重定向请求失败: {0}")]
    Network(String),
}

/// 重定向解析接口
#[async_trait]
pub trait RedirectResolve: Send + Sync {
    /// 返回重定向后的最终 URL，整个过程不超过 `timeout`
    async fn resolve(&self, url: &str, timeout: Duration) -> Result<String, ResolveError>;
}

/// 基于 reqwest 的重定向解析器
#[derive(Debug, Clone)]
pub struct HttpRedirectResolver {
    client: Client,
    headers: HeaderMap,
    max_redirects: usize,
}

impl HttpRedirectResolver {
    /// 创建重定向解析器
    ///
    /// # 参数
    /// * `headers` - 浏览器请求头
    /// * `max_redirects` - 最大跳转次数，第 `max_redirects + 1` 次跳转视为失败
    pub fn new(headers: &BrowserHeaders, max_redirects: usize) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::custom(move |attempt| {
                // previous 中第一个是原始 URL，长度即为本次跳转序号
                if attempt.previous().len() > max_redirects {
                    attempt.error(ResolveError::TooManyRedirects(max_redirects))
                } else {
                    attempt.follow()
                }
            }))
            .build()
            .context("Failed to create redirect HTTP client")?;

        Ok(Self {
            client,
            headers: headers.page_headers()?,
            max_redirects,
        })
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }
}

#[async_trait]
impl RedirectResolve for HttpRedirectResolver {
    async fn resolve(&self, url: &str, timeout: Duration) -> Result<String, ResolveError> {
        debug!("跟随重定向: {}", url);

        let request = self.client.get(url).headers(self.headers.clone()).send();

        let response = match tokio::time::timeout(timeout, request).await {
            Err(_) => return Err(ResolveError::Timeout),
            Ok(Err(e)) if e.is_redirect() => {
                warn!("重定向次数过多: {}", url);
                return Err(ResolveError::TooManyRedirects(self.max_redirects));
            }
            Ok(Err(e)) if e.is_timeout() => return Err(ResolveError::Timeout),
            Ok(Err(e)) => return Err(ResolveError::Network(e.to_string())),
            Ok(Ok(response)) => response,
        };

        let final_url = response.url().to_string();
        debug!("重定向完成: {} -> {}", url, final_url);
        Ok(final_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    /// 在 mock 服务器上搭建 `hops` 次跳转的重定向链
    async fn redirect_chain(server: &MockServer, hops: usize) {
        for i in 0..hops {
            let next = server.url(format!("/hop/{}", i + 1));
            server
                .mock_async(move |when, then| {
                    when.method(GET).path(format!("/hop/{}", i));
                    then.status(302).header("Location", next.as_str());
                })
                .await;
        }
        server
            .mock_async(move |when, then| {
                when.method(GET).path(format!("/hop/{}", hops));
                then.status(200).body("ok");
            })
            .await;
    }

    fn resolver() -> HttpRedirectResolver {
        HttpRedirectResolver::new(&BrowserHeaders::quark(), DEFAULT_MAX_REDIRECTS).unwrap()
    }

    #[tokio::test]
    async fn test_follows_redirect_to_final_url() {
        let server = MockServer::start_async().await;
        redirect_chain(&server, 2).await;

        let resolved = resolver()
            .resolve(&server.url("/hop/0"), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(resolved.ends_with("/hop/2"));
    }

    #[tokio::test]
    async fn test_ten_hops_allowed() {
        let server = MockServer::start_async().await;
        redirect_chain(&server, 10).await;

        let resolved = resolver()
            .resolve(&server.url("/hop/0"), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(resolved.ends_with("/hop/10"));
    }

    #[tokio::test]
    async fn test_eleventh_hop_fails() {
        let server = MockServer::start_async().await;
        redirect_chain(&server, 11).await;

        let result = resolver()
            .resolve(&server.url("/hop/0"), Duration::from_secs(5))
            .await;
        assert_eq!(result, Err(ResolveError::TooManyRedirects(10)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200).delay(Duration::from_millis(500));
            })
            .await;

        let result = resolver()
            .resolve(&server.url("/slow"), Duration::from_millis(50))
            .await;
        assert_eq!(result, Err(ResolveError::Timeout));
    }

    #[tokio::test]
    async fn test_sends_browser_user_agent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/s/abc")
                    .header_exists("user-agent")
                    .header_exists("accept");
                then.status(200);
            })
            .await;

        resolver()
            .resolve(&server.url("/s/abc"), Duration::from_secs(5))
            .await
            .unwrap();
        mock.assert_hits_async(1).await;
    }
}
