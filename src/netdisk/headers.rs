// 浏览器请求头
//
// 网盘接口会拒绝缺少浏览器特征的请求，所有请求都需带上这些头

use anyhow::{Context, Result};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE,
    ORIGIN, PRAGMA, REFERER, USER_AGENT,
};

/// 默认 PC 浏览器 User-Agent
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 浏览器请求头配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserHeaders {
    pub user_agent: String,
    pub accept_language: String,
    /// 网盘 Web 前端地址
    pub origin: String,
    pub referer: String,
}

impl BrowserHeaders {
    /// 夸克网盘 Web 端请求头
    pub fn quark() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "zh-CN,zh;q=0.9".to_string(),
            origin: "https://pan.quark.cn".to_string(),
            referer: "https://pan.quark.cn/".to_string(),
        }
    }

    /// 访问网页（跟随重定向）用的请求头
    pub fn page_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        insert(&mut headers, USER_AGENT, &self.user_agent)?;
        insert(
            &mut headers,
            ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )?;
        insert(&mut headers, ACCEPT_LANGUAGE, &self.accept_language)?;
        Ok(headers)
    }

    /// 调用网盘 API 用的请求头
    pub fn api_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        insert(&mut headers, USER_AGENT, &self.user_agent)?;
        insert(&mut headers, ACCEPT, "application/json, text/plain, */*")?;
        insert(&mut headers, ACCEPT_LANGUAGE, &self.accept_language)?;
        insert(&mut headers, CACHE_CONTROL, "no-cache")?;
        insert(&mut headers, PRAGMA, "no-cache")?;
        insert(&mut headers, ORIGIN, &self.origin)?;
        insert(&mut headers, REFERER, &self.referer)?;
        Ok(headers)
    }

    /// 以 JSON 提交的 API 请求头
    pub fn json_api_headers(&self) -> Result<HeaderMap> {
        let mut headers = self.api_headers()?;
        insert(&mut headers, CONTENT_TYPE, "application/json")?;
        Ok(headers)
    }
}

impl Default for BrowserHeaders {
    fn default() -> Self {
        Self::quark()
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
    let header_value = HeaderValue::from_str(value)
        .with_context(|| format!("无效的请求头 {}: {:?}", name, value))?;
    headers.insert(name, header_value);
    Ok(())
}
