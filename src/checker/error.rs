// 检测错误类型
//
// 所有错误最终都会被转换为 CheckResult 中的失效原因，不会抛给调用方

use thiserror::Error;

/// 链接格式错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    /// 无法解析，或包含多余的组成部分（端口、用户信息、多余路径）
    #[error("bad link format")]
    BadLinkFormat,
    #[error("bad scheme")]
    BadScheme,
    #[error("unsupported host")]
    UnsupportedHost,
    #[error("missing resource id")]
    MissingResourceId,
    #[error("invalid password length")]
    InvalidPasswordLength,
    /// 别名域名重定向失败或重定向到非官方域名
    #[error("redirect failure")]
    RedirectFailure,
}

/// 检测失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckFailure {
    #[error(transparent)]
    Format(#[from] FormatError),

    /// 单次检测超时（包括等待限流放行超时）
    #[error("request timeout")]
    RequestTimeout,

    /// 其他网络或HTTP层错误，详情仅用于日志
    #[error("request error")]
    RequestError(String),

    /// 平台返回的 status/code 表示分享已失效或不存在
    #[error("share expired or missing")]
    ShareExpiredOrMissing {
        status: i64,
        code: i64,
        message: String,
    },

    #[error("missing access token")]
    MissingAccessToken,

    #[error("empty listing")]
    EmptyListing,
}

impl CheckFailure {
    /// 日志用的详细描述
    pub fn detail(&self) -> String {
        match self {
            CheckFailure::RequestError(detail) => format!("request error: {}", detail),
            CheckFailure::ShareExpiredOrMissing {
                status,
                code,
                message,
            } => format!(
                "share expired or missing: status={}, code={}, message={}",
                status, code, message
            ),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_is_transparent() {
        let failure: CheckFailure = FormatError::RedirectFailure.into();
        assert_eq!(failure.to_string(), "redirect failure");
        assert_eq!(failure, CheckFailure::Format(FormatError::RedirectFailure));
    }

    #[test]
    fn test_request_error_hides_detail_in_reason() {
        let failure = CheckFailure::RequestError("HTTP 502".to_string());
        assert_eq!(failure.to_string(), "request error");
        assert_eq!(failure.detail(), "request error: HTTP 502");
    }

    #[test]
    fn test_share_expired_detail() {
        let failure = CheckFailure::ShareExpiredOrMissing {
            status: 404,
            code: 41004,
            message: "分享不存在".to_string(),
        };
        assert_eq!(failure.to_string(), "share expired or missing");
        assert!(failure.detail().contains("code=41004"));
    }
}
