// 分享链接模块
//
// 链接格式校验、资源ID/提取码提取，以及别名域名的重定向解析

pub mod parser;
pub mod resolver;

pub use parser::{ShareLinkParser, SharePolicy};
pub use resolver::{HttpRedirectResolver, RedirectResolve, ResolveError, DEFAULT_MAX_REDIRECTS};
