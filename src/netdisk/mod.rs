// 网盘平台模块
//
// 每个平台提供自己的探测实现，共用浏览器请求头配置

pub mod headers;
pub mod quark;

pub use headers::{BrowserHeaders, DEFAULT_USER_AGENT};
pub use quark::{QuarkChecker, QuarkEndpoints, QuarkProbe};
