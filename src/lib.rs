// Netdisk Share Link Checker Library
// 网盘分享链接有效性检测核心库

// 检测器模块（限流、检测流程、平台注册表）
pub mod checker;

// 配置管理模块
pub mod config;

// 日志系统
pub mod logging;

// 分享链接解析与重定向
pub mod share;

// 网盘平台探测模块
pub mod netdisk;

// 批量检测
pub mod batch;

// 计划任务记录
pub mod task;

// 导出常用类型
pub use batch::{check_batch, run_execution, BatchOutcome, LinkOutcome};
pub use checker::{
    CheckFailure, CheckResult, CheckerRegistry, FormatError, LinkChecker, Platform, RateGovernor,
    ResourceLocator,
};
pub use config::AppConfig;
pub use netdisk::QuarkChecker;
pub use share::ShareLinkParser;
pub use task::{MemoryTaskRepository, TaskExecution, TaskRepository};
