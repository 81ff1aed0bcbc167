// 批量检测
//
// 一次执行中的所有链接并发检测，各平台的限流器仍然生效

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::checker::{CheckResult, CheckerRegistry};
use crate::task::{TaskExecution, TaskRepository};

/// 单条链接的检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOutcome {
    pub link: String,
    #[serde(flatten)]
    pub result: CheckResult,
}

/// 一次批量检测的结果
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub execution: TaskExecution,
    /// 与输入顺序一致（去重后）
    pub results: Vec<LinkOutcome>,
}

impl BatchOutcome {
    pub fn invalid(&self) -> impl Iterator<Item = &LinkOutcome> {
        self.results.iter().filter(|o| !o.result.valid)
    }

    pub fn all_valid(&self) -> bool {
        self.execution.invalid_count == 0
    }
}

/// 去掉空行和重复链接，保持首次出现的顺序
pub fn dedupe_links<I, S>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    links
        .into_iter()
        .map(|l| l.as_ref().trim().to_string())
        .filter(|l| !l.is_empty())
        .filter(|l| seen.insert(l.clone()))
        .collect()
}

/// 批量检测链接
///
/// `max_in_flight` 只限制同时存在的检测任务数，真正的请求并发由各平台限流器控制
pub async fn check_batch<I, S>(
    registry: &CheckerRegistry,
    task_id: u64,
    links: I,
    max_in_flight: usize,
) -> BatchOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let links = dedupe_links(links);
    let mut execution = TaskExecution::start(task_id, links.len() as u64);
    info!("开始批量检测: task_id={}, 链接数={}", task_id, links.len());

    let mut results: Vec<(usize, LinkOutcome)> = stream::iter(links.into_iter().enumerate())
        .map(|(index, link)| async move {
            let result = registry.check(&link).await;
            (index, LinkOutcome { link, result })
        })
        .buffer_unordered(max_in_flight.max(1))
        .collect()
        .await;
    results.sort_by_key(|(index, _)| *index);

    let results: Vec<LinkOutcome> = results.into_iter().map(|(_, outcome)| outcome).collect();
    for outcome in &results {
        execution.record(&outcome.result);
    }
    execution.finish(None);

    info!(
        "批量检测完成: task_id={}, 有效={}, 无效={}, 耗时={:?}ms",
        task_id, execution.valid_count, execution.invalid_count, execution.execution_duration_ms
    );

    BatchOutcome { execution, results }
}

/// 执行批量检测并保存执行记录
///
/// 检测开始前先保存一条 running 记录，结束后更新
pub async fn run_execution<I, S>(
    registry: &CheckerRegistry,
    repository: &dyn TaskRepository,
    task_id: u64,
    links: I,
    max_in_flight: usize,
) -> Result<BatchOutcome>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let links = dedupe_links(links);
    let pending = TaskExecution::start(task_id, links.len() as u64);
    let id = repository
        .save_execution(&pending)
        .await
        .context("保存执行记录失败")?;

    let mut outcome = check_batch(registry, task_id, links, max_in_flight).await;
    outcome.execution.id = id;

    if let Err(e) = repository.save_execution(&outcome.execution).await {
        warn!("更新执行记录失败: id={}, 错误: {:#}", id, e);
        return Err(e.context("更新执行记录失败"));
    }

    Ok(outcome)
}
