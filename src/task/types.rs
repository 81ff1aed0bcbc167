// 计划任务与执行记录
//
// 调度与持久化在检测引擎之外，这里只定义数据结构和执行统计

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checker::CheckResult;

/// 计划任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Stopped,
    Expired,
}

/// 计划任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: u64,
    /// 任务名称
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 标签
    #[serde(default)]
    pub tags: Vec<String>,
    /// 获取待检测链接的命令
    pub link_source_command: String,
    /// 数据转换脚本
    #[serde(default)]
    pub transform_script: String,
    /// Cron 表达式
    pub cron_expression: String,
    /// 自动销毁时间
    pub auto_destroy_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
}

/// 任务执行记录
///
/// 汇总一次执行中所有链接的检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskExecution {
    /// 由存储层分配，未保存时为 0
    pub id: u64,
    pub task_id: u64,
    pub status: ExecutionStatus,
    /// 获取到的链接数量
    pub links_count: u64,
    /// 已检测链接数量
    pub checked_count: u64,
    pub valid_count: u64,
    pub invalid_count: u64,
    #[serde(default)]
    pub error_message: String,
    /// 执行耗时（毫秒）
    pub execution_duration_ms: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskExecution {
    /// 开始一次执行
    pub fn start(task_id: u64, links_count: u64) -> Self {
        Self {
            id: 0,
            task_id,
            status: ExecutionStatus::Running,
            links_count,
            checked_count: 0,
            valid_count: 0,
            invalid_count: 0,
            error_message: String::new(),
            execution_duration_ms: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// 记录一条检测结果
    pub fn record(&mut self, result: &CheckResult) {
        self.checked_count += 1;
        if result.valid {
            self.valid_count += 1;
        } else {
            self.invalid_count += 1;
        }
    }

    /// 结束执行，`error` 为 None 表示成功
    pub fn finish(&mut self, error: Option<String>) {
        let finished_at = Utc::now();
        self.execution_duration_ms = Some(
            finished_at
                .signed_duration_since(self.started_at)
                .num_milliseconds()
                .max(0),
        );
        self.finished_at = Some(finished_at);

        match error {
            Some(message) => {
                self.status = ExecutionStatus::Failed;
                self.error_message = message;
            }
            None => self.status = ExecutionStatus::Success,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status != ExecutionStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{CheckFailure, FormatError};
    use std::time::Duration as StdDuration;

    #[test]
    fn test_execution_counts() {
        let mut execution = TaskExecution::start(7, 3);
        execution.record(&CheckResult::valid(StdDuration::from_millis(5)));
        execution.record(&CheckResult::invalid(
            &CheckFailure::Format(FormatError::UnsupportedHost),
            StdDuration::ZERO,
        ));
        execution.record(&CheckResult::invalid(
            &CheckFailure::EmptyListing,
            StdDuration::ZERO,
        ));

        assert_eq!(execution.checked_count, 3);
        assert_eq!(execution.valid_count, 1);
        assert_eq!(execution.invalid_count, 2);
        assert!(!execution.is_finished());

        execution.finish(None);
        assert_eq!(execution.status, ExecutionStatus::Success);
        assert!(execution.finished_at.is_some());
        assert!(execution.execution_duration_ms.unwrap() >= 0);
    }

    #[test]
    fn test_failed_execution_keeps_message() {
        let mut execution = TaskExecution::start(1, 0);
        execution.finish(Some("获取链接失败".to_string()));
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(execution.error_message, "获取链接失败");
    }

    #[test]
    fn test_scheduled_task_deserializes_with_defaults() {
        let task: ScheduledTask = serde_json::from_str(
            r#"{
                "id": 1,
                "name": "nightly",
                "link_source_command": "cat links.txt",
                "cron_expression": "0 3 * * *",
                "auto_destroy_at": null,
                "status": "active",
                "last_run_at": null,
                "next_run_at": null,
                "created_at": "2024-05-01T00:00:00Z",
                "updated_at": "2024-05-01T00:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(task.status, TaskStatus::Active);
        assert!(task.tags.is_empty());
        assert!(task.description.is_empty());
        assert!(task.auto_destroy_at.is_none());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::Running).unwrap(),
            "\"running\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Expired).unwrap(),
            "\"expired\""
        );
    }
}
