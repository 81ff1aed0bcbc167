// 任务执行记录存储

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use super::types::TaskExecution;

/// 执行记录存储接口
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 保存执行记录，id 为 0 时分配新 id，返回保存后的 id
    async fn save_execution(&self, execution: &TaskExecution) -> Result<u64>;

    async fn get_execution(&self, id: u64) -> Result<Option<TaskExecution>>;

    /// 按开始时间倒序列出任务的执行记录
    async fn list_executions(&self, task_id: u64) -> Result<Vec<TaskExecution>>;
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryTaskRepository {
    executions: RwLock<HashMap<u64, TaskExecution>>,
    next_id: AtomicU64,
}

impl MemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for MemoryTaskRepository {
    async fn save_execution(&self, execution: &TaskExecution) -> Result<u64> {
        let mut record = execution.clone();
        if record.id == 0 {
            record.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        }

        let id = record.id;
        self.executions.write().await.insert(id, record);
        Ok(id)
    }

    async fn get_execution(&self, id: u64) -> Result<Option<TaskExecution>> {
        Ok(self.executions.read().await.get(&id).cloned())
    }

    async fn list_executions(&self, task_id: u64) -> Result<Vec<TaskExecution>> {
        let mut list: Vec<_> = self
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_assigns_ids() {
        let repo = MemoryTaskRepository::new();
        let first = repo.save_execution(&TaskExecution::start(1, 2)).await.unwrap();
        let second = repo.save_execution(&TaskExecution::start(1, 3)).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);

        let stored = repo.get_execution(second).await.unwrap().unwrap();
        assert_eq!(stored.id, 2);
        assert_eq!(stored.links_count, 3);
        assert!(repo.get_execution(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_updates_existing() {
        let repo = MemoryTaskRepository::new();
        let mut execution = TaskExecution::start(5, 1);
        execution.id = repo.save_execution(&execution).await.unwrap();

        execution.finish(None);
        let id = repo.save_execution(&execution).await.unwrap();
        assert_eq!(id, execution.id);

        let list = repo.list_executions(5).await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].is_finished());
    }

    #[tokio::test]
    async fn test_list_filters_by_task() {
        let repo = MemoryTaskRepository::new();
        repo.save_execution(&TaskExecution::start(1, 0)).await.unwrap();
        repo.save_execution(&TaskExecution::start(2, 0)).await.unwrap();
        repo.save_execution(&TaskExecution::start(1, 0)).await.unwrap();

        let list = repo.list_executions(1).await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|e| e.task_id == 1));
        assert!(list[0].started_at >= list[1].started_at);
        assert!(repo.list_executions(3).await.unwrap().is_empty());
    }
}
