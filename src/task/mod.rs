// 计划任务模块

pub mod repository;
pub mod types;

pub use repository::{MemoryTaskRepository, TaskRepository};
pub use types::{ExecutionStatus, ScheduledTask, TaskExecution, TaskStatus};
