//! 平台限流器
//!
//! 每个平台一个实例，同时限制：
//! 1. 并发检测数（信号量）
//! 2. 相邻两次放行的最小间隔（互斥保护的下一次可放行时间点）
//!
//! 不同平台之间互不影响

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::debug;

use super::types::Platform;

/// 平台限流器
#[derive(Debug)]
pub struct RateGovernor {
    platform: Platform,
    /// 最大并发检测数
    concurrency_limit: usize,
    /// 相邻放行的最小间隔
    min_interval: Duration,
    semaphore: Arc<Semaphore>,
    /// 下一次可放行的时间点
    next_slot: Mutex<Option<Instant>>,
    /// 当前已放行（持有许可）的检测数
    admitted: Arc<AtomicUsize>,
    /// 历史最大同时放行数
    peak_admitted: Arc<AtomicUsize>,
}

impl RateGovernor {
    /// 创建限流器
    ///
    /// `concurrency_limit` 为 0 时按 1 处理
    pub fn new(platform: Platform, concurrency_limit: usize, min_interval: Duration) -> Self {
        let concurrency_limit = concurrency_limit.max(1);
        debug!(
            "创建限流器: platform={}, 并发上限={}, 最小间隔={:?}",
            platform, concurrency_limit, min_interval
        );

        Self {
            platform,
            concurrency_limit,
            min_interval,
            semaphore: Arc::new(Semaphore::new(concurrency_limit)),
            next_slot: Mutex::new(None),
            admitted: Arc::new(AtomicUsize::new(0)),
            peak_admitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// 当前已放行的检测数
    pub fn admitted(&self) -> usize {
        self.admitted.load(Ordering::SeqCst)
    }

    /// 历史最大同时放行数
    pub fn peak_admitted(&self) -> usize {
        self.peak_admitted.load(Ordering::SeqCst)
    }

    /// 等待放行
    ///
    /// 不会失败，只会延迟。返回的许可被 drop 时释放并发槽位。
    /// 调用方需自行用超时包裹，避免无限等待。
    pub async fn admit(&self) -> AdmitPermit {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("governor semaphore is never closed");

        let current = self.admitted.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_admitted.fetch_max(current, Ordering::SeqCst);
        let admit_permit = AdmitPermit {
            _permit: permit,
            admitted: Arc::clone(&self.admitted),
        };

        // 放行时才占用时间点
        while let Err(wait_until) = self.try_claim_slot() {
            debug!(
                "[{}] 频率限制，等待 {:?}",
                self.platform,
                wait_until.saturating_duration_since(Instant::now())
            );
            tokio::time::sleep_until(wait_until).await;
        }

        admit_permit
    }

    /// 尝试占用当前时间点，未到下一个可放行时间点时返回该时间点
    fn try_claim_slot(&self) -> Result<(), Instant> {
        let mut next_slot = self.next_slot.lock();
        let now = Instant::now();
        match *next_slot {
            Some(at) if at > now => Err(at),
            _ => {
                *next_slot = Some(now + self.min_interval);
                Ok(())
            }
        }
    }
}

/// 放行许可（RAII）
///
/// drop 时释放并发槽位
#[derive(Debug)]
pub struct AdmitPermit {
    _permit: OwnedSemaphorePermit,
    admitted: Arc<AtomicUsize>,
}

impl Drop for AdmitPermit {
    fn drop(&mut self) {
        self.admitted.fetch_sub(1, Ordering::SeqCst);
    }
}
