//! Worker Pool - bounds concurrent enrichment calls with a tokio Semaphore.
//!
//! The `WorkerPool` provides:
//! - A fixed number of workers shared by every request
//! - A bounded waiting queue; submissions beyond it are rejected
//! - Per-submission acquire timeout
//! - Pool statistics for the health endpoint

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::error::{BoardError, ErrorCode, Result};

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Maximum number of concurrent workers
    pub max_workers: usize,
    /// Submissions allowed to wait for a worker at once
    pub queue_capacity: usize,
    /// How long a waiting submission may wait for a worker
    pub acquire_timeout: Duration,
    /// Name for this pool (for logging/metrics)
    pub name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 16,
            queue_capacity: 1024,
            acquire_timeout: Duration::from_secs(30),
            name: "default".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A handle to a worker permit that releases when dropped.
pub struct WorkerPermit {
    _permit: OwnedSemaphorePermit,
    pool_stats: Arc<PoolStats>,
    started_at: Instant,
    completed: bool,
}

impl WorkerPermit {
    fn new(permit: OwnedSemaphorePermit, pool_stats: Arc<PoolStats>) -> Self {
        Self {
            _permit: permit,
            pool_stats,
            started_at: Instant::now(),
            completed: false,
        }
    }

    /// Mark this execution as successful.
    pub fn mark_success(mut self) {
        self.completed = true;
        self.pool_stats.record_success(self.started_at.elapsed());
    }

    /// Mark this execution as failed.
    pub fn mark_failure(mut self) {
        self.completed = true;
        self.pool_stats.record_failure(self.started_at.elapsed());
    }
}

impl Drop for WorkerPermit {
    fn drop(&mut self) {
        // Dropped without an outcome, e.g. the task was aborted
        if !self.completed {
            self.pool_stats.record_unknown();
        }
    }
}

/// Internal statistics tracking.
struct PoolStats {
    tasks_submitted: AtomicU64,
    tasks_succeeded: AtomicU64,
    tasks_failed: AtomicU64,
    /// Permit dropped without marking
    tasks_unknown: AtomicU64,
    /// Rejected because the waiting queue was full
    tasks_rejected: AtomicU64,
    /// Total time waiting for permits (microseconds)
    total_wait_time_us: AtomicU64,
    /// Total execution time (microseconds)
    total_exec_time_us: AtomicU64,
    peak_concurrent: AtomicUsize,
    current_concurrent: AtomicUsize,
    /// Submissions currently waiting for a permit
    waiting: AtomicUsize,
    acquire_timeouts: AtomicU64,
}

impl PoolStats {
    fn new() -> Self {
        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_succeeded: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tasks_unknown: AtomicU64::new(0),
            tasks_rejected: AtomicU64::new(0),
            total_wait_time_us: AtomicU64::new(0),
            total_exec_time_us: AtomicU64::new(0),
            peak_concurrent: AtomicUsize::new(0),
            current_concurrent: AtomicUsize::new(0),
            waiting: AtomicUsize::new(0),
            acquire_timeouts: AtomicU64::new(0),
        }
    }

    fn record_submit(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_acquire(&self, wait_time: Duration) {
        self.total_wait_time_us
            .fetch_add(wait_time.as_micros() as u64, Ordering::Relaxed);
        let current = self.current_concurrent.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_concurrent.fetch_max(current, Ordering::Relaxed);
    }

    fn record_release(&self) {
        self.current_concurrent.fetch_sub(1, Ordering::Relaxed);
    }

    fn record_success(&self, duration: Duration) {
        self.tasks_succeeded.fetch_add(1, Ordering::Relaxed);
        self.record_duration(duration);
        self.record_release();
    }

    fn record_failure(&self, duration: Duration) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        self.record_duration(duration);
        self.record_release();
    }

    fn record_unknown(&self) {
        self.tasks_unknown.fetch_add(1, Ordering::Relaxed);
        self.record_release();
    }

    fn record_rejected(&self) {
        self.tasks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn record_timeout(&self) {
        self.acquire_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_duration(&self, duration: Duration) {
        self.total_exec_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }
}

/// Holds one slot of the waiting queue until dropped.
struct QueueSlot<'a>(&'a AtomicUsize);

impl<'a> QueueSlot<'a> {
    fn claim(waiting: &'a AtomicUsize, capacity: usize) -> Option<Self> {
        waiting
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            })
            .ok()
            .map(|_| Self(waiting))
    }
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The cloneable part of a pool that spawned tasks carry with them.
#[derive(Clone)]
struct PoolShared {
    name: Arc<str>,
    queue_capacity: usize,
    acquire_timeout: Duration,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
}

impl PoolShared {
    async fn acquire(&self) -> Result<WorkerPermit> {
        self.stats.record_submit();

        // Fast path: a worker is free, no queueing involved
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            self.stats.record_acquire(Duration::ZERO);
            return Ok(WorkerPermit::new(permit, self.stats.clone()));
        }

        let Some(_slot) = QueueSlot::claim(&self.stats.waiting, self.queue_capacity) else {
            self.stats.record_rejected();
            tracing::warn!(
                pool_name = %self.name,
                queue_capacity = self.queue_capacity,
                "Worker pool saturated, rejecting submission"
            );
            return Err(BoardError::new(
                ErrorCode::PoolSaturated,
                format!("Worker pool '{}' is saturated", self.name),
            )
            .with_context("queue_capacity", self.queue_capacity));
        };

        let start = Instant::now();
        let permit = tokio::time::timeout(self.acquire_timeout, self.semaphore.clone().acquire_owned())
            .await
            .map_err(|_| {
                self.stats.record_timeout();
                tracing::warn!(
                    pool_name = %self.name,
                    timeout_ms = self.acquire_timeout.as_millis() as u64,
                    "Worker permit acquire timed out"
                );
                BoardError::new(
                    ErrorCode::PoolAcquireTimeout,
                    format!(
                        "Worker pool '{}' acquire timeout after {}ms",
                        self.name,
                        self.acquire_timeout.as_millis()
                    ),
                )
            })?
            .map_err(|_| BoardError::internal(format!("Worker pool '{}' semaphore closed", self.name)))?;

        let wait_time = start.elapsed();
        self.stats.record_acquire(wait_time);

        tracing::debug!(
            pool_name = %self.name,
            wait_time_ms = wait_time.as_millis() as u64,
            available = self.semaphore.available_permits(),
            "Worker permit acquired"
        );

        Ok(WorkerPermit::new(permit, self.stats.clone()))
    }
}

/// Manages a pool of concurrent workers using tokio Semaphore.
///
/// One pool is created at startup and shared by every request, so the
/// concurrency bound holds across simultaneous pages.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    shared: PoolShared,
    created_at: Instant,
}

impl WorkerPool {
    /// Create a new worker pool.
    pub fn new(config: WorkerPoolConfig) -> Self {
        let max_workers = config.max_workers.max(1);

        tracing::info!(
            pool_name = %config.name,
            max_workers,
            queue_capacity = config.queue_capacity,
            "Worker pool created"
        );

        let shared = PoolShared {
            name: Arc::from(config.name.as_str()),
            queue_capacity: config.queue_capacity,
            acquire_timeout: config.acquire_timeout,
            semaphore: Arc::new(Semaphore::new(max_workers)),
            stats: Arc::new(PoolStats::new()),
        };

        Self {
            config: WorkerPoolConfig { max_workers, ..config },
            shared,
            created_at: Instant::now(),
        }
    }

    /// Create a worker pool with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(WorkerPoolConfig::default())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn max_workers(&self) -> usize {
        self.config.max_workers
    }

    pub fn available_permits(&self) -> usize {
        self.shared.semaphore.available_permits()
    }

    pub fn active_workers(&self) -> usize {
        self.config.max_workers - self.available_permits()
    }

    /// Submissions currently waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.stats.waiting.load(Ordering::Acquire)
    }

    pub fn is_at_capacity(&self) -> bool {
        self.available_permits() == 0
    }

    /// Acquire a worker permit.
    ///
    /// Fails with `PoolSaturated` when the waiting queue is full and with
    /// `PoolAcquireTimeout` when no worker frees up in time.
    pub async fn acquire(&self) -> Result<WorkerPermit> {
        self.shared.acquire().await
    }

    /// Run a future on the pool.
    ///
    /// The task waits for a worker, holds it for the lifetime of the future,
    /// and releases it on completion or abort.
    pub fn submit<F, T>(&self, future: F) -> JoinHandle<Result<T>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let shared = self.shared.clone();

        tokio::spawn(async move {
            let permit = shared.acquire().await?;
            let result = future.await;

            match &result {
                Ok(_) => permit.mark_success(),
                Err(_) => permit.mark_failure(),
            }

            result
        })
    }

    /// Get pool statistics.
    pub fn stats(&self) -> WorkerPoolStats {
        let stats = &self.shared.stats;
        let tasks_submitted = stats.tasks_submitted.load(Ordering::Relaxed);
        let tasks_succeeded = stats.tasks_succeeded.load(Ordering::Relaxed);
        let tasks_failed = stats.tasks_failed.load(Ordering::Relaxed);
        let total_completed = tasks_succeeded + tasks_failed;

        let avg_wait_time_us = if tasks_submitted > 0 {
            stats.total_wait_time_us.load(Ordering::Relaxed) / tasks_submitted
        } else {
            0
        };

        let avg_exec_time_us = if total_completed > 0 {
            stats.total_exec_time_us.load(Ordering::Relaxed) / total_completed
        } else {
            0
        };

        WorkerPoolStats {
            name: self.config.name.clone(),
            max_workers: self.config.max_workers,
            queue_capacity: self.config.queue_capacity,
            available_permits: self.available_permits(),
            active_workers: self.active_workers(),
            queued: self.queued(),
            tasks_submitted,
            tasks_succeeded,
            tasks_failed,
            tasks_unknown: stats.tasks_unknown.load(Ordering::Relaxed),
            tasks_rejected: stats.tasks_rejected.load(Ordering::Relaxed),
            acquire_timeouts: stats.acquire_timeouts.load(Ordering::Relaxed),
            peak_concurrent: stats.peak_concurrent.load(Ordering::Relaxed),
            avg_wait_time_us,
            avg_exec_time_us,
            uptime_secs: self.created_at.elapsed().as_secs(),
        }
    }

    /// Unhealthy when more than a tenth of submissions were turned away.
    pub fn is_healthy(&self) -> bool {
        let stats = self.stats();
        if stats.tasks_submitted == 0 {
            return true;
        }
        let turned_away = (stats.acquire_timeouts + stats.tasks_rejected) as f64;
        turned_away / (stats.tasks_submitted as f64) < 0.1
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Statistics for the worker pool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPoolStats {
    pub name: String,
    pub max_workers: usize,
    pub queue_capacity: usize,
    pub available_permits: usize,
    pub active_workers: usize,
    /// Submissions waiting for a worker right now
    pub queued: usize,
    pub tasks_submitted: u64,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    pub tasks_unknown: u64,
    pub tasks_rejected: u64,
    pub acquire_timeouts: u64,
    pub peak_concurrent: usize,
    /// Average wait time for permits (microseconds)
    pub avg_wait_time_us: u64,
    /// Average execution time (microseconds)
    pub avg_exec_time_us: u64,
    pub uptime_secs: u64,
}

impl WorkerPoolStats {
    /// Success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        let total = self.tasks_succeeded + self.tasks_failed;
        if total == 0 {
            100.0
        } else {
            (self.tasks_succeeded as f64 / total as f64) * 100.0
        }
    }

    /// Utilization as a percentage.
    pub fn utilization(&self) -> f64 {
        ((self.max_workers - self.available_permits) as f64 / self.max_workers as f64) * 100.0
    }
}
