//! Bounded concurrency slots for date tasks.
//!
//! # Design
//! - A semaphore of size K hands out owned permits; the dispatch loop waits
//!   for one before spawning a task.
//! - The gauge is raised after the permit is held and lowered before it is
//!   released, so it never reads above K.
//! - Releasing happens in `Drop`, which also runs when a task panics.
//! - Counter changes and gauge publishes happen under one lock, so the
//!   exported gauges always end on the latest counts.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use trove_telemetry::Metrics;

use crate::error::{BatchError, BatchResult};

#[derive(Debug, Default)]
struct SlotGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
    publish: Mutex<()>,
}

/// Fixed-size pool of concurrency slots.
#[derive(Clone)]
pub struct SlotPool {
    semaphore: Arc<Semaphore>,
    gauge: Arc<SlotGauge>,
    capacity: usize,
    metrics: Metrics,
}

impl SlotPool {
    /// Create a pool with `capacity` slots.
    #[must_use]
    pub fn new(capacity: NonZeroUsize, metrics: Metrics) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.get())),
            gauge: Arc::new(SlotGauge::default()),
            capacity: capacity.get(),
            metrics,
        }
    }

    /// Wait for a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::SlotsClosed`] if the pool was closed.
    pub async fn acquire(&self) -> BatchResult<ConcurrencySlot> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|source| BatchError::SlotsClosed { source })?;
        self.update(|gauge| {
            let active = gauge.active.fetch_add(1, Ordering::SeqCst) + 1;
            gauge.peak.fetch_max(active, Ordering::SeqCst);
        });
        Ok(ConcurrencySlot {
            pool: self.clone(),
            _permit: permit,
        })
    }

    /// Stop handing out slots; pending and future `acquire` calls fail.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Configured number of slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    #[must_use]
    pub fn active(&self) -> usize {
        self.gauge.active.load(Ordering::SeqCst)
    }

    /// Highest number of slots held at once.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.gauge.peak.load(Ordering::SeqCst)
    }

    /// Permits currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    fn update(&self, change: impl FnOnce(&SlotGauge)) {
        let _guard = self
            .gauge
            .publish
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        change(&self.gauge);
        self.metrics.set_slot_usage(
            i64::try_from(self.active()).unwrap_or(i64::MAX),
            i64::try_from(self.peak()).unwrap_or(i64::MAX),
        );
    }
}

/// A held slot; released on drop.
pub struct ConcurrencySlot {
    pool: SlotPool,
    _permit: OwnedSemaphorePermit,
}

impl Drop for ConcurrencySlot {
    fn drop(&mut self) {
        self.pool.update(|gauge| {
            gauge.active.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::task::JoinSet;

    fn pool(capacity: usize) -> anyhow::Result<SlotPool> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| anyhow::anyhow!("zero"))?;
        Ok(SlotPool::new(capacity, Metrics::new()?))
    }

    #[tokio::test]
    async fn gauge_never_exceeds_capacity() -> anyhow::Result<()> {
        let pool = pool(3)?;
        let mut tasks = JoinSet::new();
        for _ in 0..10 {
            let slot = pool.acquire().await?;
            assert!(pool.active() <= pool.capacity());
            let observer = pool.clone();
            tasks.spawn(async move {
                let _slot = slot;
                tokio::time::sleep(Duration::from_millis(5)).await;
                observer.active()
            });
        }
        while let Some(observed) = tasks.join_next().await {
            assert!(observed? <= 3);
        }
        assert_eq!(pool.peak(), 3);
        assert_eq!(pool.active(), 0);
        assert_eq!(pool.available(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn panicking_holder_releases_its_slot() -> anyhow::Result<()> {
        let pool = pool(1)?;
        let slot = pool.acquire().await?;
        let result = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            panic!("leaf exploded");
        })
        .await;
        assert!(result.is_err());
        assert_eq!(pool.active(), 0);
        assert_eq!(pool.available(), 1);
        let _again = pool.acquire().await?;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn exported_gauges_settle_on_final_counts() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let capacity = NonZeroUsize::new(4).ok_or_else(|| anyhow::anyhow!("zero"))?;
        let pool = SlotPool::new(capacity, metrics.clone());
        let mut tasks = JoinSet::new();
        for _ in 0..64 {
            let pool = pool.clone();
            tasks.spawn(async move {
                for _ in 0..50 {
                    let slot = pool.acquire().await?;
                    tokio::task::yield_now().await;
                    drop(slot);
                }
                Ok::<_, BatchError>(())
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined??;
        }

        let snapshot = metrics.snapshot();
        assert_eq!(pool.active(), 0);
        assert_eq!(snapshot.active_slots, 0);
        assert_eq!(snapshot.peak_active_slots, i64::try_from(pool.peak())?);
        assert!(pool.peak() <= 4);
        Ok(())
    }

    #[tokio::test]
    async fn closed_pool_rejects_acquire() -> anyhow::Result<()> {
        let pool = pool(2)?;
        pool.close();
        assert!(matches!(
            pool.acquire().await,
            Err(BatchError::SlotsClosed { .. })
        ));
        Ok(())
    }
}
