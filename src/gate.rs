//! Two-tier concurrency control for render work
//!
//! A counting permit pool bounds how many renders are in flight, and a single
//! driver lock serializes render-engine sessions across all permit holders.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use crate::{Error, Result};

/// Snapshot of the gate's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateStats {
    pub capacity: usize,
    pub available_permits: usize,
    pub active_work: usize,
    pub peak_work: usize,
    pub active_sessions: usize,
    pub peak_sessions: usize,
}

/// Permit pool plus driver-session lock.
///
/// Constructed explicitly and shared behind an `Arc`; there is no global
/// instance.
#[derive(Debug)]
pub struct RenderGate {
    capacity: usize,
    permits: Semaphore,
    driver: Mutex<()>,
    active_work: AtomicUsize,
    peak_work: AtomicUsize,
    active_sessions: AtomicUsize,
    peak_sessions: AtomicUsize,
}

/// One unit of render capacity. Dropping it releases the permit.
#[derive(Debug)]
pub struct WorkPermit<'a> {
    gate: &'a RenderGate,
    _permit: SemaphorePermit<'a>,
}

impl WorkPermit<'_> {
    /// Explicit release; equivalent to dropping the permit.
    pub fn release(self) {}
}

impl Drop for WorkPermit<'_> {
    fn drop(&mut self) {
        self.gate.active_work.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SessionGuard<'a>(&'a RenderGate);

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.0.active_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RenderGate {
    /// A gate admitting `capacity` concurrent renders (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            permits: Semaphore::new(capacity),
            driver: Mutex::new(()),
            active_work: AtomicUsize::new(0),
            peak_work: AtomicUsize::new(0),
            active_sessions: AtomicUsize::new(0),
            peak_sessions: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait until a work permit is free and take it.
    pub async fn acquire_work(&self) -> Result<WorkPermit<'_>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::EngineUnavailable("render gate is closed".into()))?;
        let active = self.active_work.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_work.fetch_max(active, Ordering::SeqCst);
        Ok(WorkPermit { gate: self, _permit: permit })
    }

    /// Run `session` while holding the driver lock; at most one session runs at a time.
    pub async fn with_driver_lock<F, Fut, T>(&self, session: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _driver = self.driver.lock().await;
        let active = self.active_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_sessions.fetch_max(active, Ordering::SeqCst);
        let _session = SessionGuard(self);
        session().await
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            capacity: self.capacity,
            available_permits: self.permits.available_permits(),
            active_work: self.active_work.load(Ordering::SeqCst),
            peak_work: self.peak_work.load(Ordering::SeqCst),
            active_sessions: self.active_sessions.load(Ordering::SeqCst),
            peak_sessions: self.peak_sessions.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn zero_capacity_is_raised_to_one() {
        let gate = RenderGate::new(0);
        assert_eq!(gate.capacity(), 1);
        let permit = gate.acquire_work().await.unwrap();
        assert_eq!(gate.stats().available_permits, 0);
        permit.release();
        assert_eq!(gate.stats().available_permits, 1);
    }

    #[tokio::test]
    async fn permits_are_released_on_drop() {
        let gate = RenderGate::new(2);
        {
            let _a = gate.acquire_work().await.unwrap();
            let _b = gate.acquire_work().await.unwrap();
            let stats = gate.stats();
            assert_eq!(stats.active_work, 2);
            assert_eq!(stats.available_permits, 0);
        }
        let stats = gate.stats();
        assert_eq!(stats.active_work, 0);
        assert_eq!(stats.available_permits, 2);
        assert_eq!(stats.peak_work, 2);
    }

    #[tokio::test]
    async fn third_caller_waits_for_a_permit() {
        let gate = RenderGate::new(2);
        let _a = gate.acquire_work().await.unwrap();
        let _b = gate.acquire_work().await.unwrap();
        let waited = tokio::time::timeout(Duration::from_millis(50), gate.acquire_work()).await;
        assert!(waited.is_err(), "pool should be exhausted");
        drop(_a);
        let third = tokio::time::timeout(Duration::from_millis(50), gate.acquire_work()).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn driver_sessions_never_overlap() {
        let gate = Arc::new(RenderGate::new(4));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire_work().await.unwrap();
                gate.with_driver_lock(|| tokio::time::sleep(Duration::from_millis(5))).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let stats = gate.stats();
        assert_eq!(stats.peak_sessions, 1);
        assert!(stats.peak_work <= 4);
        assert_eq!(stats.active_sessions, 0);
        assert_eq!(stats.available_permits, 4);
    }
}
