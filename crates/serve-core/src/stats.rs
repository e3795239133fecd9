//! Per-request inference statistics
//!
//! One `InferStats` travels with each unit of work from the protocol
//! frontend through the scheduler to completion. It is shared as
//! `Arc<InferStats>` because the scheduler lane and the completion wrapper
//! both record into it; interior state uses atomics so no lock is held
//! across execution.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Timing and placement record for one inference request
#[derive(Debug)]
pub struct InferStats {
    /// Requested batch size
    batch_size: u32,

    /// Accelerator device the execution ran on, -1 until placed
    device: AtomicI64,

    /// When the request entered this layer
    created: Instant,

    /// When the unit of work was accepted by the scheduler
    enqueued: Mutex<Option<Instant>>,

    /// Time spent queued before a runner lane picked the work up
    queue_ns: AtomicU64,

    /// Time spent in the model-execution function
    compute_ns: AtomicU64,
}

impl InferStats {
    pub fn new(batch_size: u32) -> Self {
        Self {
            batch_size,
            device: AtomicI64::new(-1),
            created: Instant::now(),
            enqueued: Mutex::new(None),
            queue_ns: AtomicU64::new(0),
            compute_ns: AtomicU64::new(0),
        }
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Device index for metric reporting, -1 for the aggregate series
    pub fn device(&self) -> i64 {
        self.device.load(Ordering::Relaxed)
    }

    /// Record the accelerator device this execution was placed on
    pub fn set_device(&self, device: i64) {
        self.device.store(device, Ordering::Relaxed);
    }

    /// Mark acceptance by the scheduler
    pub fn mark_enqueued(&self) {
        let mut enqueued = self.enqueued.lock().unwrap_or_else(|e| e.into_inner());
        *enqueued = Some(Instant::now());
    }

    /// Mark pickup by a runner lane; accumulates queue duration
    pub fn mark_dequeued(&self) {
        let start = {
            let mut enqueued = self.enqueued.lock().unwrap_or_else(|e| e.into_inner());
            enqueued.take()
        };
        if let Some(start) = start {
            self.queue_ns
                .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        }
    }

    /// Record time spent in the model-execution function
    pub fn record_compute(&self, duration: Duration) {
        self.compute_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Total time since the request entered this layer
    pub fn request_duration(&self) -> Duration {
        self.created.elapsed()
    }

    pub fn queue_duration(&self) -> Duration {
        Duration::from_nanos(self.queue_ns.load(Ordering::Relaxed))
    }

    pub fn compute_duration(&self) -> Duration {
        Duration::from_nanos(self.compute_ns.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_placement() {
        let stats = InferStats::new(4);
        assert_eq!(stats.device(), -1);
        stats.set_device(2);
        assert_eq!(stats.device(), 2);
        assert_eq!(stats.batch_size(), 4);
    }

    #[test]
    fn test_queue_accounting() {
        let stats = InferStats::new(1);
        assert_eq!(stats.queue_duration(), Duration::ZERO);

        stats.mark_enqueued();
        std::thread::sleep(Duration::from_millis(2));
        stats.mark_dequeued();
        assert!(stats.queue_duration() >= Duration::from_millis(1));

        // Dequeue without a matching enqueue is a no-op
        let before = stats.queue_duration();
        stats.mark_dequeued();
        assert_eq!(stats.queue_duration(), before);
    }

    #[test]
    fn test_compute_accounting() {
        let stats = InferStats::new(1);
        stats.record_compute(Duration::from_micros(250));
        stats.record_compute(Duration::from_micros(250));
        assert_eq!(stats.compute_duration(), Duration::from_micros(500));
    }
}
