//! Standard scheduler with parallel runner lanes
//!
//! A fixed number of runner lanes (tokio tasks) share one FIFO queue and
//! race to dequeue work. Each lane records queue time into the job's
//! stats, invokes the model-execution function timing it as compute, and
//! completes the job with the returned status. No ordering is guaranteed
//! between jobs; there is no batching.

use crate::{InferJob, Scheduler};
use serve_core::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// The model-execution function invoked by each runner lane
///
/// Receives the job's providers and stats; performs the actual tensor
/// computation and returns its status. The concrete backend is external to
/// this layer.
pub type RunFunc = Arc<dyn Fn(&mut InferJob) -> Result<()> + Send + Sync>;

/// FIFO work-sharing scheduler over `runner_count` parallel lanes
pub struct StandardScheduler {
    queue: mpsc::UnboundedSender<InferJob>,
    lanes: Vec<tokio::task::JoinHandle<()>>,
}

impl StandardScheduler {
    /// Spawn `runner_count` lanes (at least one), each invoking `run_fn`
    /// for the jobs it dequeues.
    ///
    /// Must be called from within a tokio runtime. Dropping the scheduler
    /// closes the queue; lanes drain already-accepted jobs before exiting.
    pub fn new(runner_count: u32, run_fn: RunFunc) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<InferJob>();
        let rx = Arc::new(Mutex::new(rx));

        let lanes = (0..runner_count.max(1))
            .map(|lane| {
                let rx = Arc::clone(&rx);
                let run_fn = Arc::clone(&run_fn);
                tokio::spawn(async move {
                    loop {
                        let job = { rx.lock().await.recv().await };
                        let Some(mut job) = job else { break };

                        job.stats.mark_dequeued();
                        let start = Instant::now();
                        let status = run_fn(&mut job);
                        job.stats.record_compute(start.elapsed());

                        if let Err(ref e) = status {
                            warn!(lane, model = %job.request.model_name(), error = %e,
                                "inference execution failed");
                        }
                        job.complete(status);
                    }
                    debug!(lane, "runner lane exited");
                })
            })
            .collect();

        debug!(runner_count = runner_count.max(1), "created standard scheduler");
        Self { queue: tx, lanes }
    }

    /// Number of parallel runner lanes
    pub fn runner_count(&self) -> usize {
        self.lanes.len()
    }
}

impl Scheduler for StandardScheduler {
    fn schedule(&self, job: InferJob) -> Result<()> {
        job.stats.mark_enqueued();
        self.queue.send(job).map_err(|_| {
            Error::internal("scheduler queue is closed; unit of work rejected")
        })
    }
}
