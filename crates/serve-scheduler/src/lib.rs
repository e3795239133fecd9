//! # serve-scheduler
//!
//! Scheduler contract for inferserve and the standard runner-lane
//! implementation.
//!
//! A scheduler accepts units of work ([`InferJob`]: stats, request
//! provider, response provider, completion callback) and executes them
//! according to its own policy. The only guarantees this layer relies on:
//! every accepted job's completion callback is invoked with a status,
//! exactly once, eventually. Batching and fairness are scheduler policy
//! and deliberately opaque to the rest of the system.

pub mod standard;

pub use standard::{RunFunc, StandardScheduler};

use serve_core::{InferStats, Result};
use serve_provider::{RequestProvider, ResponseProvider};
use std::sync::Arc;

/// Completion callback invoked with the final status of one unit of work
pub type OnComplete = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// One unit of inference work
///
/// Owns the request/response providers for the lifetime of the execution.
/// Completion consumes the job, so the callback cannot fire more than once.
pub struct InferJob {
    /// Timing/placement record, shared with the submitter
    pub stats: Arc<InferStats>,

    /// Read side of the request
    pub request: Box<dyn RequestProvider>,

    /// Write side of the response
    pub response: Box<dyn ResponseProvider>,

    on_complete: OnComplete,
}

impl InferJob {
    pub fn new(
        stats: Arc<InferStats>,
        request: Box<dyn RequestProvider>,
        response: Box<dyn ResponseProvider>,
        on_complete: OnComplete,
    ) -> Self {
        Self {
            stats,
            request,
            response,
            on_complete,
        }
    }

    /// Finish this unit of work, invoking the completion callback with
    /// `status`
    pub fn complete(self, status: Result<()>) {
        (self.on_complete)(status);
    }
}

/// Contract between a servable and its scheduler
///
/// `schedule` either accepts the job (and will eventually complete it,
/// exactly once) or rejects it with an error, in which case the callback
/// is never invoked and the submitter owns the failure.
pub trait Scheduler: Send + Sync {
    /// Submit one unit of work for execution
    fn schedule(&self, job: InferJob) -> Result<()>;
}
