//! # serve-servable
//!
//! The servable execution contract of inferserve.
//!
//! An [`InferenceServable`] binds one model's configuration, label
//! metadata, and scheduler together and presents a single execution entry
//! point to protocol frontends, independent of which protocol originated a
//! request. It also owns the per-accelerator-device metric set for the
//! model it serves.
//!
//! The servable performs no threading of its own; it is a thin façade over
//! the bound scheduler's runner lanes.

pub mod metrics;
pub mod servable;

pub use metrics::ServableMetrics;
pub use servable::InferenceServable;
