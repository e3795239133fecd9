//! # serve-core
//!
//! Core types, traits, and utilities for inferserve - the protocol-agnostic
//! execution layer of a model-inference server.
//!
//! This crate provides the foundational data structures and interfaces that
//! are shared across all other inferserve components. It includes:
//!
//! - The unified error taxonomy returned by every fallible operation
//! - Model identity and tensor datatype definitions
//! - Model configuration value structs (input/output schema)
//! - The label provider contract used when finalizing class results
//! - Per-request inference statistics shared through the execution path

pub mod error;
pub mod labels;
pub mod model_config;
pub mod stats;
pub mod types;

// Re-export commonly used types at the crate root
pub use error::{Error, ErrorContext, Result};
pub use labels::{EmptyLabelProvider, FileLabelProvider, LabelProvider, StaticLabelProvider};
pub use model_config::{ModelConfig, ModelInput, ModelOutput};
pub use stats::InferStats;
pub use types::{DataType, ModelIdentity, NO_VERSION};
