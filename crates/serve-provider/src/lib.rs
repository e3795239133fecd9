//! # serve-provider
//!
//! Protocol-agnostic request/response providers for inferserve.
//!
//! A protocol frontend (gRPC or HTTP) constructs a [`RequestProvider`] from
//! its wire input and a [`ResponseProvider`] for its wire output target,
//! then hands both to a servable. Model execution reads input chunks and
//! writes output buffers purely through these traits, so one execution path
//! serves every protocol without copying tensor payloads more than
//! necessary.
//!
//! This crate provides:
//!
//! - Request/response header value structs (the HTTP textual header is JSON)
//! - The content chunk cursor used for scatter/gather input delivery
//! - gRPC and HTTP request provider variants
//! - gRPC and HTTP response provider variants with the output buffer registry

pub mod chunk;
pub mod header;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use chunk::ChunkCursor;
pub use header::{
    ClassResult, InputRequest, OutputRequest, OutputResult, RequestHeader, ResponseHeader,
};
pub use request::{
    input_batch_byte_size, GrpcInferRequest, GrpcRequestProvider, HttpRequestProvider,
    RequestProvider,
};
pub use response::{
    GrpcInferResponse, GrpcResponseProvider, HttpResponseProvider, ResponseProvider,
    ServableContext,
};
