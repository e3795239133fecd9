//! Response providers
//!
//! The protocol-agnostic write side of an inference response. Model
//! execution requests writable output buffers by name through
//! [`ResponseProvider`]; the provider owns the output buffer registry and,
//! at finalize time, freezes the response header, computes requested class
//! results, and routes raw bytes into the protocol's wire structure.
//!
//! An output is written exactly once per response: the first
//! `output_buffer` call for a name registers it (first-write order is
//! preserved), a second call for the same name fails.

use crate::header::{ClassResult, OutputResult, RequestHeader, ResponseHeader};
use bytes::{Bytes, BytesMut};
use serve_core::{DataType, Error, LabelProvider, ModelOutput, Result};
use std::collections::HashMap;
use tracing::debug;

/// Servable-side lookups needed to finalize a response
///
/// Implemented by the servable; keeps this crate independent of the
/// servable's own type.
pub trait ServableContext {
    /// Model configuration for a declared output
    fn output_config(&self, name: &str) -> Result<&ModelOutput>;

    /// Label provider for the model
    fn label_provider(&self) -> &dyn LabelProvider;
}

/// Protocol-agnostic write side of one inference response
pub trait ResponseProvider: Send {
    /// The response header as built so far
    fn response_header(&self) -> &ResponseHeader;

    /// Mutable access to the response header being built
    fn response_header_mut(&mut self) -> &mut ResponseHeader;

    /// Get a writable buffer of exactly `byte_size` bytes for output
    /// `name` with shape `shape` (one batch item).
    ///
    /// The first call for a name registers the output; a second call for
    /// the same name fails with already-exists. Writing an output the
    /// caller did not request is allowed.
    fn output_buffer(&mut self, name: &str, byte_size: usize, shape: &[i64])
        -> Result<&mut [u8]>;

    /// True iff `name` appears in the original request's requested-outputs
    /// set
    fn requires_output(&self, name: &str) -> bool;

    /// Validate that every requested output was produced, compute
    /// requested class results, and freeze the response header for
    /// transmission
    fn finalize(&mut self, ctx: &dyn ServableContext) -> Result<()>;
}

/// One registered output
#[derive(Debug)]
struct OutputRecord {
    name: String,
    shape: Vec<i64>,
    byte_size: usize,
    /// Owned storage for buffered (class-result) outputs; raw outputs
    /// write straight into the wire structure instead
    buffer: Vec<u8>,
    /// Number of class results requested for this output
    cls_count: Option<u32>,
}

/// Per-response map from output name to registered storage
#[derive(Debug)]
struct OutputRegistry {
    batch_size: u32,
    /// Requested outputs, keyed by name
    requested: HashMap<String, Option<u32>>,
    /// Registered outputs in first-write order
    records: Vec<OutputRecord>,
    index: HashMap<String, usize>,
}

impl OutputRegistry {
    fn new(request_header: &RequestHeader) -> Self {
        let requested = request_header
            .outputs
            .iter()
            .map(|o| (o.name.clone(), o.cls_count))
            .collect();
        Self {
            batch_size: request_header.batch_size,
            requested,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn requires(&self, name: &str) -> bool {
        self.requested.contains_key(name)
    }

    /// Class-result count requested for `name`, when it was requested with
    /// one
    fn requested_cls(&self, name: &str) -> Option<u32> {
        self.requested.get(name).copied().flatten()
    }

    /// Register output `name`, allocating owned storage when `buffered`.
    /// Returns the record index.
    fn register(
        &mut self,
        name: &str,
        byte_size: usize,
        shape: &[i64],
        buffered: bool,
    ) -> Result<usize> {
        if self.index.contains_key(name) {
            return Err(Error::already_exists(format!(
                "output '{}' was already registered for this response",
                name
            )));
        }

        let record = OutputRecord {
            name: name.to_string(),
            shape: shape.to_vec(),
            byte_size,
            buffer: if buffered { vec![0u8; byte_size] } else { Vec::new() },
            cls_count: if buffered { self.requested_cls(name) } else { None },
        };
        let idx = self.records.len();
        self.records.push(record);
        self.index.insert(name.to_string(), idx);
        Ok(idx)
    }

    /// The requested outputs never written, in no particular order
    fn missing_required(&self) -> Vec<&str> {
        self.requested
            .keys()
            .filter(|name| !self.index.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Interpret a buffered output as fp32 scores and take the top-k class
/// results per batch item, attaching labels where the model declares a
/// label mapping
fn compute_classes(
    record: &OutputRecord,
    cls_count: u32,
    batch_size: u32,
    ctx: &dyn ServableContext,
) -> Result<Vec<Vec<ClassResult>>> {
    let output_config = ctx.output_config(&record.name)?;
    if output_config.datatype != DataType::Fp32 {
        return Err(Error::unimplemented(format!(
            "class results for output '{}' with datatype {} are not supported",
            record.name, output_config.datatype
        )));
    }
    // Labels attach only when the model declares a mapping for this output
    let labeled = output_config.label_filename.is_some();

    let batch = batch_size.max(1) as usize;
    let total = record.byte_size / std::mem::size_of::<f32>();
    if total % batch != 0 {
        return Err(Error::invalid_argument(format!(
            "output '{}' has {} elements, not divisible by batch size {}",
            record.name, total, batch
        )));
    }
    let per_batch = total / batch;
    let k = (cls_count as usize).min(per_batch);

    let mut classes = Vec::with_capacity(batch);
    for b in 0..batch {
        let base = b * per_batch * 4;
        let mut scored: Vec<(usize, f32)> = record.buffer[base..base + per_batch * 4]
            .chunks_exact(4)
            .enumerate()
            .map(|(i, chunk)| {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(chunk);
                (i, f32::from_ne_bytes(raw))
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        classes.push(
            scored
                .into_iter()
                .take(k)
                .map(|(index, value)| ClassResult {
                    index: index as u32,
                    value,
                    label: if labeled {
                        ctx.label_provider()
                            .lookup(&record.name, index)
                            .map(str::to_string)
                    } else {
                        None
                    },
                })
                .collect(),
        );
    }
    Ok(classes)
}

/// Validate completeness and build the frozen output list for the header
fn finalize_outputs(
    registry: &OutputRegistry,
    ctx: &dyn ServableContext,
) -> Result<Vec<OutputResult>> {
    let missing = registry.missing_required();
    if let Some(name) = missing.first() {
        return Err(Error::failed_precondition(format!(
            "requested output '{}' was never written",
            name
        )));
    }

    let mut outputs = Vec::with_capacity(registry.records.len());
    for record in &registry.records {
        let classes = match record.cls_count {
            Some(k) => Some(compute_classes(record, k, registry.batch_size, ctx)?),
            None => None,
        };
        outputs.push(OutputResult {
            name: record.name.clone(),
            shape: record.shape.clone(),
            byte_size: record.byte_size as u64,
            classes,
        });
    }
    Ok(outputs)
}

/// Outgoing gRPC inference response message
///
/// Raw output bytes live in `raw_output`, one entry per raw output in
/// first-write order; wire serialization happens in the gRPC frontend.
#[derive(Debug, Clone, Default)]
pub struct GrpcInferResponse {
    pub header: ResponseHeader,
    pub raw_output: Vec<Vec<u8>>,
}

/// Response provider for a gRPC inference request
///
/// Raw outputs are written directly into the outgoing response message;
/// only class-result outputs take an intermediate owned buffer, encoded at
/// finalize time.
pub struct GrpcResponseProvider {
    registry: OutputRegistry,
    response: GrpcInferResponse,
    finalized: bool,
}

impl GrpcResponseProvider {
    pub fn new(
        model_name: impl Into<String>,
        model_version: i64,
        request_header: &RequestHeader,
    ) -> Self {
        let header = ResponseHeader {
            model_name: model_name.into(),
            model_version,
            batch_size: request_header.batch_size,
            outputs: Vec::new(),
        };
        Self {
            registry: OutputRegistry::new(request_header),
            response: GrpcInferResponse {
                header,
                raw_output: Vec::new(),
            },
            finalized: false,
        }
    }

    /// Hand the finished message to the gRPC frontend
    pub fn take_response(self) -> GrpcInferResponse {
        self.response
    }
}

impl ResponseProvider for GrpcResponseProvider {
    fn response_header(&self) -> &ResponseHeader {
        &self.response.header
    }

    fn response_header_mut(&mut self) -> &mut ResponseHeader {
        &mut self.response.header
    }

    fn output_buffer(
        &mut self,
        name: &str,
        byte_size: usize,
        shape: &[i64],
    ) -> Result<&mut [u8]> {
        let buffered = self.registry.requested_cls(name).is_some();
        let idx = self.registry.register(name, byte_size, shape, buffered)?;
        if buffered {
            Ok(self.registry.records[idx].buffer.as_mut_slice())
        } else {
            self.response.raw_output.push(vec![0u8; byte_size]);
            let slot = self.response.raw_output.len() - 1;
            Ok(self.response.raw_output[slot].as_mut_slice())
        }
    }

    fn requires_output(&self, name: &str) -> bool {
        self.registry.requires(name)
    }

    fn finalize(&mut self, ctx: &dyn ServableContext) -> Result<()> {
        if self.finalized {
            return Err(Error::failed_precondition(
                "response was already finalized",
            ));
        }
        self.response.header.outputs = finalize_outputs(&self.registry, ctx)?;
        self.finalized = true;
        debug!(
            model = %self.response.header.model_name,
            outputs = self.response.header.outputs.len(),
            "finalized gRPC response"
        );
        Ok(())
    }
}

/// Response provider for an HTTP inference request
///
/// All outputs are written into provider-owned buffers, then appended to
/// the outgoing byte stream in canonical (first-write) order at finalize.
pub struct HttpResponseProvider {
    registry: OutputRegistry,
    header: ResponseHeader,
    stream: BytesMut,
    finalized: bool,
}

impl HttpResponseProvider {
    pub fn new(
        model_name: impl Into<String>,
        model_version: i64,
        request_header: &RequestHeader,
    ) -> Self {
        Self {
            registry: OutputRegistry::new(request_header),
            header: ResponseHeader {
                model_name: model_name.into(),
                model_version,
                batch_size: request_header.batch_size,
                outputs: Vec::new(),
            },
            stream: BytesMut::new(),
            finalized: false,
        }
    }

    /// Hand the finished raw output stream to the HTTP frontend
    pub fn take_output_stream(self) -> Bytes {
        self.stream.freeze()
    }
}

impl ResponseProvider for HttpResponseProvider {
    fn response_header(&self) -> &ResponseHeader {
        &self.header
    }

    fn response_header_mut(&mut self) -> &mut ResponseHeader {
        &mut self.header
    }

    fn output_buffer(
        &mut self,
        name: &str,
        byte_size: usize,
        shape: &[i64],
    ) -> Result<&mut [u8]> {
        // Every HTTP output is buffered; outputs without a class request
        // stream their raw bytes at finalize.
        let idx = self.registry.register(name, byte_size, shape, true)?;
        Ok(self.registry.records[idx].buffer.as_mut_slice())
    }

    fn requires_output(&self, name: &str) -> bool {
        self.registry.requires(name)
    }

    fn finalize(&mut self, ctx: &dyn ServableContext) -> Result<()> {
        if self.finalized {
            return Err(Error::failed_precondition(
                "response was already finalized",
            ));
        }
        self.header.outputs = finalize_outputs(&self.registry, ctx)?;

        for record in &self.registry.records {
            if record.cls_count.is_none() {
                self.stream.extend_from_slice(&record.buffer);
            }
        }

        self.finalized = true;
        debug!(
            model = %self.header.model_name,
            outputs = self.header.outputs.len(),
            stream_bytes = self.stream.len(),
            "finalized HTTP response"
        );
        Ok(())
    }
}
