//! Request providers
//!
//! The protocol-agnostic read side of an inference request. Model
//! execution consumes input bytes exclusively through [`RequestProvider`],
//! so it never knows whether a request arrived over gRPC (one in-memory
//! message, one chunk per input) or HTTP (a sequence of possibly
//! discontiguous wire segments indexed into per-input block lists).
//!
//! A provider is single-owner within one request's lifetime and must never
//! be shared across concurrent run calls.

use crate::chunk::ChunkCursor;
use crate::header::{InputRequest, RequestHeader};
use bytes::Bytes;
use serve_core::{Error, ModelConfig, ModelInput, Result};
use tracing::debug;

/// Protocol-agnostic read side of one inference request
pub trait RequestProvider: Send {
    /// The requested model name
    fn model_name(&self) -> &str;

    /// The requested model version, or -1 if no specific version was
    /// requested
    fn model_version(&self) -> i64;

    /// The header describing requested inputs/outputs and batch size
    fn request_header(&self) -> &RequestHeader;

    /// Get the next contiguous chunk of bytes for the input at `idx`.
    ///
    /// Returns `None` once all bytes for that input have been delivered;
    /// calling again keeps returning `None`. With `force_contiguous`, the
    /// entire remaining input is returned as a single chunk, copying if the
    /// wire data is fragmented.
    fn next_input_content(&mut self, idx: usize, force_contiguous: bool)
        -> Result<Option<Bytes>>;
}

/// Expected total byte size for an input, given the declared batch size and
/// the model's input schema.
///
/// Callers use this to validate wire sizes or preallocate. For
/// variable-size datatypes or variable dims the declared header byte size
/// is the only source of truth and is returned as-is.
pub fn input_batch_byte_size(
    input: &InputRequest,
    input_config: &ModelInput,
    batch_size: u32,
) -> Result<u64> {
    let element_size = match input_config.datatype.size() {
        Some(size) => size as u64,
        None => return Ok(input.byte_size),
    };
    let element_count = match input_config.element_count() {
        Some(count) => count,
        None => return Ok(input.byte_size),
    };

    element_count
        .checked_mul(element_size)
        .and_then(|bytes| bytes.checked_mul(batch_size as u64))
        .ok_or_else(|| {
            Error::invalid_argument(format!(
                "byte size overflow for input '{}' with batch size {}",
                input.name, batch_size
            ))
        })
}

/// Validate a requested input against the model schema and the actual wire
/// byte count
fn check_input(
    config: &ModelConfig,
    input: &InputRequest,
    batch_size: u32,
    wire_bytes: u64,
) -> Result<()> {
    let input_config = config.input(&input.name).ok_or_else(|| {
        Error::invalid_argument(format!(
            "unexpected input '{}' for model '{}'",
            input.name, config.name
        ))
    })?;

    let expected = input_batch_byte_size(input, input_config, batch_size)?;
    if expected != input.byte_size {
        return Err(Error::invalid_argument(format!(
            "unexpected byte size {} for input '{}', expecting {} for model '{}'",
            input.byte_size, input.name, expected, config.name
        )));
    }
    if wire_bytes != input.byte_size {
        return Err(Error::invalid_argument(format!(
            "received {} bytes for input '{}', expecting {} for model '{}'",
            wire_bytes, input.name, input.byte_size, config.name
        )));
    }

    Ok(())
}

/// In-memory gRPC inference request message
///
/// Wire deserialization happens in the gRPC frontend; by the time this
/// struct exists every input's bytes already reside in one contiguous
/// `Bytes` per input, ordered as `meta.inputs`.
#[derive(Debug, Clone)]
pub struct GrpcInferRequest {
    pub model_name: String,
    pub model_version: i64,
    pub meta: RequestHeader,
    pub raw_input: Vec<Bytes>,
}

/// Request provider for a gRPC inference request
///
/// Input bytes alias the request message; each input has at most one
/// chunk, ever, tracked by a per-input delivered flag.
#[derive(Debug)]
pub struct GrpcRequestProvider {
    request: GrpcInferRequest,
    delivered: Vec<bool>,
}

impl GrpcRequestProvider {
    /// Initialize from a gRPC request, validating it against the model
    /// configuration
    pub fn new(config: &ModelConfig, request: GrpcInferRequest) -> Result<Self> {
        if request.raw_input.len() != request.meta.inputs.len() {
            return Err(Error::invalid_argument(format!(
                "expected {} raw input buffers for model '{}', got {}",
                request.meta.inputs.len(),
                config.name,
                request.raw_input.len()
            )));
        }

        for (input, raw) in request.meta.inputs.iter().zip(&request.raw_input) {
            check_input(config, input, request.meta.batch_size, raw.len() as u64)?;
        }

        debug!(
            model = %request.model_name,
            version = request.model_version,
            inputs = request.meta.inputs.len(),
            "created gRPC request provider"
        );

        let delivered = vec![false; request.meta.inputs.len()];
        Ok(Self { request, delivered })
    }
}

impl RequestProvider for GrpcRequestProvider {
    fn model_name(&self) -> &str {
        &self.request.model_name
    }

    fn model_version(&self) -> i64 {
        self.request.model_version
    }

    fn request_header(&self) -> &RequestHeader {
        &self.request.meta
    }

    fn next_input_content(
        &mut self,
        idx: usize,
        _force_contiguous: bool,
    ) -> Result<Option<Bytes>> {
        let delivered = self.delivered.get_mut(idx).ok_or_else(|| {
            Error::invalid_argument(format!("input index {} out of range", idx))
        })?;

        if *delivered {
            return Ok(None);
        }
        *delivered = true;
        Ok(Some(self.request.raw_input[idx].clone()))
    }
}

/// Request provider for an HTTP inference request
///
/// Input bytes arrive as a sequence of possibly discontiguous wire
/// segments; construction indexes them into per-input block lists
/// according to the declared byte sizes, and delivery walks a
/// [`ChunkCursor`] per input.
#[derive(Debug)]
pub struct HttpRequestProvider {
    model_name: String,
    model_version: i64,
    header: RequestHeader,
    cursors: Vec<ChunkCursor>,
}

impl HttpRequestProvider {
    /// Initialize from a raw input buffer (as wire segments) plus the
    /// textual JSON request header
    pub fn new(
        config: &ModelConfig,
        model_name: impl Into<String>,
        model_version: i64,
        header_json: &str,
        segments: Vec<Bytes>,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let header: RequestHeader = serde_json::from_str(header_json).map_err(|e| {
            Error::invalid_argument(format!(
                "unable to parse request header for model '{}': {}",
                model_name, e
            ))
        })?;

        let total_wire: u64 = segments.iter().map(|s| s.len() as u64).sum();
        let total_declared: u64 = header.inputs.iter().map(|i| i.byte_size).sum();
        if total_wire != total_declared {
            return Err(Error::invalid_argument(format!(
                "received {} bytes of input data for model '{}', expecting {}",
                total_wire, model_name, total_declared
            )));
        }

        // Index the wire segments into per-input block lists; an input's
        // bytes may span or split segments.
        let mut cursors = Vec::with_capacity(header.inputs.len());
        let mut seg = 0usize;
        let mut offset = 0usize;
        for input in &header.inputs {
            let mut needed = input.byte_size as usize;
            let mut blocks = Vec::new();
            while needed > 0 {
                let segment = &segments[seg];
                let available = segment.len() - offset;
                let take = available.min(needed);
                blocks.push(segment.slice(offset..offset + take));
                needed -= take;
                offset += take;
                if offset == segment.len() {
                    seg += 1;
                    offset = 0;
                }
            }
            let wire_bytes: u64 = blocks.iter().map(|b| b.len() as u64).sum();
            check_input(config, input, header.batch_size, wire_bytes)?;
            cursors.push(ChunkCursor::new(blocks));
        }

        debug!(
            model = %model_name,
            version = model_version,
            inputs = header.inputs.len(),
            segments = segments.len(),
            "created HTTP request provider"
        );

        Ok(Self {
            model_name,
            model_version,
            header,
            cursors,
        })
    }
}

impl RequestProvider for HttpRequestProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn model_version(&self) -> i64 {
        self.model_version
    }

    fn request_header(&self) -> &RequestHeader {
        &self.header
    }

    fn next_input_content(
        &mut self,
        idx: usize,
        force_contiguous: bool,
    ) -> Result<Option<Bytes>> {
        let cursor = self.cursors.get_mut(idx).ok_or_else(|| {
            Error::invalid_argument(format!("input index {} out of range", idx))
        })?;
        Ok(cursor.next(force_contiguous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serve_core::DataType;

    fn config() -> ModelConfig {
        ModelConfig::new("adder")
            .with_input("a", DataType::Fp32, vec![3])
            .with_input("b", DataType::Fp32, vec![1])
            .with_output("sum", DataType::Fp32, vec![1])
    }

    fn header(batch_size: u32) -> RequestHeader {
        RequestHeader {
            id: None,
            batch_size,
            inputs: vec![
                InputRequest {
                    name: "a".to_string(),
                    byte_size: 12 * batch_size as u64,
                },
                InputRequest {
                    name: "b".to_string(),
                    byte_size: 4 * batch_size as u64,
                },
            ],
            outputs: Vec::new(),
        }
    }

    #[test]
    fn test_batch_byte_size() {
        let config = config();
        let header = header(2);
        assert_eq!(
            input_batch_byte_size(&header.inputs[0], config.input("a").unwrap(), 2).unwrap(),
            24
        );
    }

    #[test]
    fn test_batch_byte_size_variable_dims() {
        let input_config = ModelInput {
            name: "tokens".to_string(),
            datatype: DataType::Int64,
            dims: vec![-1],
        };
        let input = InputRequest {
            name: "tokens".to_string(),
            byte_size: 56,
        };
        // Falls back to the header-declared size
        assert_eq!(input_batch_byte_size(&input, &input_config, 4).unwrap(), 56);
    }

    #[test]
    fn test_grpc_provider_single_chunk_per_input() {
        let request = GrpcInferRequest {
            model_name: "adder".to_string(),
            model_version: -1,
            meta: header(1),
            raw_input: vec![Bytes::from(vec![0u8; 12]), Bytes::from(vec![0u8; 4])],
        };

        let mut provider = GrpcRequestProvider::new(&config(), request).unwrap();
        assert_eq!(provider.model_name(), "adder");
        assert_eq!(provider.model_version(), -1);

        let chunk = provider.next_input_content(0, false).unwrap().unwrap();
        assert_eq!(chunk.len(), 12);
        assert!(provider.next_input_content(0, false).unwrap().is_none());
        assert!(provider.next_input_content(0, true).unwrap().is_none());

        // Other input is independent
        assert!(provider.next_input_content(1, false).unwrap().is_some());
        assert!(provider.next_input_content(1, false).unwrap().is_none());
    }

    #[test]
    fn test_provider_debug_format() {
        let request = GrpcInferRequest {
            model_name: "adder".to_string(),
            model_version: -1,
            meta: header(1),
            raw_input: vec![Bytes::from(vec![0u8; 12]), Bytes::from(vec![0u8; 4])],
        };
        let provider = GrpcRequestProvider::new(&config(), request).unwrap();
        assert!(format!("{:?}", provider).contains("adder"));

        let provider = HttpRequestProvider::new(
            &one_input_config(),
            "echo",
            -1,
            ONE_INPUT_HEADER,
            vec![Bytes::from(vec![0u8; 12])],
        )
        .unwrap();
        assert!(format!("{:?}", provider).contains("echo"));
    }

    #[test]
    fn test_grpc_provider_unknown_input() {
        let mut meta = header(1);
        meta.inputs[1].name = "ghost".to_string();
        let request = GrpcInferRequest {
            model_name: "adder".to_string(),
            model_version: 1,
            meta,
            raw_input: vec![Bytes::from(vec![0u8; 12]), Bytes::from(vec![0u8; 4])],
        };

        let err = GrpcRequestProvider::new(&config(), request).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("unexpected input 'ghost'"));
    }

    #[test]
    fn test_grpc_provider_byte_size_mismatch() {
        let request = GrpcInferRequest {
            model_name: "adder".to_string(),
            model_version: 1,
            meta: header(1),
            raw_input: vec![Bytes::from(vec![0u8; 10]), Bytes::from(vec![0u8; 4])],
        };

        let err = GrpcRequestProvider::new(&config(), request).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_grpc_provider_out_of_range_index() {
        let request = GrpcInferRequest {
            model_name: "adder".to_string(),
            model_version: 1,
            meta: header(1),
            raw_input: vec![Bytes::from(vec![0u8; 12]), Bytes::from(vec![0u8; 4])],
        };
        let mut provider = GrpcRequestProvider::new(&config(), request).unwrap();
        assert!(provider.next_input_content(5, false).is_err());
    }

    fn one_input_config() -> ModelConfig {
        ModelConfig::new("echo").with_input("data", DataType::Fp32, vec![3])
    }

    const ONE_INPUT_HEADER: &str =
        r#"{"batch_size": 1, "inputs": [{"name": "data", "byte_size": 12}], "outputs": []}"#;

    #[test]
    fn test_http_provider_split_blocks() {
        // One 12-byte input split 8 + 4 across wire segments
        let segments = vec![
            Bytes::from_static(b"01234567"),
            Bytes::from_static(b"89ab"),
        ];

        let mut provider = HttpRequestProvider::new(
            &one_input_config(),
            "echo",
            -1,
            ONE_INPUT_HEADER,
            segments.clone(),
        )
        .unwrap();

        assert_eq!(
            provider.next_input_content(0, false).unwrap().unwrap().as_ref(),
            b"01234567"
        );
        assert_eq!(
            provider.next_input_content(0, false).unwrap().unwrap().as_ref(),
            b"89ab"
        );
        assert!(provider.next_input_content(0, false).unwrap().is_none());
        assert!(provider.next_input_content(0, false).unwrap().is_none());

        // A fresh provider with force_contiguous yields one 12-byte chunk
        let mut provider =
            HttpRequestProvider::new(&one_input_config(), "echo", -1, ONE_INPUT_HEADER, segments)
                .unwrap();
        assert_eq!(
            provider.next_input_content(0, true).unwrap().unwrap().as_ref(),
            b"0123456789ab"
        );
        assert!(provider.next_input_content(0, true).unwrap().is_none());
    }

    #[test]
    fn test_http_provider_input_spanning_segments() {
        let config = ModelConfig::new("pair")
            .with_input("x", DataType::Fp32, vec![1])
            .with_input("y", DataType::Fp32, vec![1]);
        let header = r#"{
            "batch_size": 1,
            "inputs": [
                {"name": "x", "byte_size": 4},
                {"name": "y", "byte_size": 4}
            ],
            "outputs": []
        }"#;
        // 'x' consumes the first segment and half of the second; 'y' takes
        // the rest
        let segments = vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cdefgh")];

        let mut provider = HttpRequestProvider::new(&config, "pair", 2, header, segments).unwrap();

        assert_eq!(provider.next_input_content(0, false).unwrap().unwrap().as_ref(), b"ab");
        assert_eq!(provider.next_input_content(0, false).unwrap().unwrap().as_ref(), b"cd");
        assert!(provider.next_input_content(0, false).unwrap().is_none());
        assert_eq!(provider.next_input_content(1, false).unwrap().unwrap().as_ref(), b"efgh");
        assert!(provider.next_input_content(1, false).unwrap().is_none());
    }

    #[test]
    fn test_http_provider_malformed_header() {
        let err = HttpRequestProvider::new(
            &one_input_config(),
            "echo",
            -1,
            "{not json",
            vec![Bytes::from(vec![0u8; 12])],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_http_provider_wire_size_mismatch() {
        // 11 bytes on the wire, 12 declared
        let err = HttpRequestProvider::new(
            &one_input_config(),
            "echo",
            -1,
            ONE_INPUT_HEADER,
            vec![Bytes::from(vec![0u8; 11])],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_http_provider_unknown_input() {
        let header =
            r#"{"batch_size": 1, "inputs": [{"name": "ghost", "byte_size": 12}], "outputs": []}"#;
        let err = HttpRequestProvider::new(
            &one_input_config(),
            "echo",
            -1,
            header,
            vec![Bytes::from(vec![0u8; 12])],
        )
        .unwrap_err();
        assert!(err.to_string().contains("unexpected input 'ghost'"));
    }
}
