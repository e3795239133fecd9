//! Request and response header value structs
//!
//! Headers are plain owned values passed by reference into provider
//! constructors. The request header is read-only to providers; the
//! response header is built incrementally by the response provider and
//! frozen at finalize. For the HTTP frontend the request header travels as
//! JSON text alongside the raw input buffer.

use serde::{Deserialize, Serialize};

/// Describes the requested inputs/outputs and batch size of one inference
/// request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Caller-assigned request id, echoed in logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Requested batch size
    pub batch_size: u32,

    /// Requested inputs, in wire order
    pub inputs: Vec<InputRequest>,

    /// Requested outputs
    pub outputs: Vec<OutputRequest>,
}

/// One requested input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRequest {
    /// Input tensor name
    pub name: String,

    /// Total byte size the caller will supply for this input, across the
    /// full batch
    pub byte_size: u64,
}

/// One requested output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRequest {
    /// Output tensor name
    pub name: String,

    /// Expected byte size across the full batch
    pub byte_size: u64,

    /// When set, return the top-k class results for this output instead of
    /// raw bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cls_count: Option<u32>,
}

impl RequestHeader {
    /// Position of a named input in wire order
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|i| i.name == name)
    }

    /// The requested-output entry for `name`, if the caller asked for it
    pub fn requested_output(&self, name: &str) -> Option<&OutputRequest> {
        self.outputs.iter().find(|o| o.name == name)
    }
}

/// Response header built incrementally by a response provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Model that produced this response
    pub model_name: String,

    /// Model version, -1 when unspecified
    pub model_version: i64,

    /// Batch size of the response
    pub batch_size: u32,

    /// Produced outputs, in first-write order
    pub outputs: Vec<OutputResult>,
}

/// One produced output in the response header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputResult {
    /// Output tensor name
    pub name: String,

    /// Shape of one batch item
    pub shape: Vec<i64>,

    /// Byte size across the full batch
    pub byte_size: u64,

    /// Per-batch-item class results, present only when the request asked
    /// for classes on this output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<Vec<ClassResult>>>,
}

/// One class result: index, score, and optional label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassResult {
    /// Class index within the output tensor
    pub index: u32,

    /// Score at that index
    pub value: f32,

    /// Human-readable label when the model declares a label mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup() {
        let header = RequestHeader {
            id: None,
            batch_size: 2,
            inputs: vec![
                InputRequest {
                    name: "data".to_string(),
                    byte_size: 24,
                },
                InputRequest {
                    name: "mask".to_string(),
                    byte_size: 8,
                },
            ],
            outputs: vec![OutputRequest {
                name: "prob".to_string(),
                byte_size: 16,
                cls_count: None,
            }],
        };

        assert_eq!(header.input_index("mask"), Some(1));
        assert_eq!(header.input_index("absent"), None);
        assert!(header.requested_output("prob").is_some());
        assert!(header.requested_output("other").is_none());
    }

    #[test]
    fn test_header_json_round_trip() {
        let json = r#"{
            "batch_size": 1,
            "inputs": [{"name": "data", "byte_size": 12}],
            "outputs": [{"name": "prob", "byte_size": 8, "cls_count": 3}]
        }"#;

        let header: RequestHeader = serde_json::from_str(json).unwrap();
        assert_eq!(header.batch_size, 1);
        assert_eq!(header.inputs[0].byte_size, 12);
        assert_eq!(header.outputs[0].cls_count, Some(3));

        let back = serde_json::to_string(&header).unwrap();
        let again: RequestHeader = serde_json::from_str(&back).unwrap();
        assert_eq!(header, again);
    }

    #[test]
    fn test_malformed_header_json() {
        assert!(serde_json::from_str::<RequestHeader>("{\"inputs\": 3}").is_err());
    }
}
