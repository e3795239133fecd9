//! Common identity and tensor datatype definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel model version meaning "no specific version requested"
pub const NO_VERSION: i64 = -1;

/// Identity of one served model version
///
/// Immutable once a servable is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelIdentity {
    /// Model name (e.g. "resnet50")
    pub name: String,

    /// Model version, or [`NO_VERSION`] when unspecified
    pub version: i64,
}

impl ModelIdentity {
    pub fn new(name: impl Into<String>, version: i64) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Version rendered for metric labels and logs ("none" when unspecified)
    pub fn version_label(&self) -> String {
        if self.version < 0 {
            "none".to_string()
        } else {
            self.version.to_string()
        }
    }
}

impl fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version < 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.name, self.version)
        }
    }
}

/// Tensor element datatypes declared by a model's input/output schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Fp16,
    Fp32,
    Fp64,
    /// Variable-length byte strings; no static element size
    String,
}

impl DataType {
    /// Size in bytes of one element, or `None` for variable-size datatypes
    pub fn size(&self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Uint8 | DataType::Int8 => Some(1),
            DataType::Uint16 | DataType::Int16 | DataType::Fp16 => Some(2),
            DataType::Uint32 | DataType::Int32 | DataType::Fp32 => Some(4),
            DataType::Uint64 | DataType::Int64 | DataType::Fp64 => Some(8),
            DataType::String => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Bool => "bool",
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Fp16 => "fp16",
            DataType::Fp32 => "fp32",
            DataType::Fp64 => "fp64",
            DataType::String => "string",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        assert_eq!(ModelIdentity::new("resnet50", 3).to_string(), "resnet50:3");
        assert_eq!(ModelIdentity::new("resnet50", NO_VERSION).to_string(), "resnet50");
    }

    #[test]
    fn test_version_label() {
        assert_eq!(ModelIdentity::new("m", 2).version_label(), "2");
        assert_eq!(ModelIdentity::new("m", NO_VERSION).version_label(), "none");
    }

    #[test]
    fn test_datatype_sizes() {
        assert_eq!(DataType::Fp32.size(), Some(4));
        assert_eq!(DataType::Int64.size(), Some(8));
        assert_eq!(DataType::Bool.size(), Some(1));
        assert_eq!(DataType::String.size(), None);
    }

    #[test]
    fn test_datatype_serde() {
        let dt: DataType = serde_json::from_str("\"fp32\"").unwrap();
        assert_eq!(dt, DataType::Fp32);
        assert_eq!(serde_json::to_string(&DataType::Int8).unwrap(), "\"int8\"");
    }
}
