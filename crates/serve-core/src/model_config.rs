//! Model configuration value structs
//!
//! The declared input/output schema, batching parameters, and scheduler
//! runner count for one model. Parsing configuration files is out of scope
//! for this layer; these are plain owned values handed in by the model
//! repository layer and frozen once a servable is configured.

use crate::{DataType, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Declared configuration for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name
    pub name: String,

    /// Maximum batch size accepted by the model (0 = no batching)
    pub max_batch_size: u32,

    /// Requested number of parallel runner lanes in the scheduler
    pub runner_count: u32,

    /// Declared inputs
    pub inputs: Vec<ModelInput>,

    /// Declared outputs
    pub outputs: Vec<ModelOutput>,
}

/// Declared configuration for one model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInput {
    /// Input tensor name
    pub name: String,

    /// Element datatype
    pub datatype: DataType,

    /// Declared dims, excluding the batch dimension
    pub dims: Vec<i64>,
}

/// Declared configuration for one model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    /// Output tensor name
    pub name: String,

    /// Element datatype
    pub datatype: DataType,

    /// Declared dims, excluding the batch dimension
    pub dims: Vec<i64>,

    /// Label file for this output, relative to the model's label root,
    /// when the model declares a label mapping
    pub label_filename: Option<String>,
}

impl ModelConfig {
    /// Create a new ModelConfig with required fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_batch_size: 0,
            runner_count: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Builder pattern for schema fields
    pub fn with_max_batch_size(mut self, size: u32) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn with_runner_count(mut self, count: u32) -> Self {
        self.runner_count = count;
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, datatype: DataType, dims: Vec<i64>) -> Self {
        self.inputs.push(ModelInput {
            name: name.into(),
            datatype,
            dims,
        });
        self
    }

    pub fn with_output(
        mut self,
        name: impl Into<String>,
        datatype: DataType,
        dims: Vec<i64>,
    ) -> Self {
        self.outputs.push(ModelOutput {
            name: name.into(),
            datatype,
            dims,
            label_filename: None,
        });
        self
    }

    pub fn with_labeled_output(
        mut self,
        name: impl Into<String>,
        datatype: DataType,
        dims: Vec<i64>,
        label_filename: impl Into<String>,
    ) -> Self {
        self.outputs.push(ModelOutput {
            name: name.into(),
            datatype,
            dims,
            label_filename: Some(label_filename.into()),
        });
        self
    }

    /// Look up the declared configuration for a named input
    pub fn input(&self, name: &str) -> Option<&ModelInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Look up the declared configuration for a named output
    pub fn output(&self, name: &str) -> Option<&ModelOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Validate structural soundness: non-empty name, unique input and
    /// output names
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_argument("model configuration has no name"));
        }

        let mut seen = HashSet::new();
        for input in &self.inputs {
            if !seen.insert(input.name.as_str()) {
                return Err(Error::invalid_argument(format!(
                    "duplicate input '{}' in configuration for model '{}'",
                    input.name, self.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for output in &self.outputs {
            if !seen.insert(output.name.as_str()) {
                return Err(Error::invalid_argument(format!(
                    "duplicate output '{}' in configuration for model '{}'",
                    output.name, self.name
                )));
            }
        }

        Ok(())
    }
}

impl ModelInput {
    /// Number of elements in one (non-batched) tensor, or `None` when a
    /// dim is variable (-1)
    pub fn element_count(&self) -> Option<u64> {
        let mut count: u64 = 1;
        for dim in &self.dims {
            if *dim < 0 {
                return None;
            }
            count = count.checked_mul(*dim as u64)?;
        }
        Some(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> ModelConfig {
        ModelConfig::new("resnet50")
            .with_max_batch_size(8)
            .with_input("data", DataType::Fp32, vec![3, 224, 224])
            .with_labeled_output("prob", DataType::Fp32, vec![1000], "labels.txt")
    }

    #[test]
    fn test_config_lookup() {
        let config = sample_config();
        assert_eq!(config.input("data").unwrap().datatype, DataType::Fp32);
        assert!(config.input("missing").is_none());
        assert_eq!(
            config.output("prob").unwrap().label_filename.as_deref(),
            Some("labels.txt")
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(sample_config().validate().is_ok());

        let dup = sample_config().with_input("data", DataType::Int8, vec![1]);
        let err = dup.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("duplicate input 'data'"));

        assert!(ModelConfig::new("").validate().is_err());
    }

    #[test]
    fn test_element_count() {
        let config = sample_config();
        assert_eq!(config.input("data").unwrap().element_count(), Some(3 * 224 * 224));

        let variable = ModelInput {
            name: "tokens".to_string(),
            datatype: DataType::Int64,
            dims: vec![-1],
        };
        assert_eq!(variable.element_count(), None);
    }
}
