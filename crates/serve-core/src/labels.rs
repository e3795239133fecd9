//! Label provider contract
//!
//! Maps (output name, class index) to a human-readable label. Response
//! providers consult the provider when finalizing class results for outputs
//! whose model configuration declares a label mapping. Providers are
//! read-only after load.

use crate::{ErrorContext, ModelConfig, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Trait for looking up class labels for a model output
pub trait LabelProvider: Send + Sync {
    /// Return the label for `index` of output `name`, if one is known
    fn lookup(&self, name: &str, index: usize) -> Option<&str>;
}

/// Label provider with no labels
///
/// Used until a servable is configured, and by models that declare no
/// label mapping.
#[derive(Debug, Default)]
pub struct EmptyLabelProvider;

impl LabelProvider for EmptyLabelProvider {
    fn lookup(&self, _name: &str, _index: usize) -> Option<&str> {
        None
    }
}

/// In-memory label provider, for tests and embedding callers
#[derive(Debug, Default)]
pub struct StaticLabelProvider {
    labels: HashMap<String, Vec<String>>,
}

impl StaticLabelProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ordered label list for one output
    pub fn with_labels(
        mut self,
        output: impl Into<String>,
        labels: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.labels
            .insert(output.into(), labels.into_iter().map(Into::into).collect());
        self
    }
}

impl LabelProvider for StaticLabelProvider {
    fn lookup(&self, name: &str, index: usize) -> Option<&str> {
        self.labels.get(name)?.get(index).map(String::as_str)
    }
}

/// Label provider backed by label files in the model's label root
///
/// Each output with a declared `label_filename` is read as one label per
/// line from `<root>/<label_filename>`.
#[derive(Debug, Default)]
pub struct FileLabelProvider {
    labels: HashMap<String, Vec<String>>,
}

impl FileLabelProvider {
    /// Load label files for every output of `config` that declares one
    pub fn load(root: impl AsRef<Path>, config: &ModelConfig) -> Result<Self> {
        let root = root.as_ref();
        let mut labels = HashMap::new();

        for output in &config.outputs {
            if let Some(ref filename) = output.label_filename {
                let path = root.join(filename);
                let content = fs::read_to_string(&path).with_context_fn(|| {
                    format!("unable to read label file '{}'", path.display())
                })?;
                let lines: Vec<String> = content.lines().map(str::to_string).collect();
                labels.insert(output.name.clone(), lines);
            }
        }

        Ok(Self { labels })
    }
}

impl LabelProvider for FileLabelProvider {
    fn lookup(&self, name: &str, index: usize) -> Option<&str> {
        self.labels.get(name)?.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataType;
    use std::io::Write;

    #[test]
    fn test_static_provider() {
        let provider = StaticLabelProvider::new().with_labels("prob", ["cat", "dog"]);

        assert_eq!(provider.lookup("prob", 0), Some("cat"));
        assert_eq!(provider.lookup("prob", 1), Some("dog"));
        assert_eq!(provider.lookup("prob", 2), None);
        assert_eq!(provider.lookup("other", 0), None);
    }

    #[test]
    fn test_empty_provider() {
        assert_eq!(EmptyLabelProvider.lookup("prob", 0), None);
    }

    #[test]
    fn test_file_provider() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("labels.txt")).unwrap();
        writeln!(file, "tench").unwrap();
        writeln!(file, "goldfish").unwrap();

        let config = ModelConfig::new("classifier").with_labeled_output(
            "prob",
            DataType::Fp32,
            vec![2],
            "labels.txt",
        );

        let provider = FileLabelProvider::load(dir.path(), &config).unwrap();
        assert_eq!(provider.lookup("prob", 0), Some("tench"));
        assert_eq!(provider.lookup("prob", 1), Some("goldfish"));
        assert_eq!(provider.lookup("prob", 2), None);
    }

    #[test]
    fn test_file_provider_skips_unlabeled_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig::new("detector").with_output("boxes", DataType::Fp32, vec![4]);

        let provider = FileLabelProvider::load(dir.path(), &config).unwrap();
        assert_eq!(provider.lookup("boxes", 0), None);
    }

    #[test]
    fn test_file_provider_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig::new("classifier").with_labeled_output(
            "prob",
            DataType::Fp32,
            vec![2],
            "absent.txt",
        );

        let err = FileLabelProvider::load(dir.path(), &config).unwrap_err();
        assert!(err.to_string().contains("absent.txt"));
    }
}
