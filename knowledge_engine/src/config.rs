//! Engine configuration, loadable from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KnowledgeError, Result};

/// Settings for a [`crate::KnowledgeEngine`].
///
/// ```toml
/// root = ".knowledge"
/// auto_create_threshold = 0.7
/// default_search_limit = 20
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Store root holding `nodes/` and `graph.json`.
    pub root: PathBuf,

    /// Inferred relations at or above this confidence are created on capture.
    pub auto_create_threshold: f64,

    /// Confidence given to newly captured nodes.
    pub default_confidence: f64,

    pub default_search_limit: usize,

    /// Maximum entries in a rendered context digest.
    pub context_result_limit: usize,

    /// Default traversal depth for related-node lookups.
    pub related_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            auto_create_threshold: 0.7,
            default_confidence: 0.8,
            default_search_limit: 10,
            context_result_limit: 5,
            related_depth: 2,
        }
    }
}

impl EngineConfig {
    /// Default settings rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Set the auto-create threshold.
    pub fn with_auto_create_threshold(mut self, threshold: f64) -> Self {
        self.auto_create_threshold = threshold;
        self
    }

    /// Set the confidence given to captured nodes.
    pub fn with_default_confidence(mut self, confidence: f64) -> Self {
        self.default_confidence = confidence;
        self
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)
            .map_err(|e| KnowledgeError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| KnowledgeError::io("read", path, e))?;
        Self::from_toml_str(&text)
    }

    /// Check that the root is set and the threshold and default confidence lie in [0, 1].
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(KnowledgeError::Config("root must be set".to_string()));
        }
        if !(0.0..=1.0).contains(&self.auto_create_threshold) {
            return Err(KnowledgeError::Config(format!(
                "auto_create_threshold must be within [0, 1], got {}",
                self.auto_create_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(KnowledgeError::Config(format!(
                "default_confidence must be within [0, 1], got {}",
                self.default_confidence
            )));
        }
        Ok(())
    }

    /// Directory holding the node files.
    pub fn nodes_dir(&self) -> PathBuf {
        self.root.join("nodes")
    }

    /// Location of the graph index.
    pub fn graph_path(&self) -> PathBuf {
        self.root.join("graph.json")
    }
}
