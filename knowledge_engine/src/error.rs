//! Error types for the knowledge engine.

use std::io;
use std::path::Path;

use knowledge_model::ModelError;
use thiserror::Error;

/// Errors returned by storage, search and the engine facade.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("node not found: {id}")]
    NotFound { id: String },

    #[error("node already exists: {id}")]
    AlreadyExists { id: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for knowledge engine operations.
pub type Result<T> = std::result::Result<T, KnowledgeError>;

impl KnowledgeError {
    /// A missing node.
    pub fn not_found(id: impl Into<String>) -> Self {
        KnowledgeError::NotFound { id: id.into() }
    }

    /// A node id that is already taken.
    pub fn already_exists(id: impl Into<String>) -> Self {
        KnowledgeError::AlreadyExists { id: id.into() }
    }

    /// An invalid value or malformed file.
    pub fn validation(message: impl Into<String>) -> Self {
        KnowledgeError::Validation(message.into())
    }

    /// Wrap an I/O failure with the action and path that produced it.
    pub fn io(action: &str, path: &Path, source: io::Error) -> Self {
        KnowledgeError::Io {
            context: format!("{action} {}", path.display()),
            source,
        }
    }

    /// Whether this is a [`KnowledgeError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, KnowledgeError::NotFound { .. })
    }
}

impl From<ModelError> for KnowledgeError {
    fn from(err: ModelError) -> Self {
        KnowledgeError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_becomes_validation() {
        let err: KnowledgeError = "widget".parse::<knowledge_model::NodeType>().unwrap_err().into();
        assert!(matches!(err, KnowledgeError::Validation(ref msg) if msg.contains("widget")));
    }

    #[test]
    fn test_io_context_in_message() {
        let err = KnowledgeError::io(
            "write",
            Path::new("/tmp/graph.json"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("write /tmp/graph.json"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(KnowledgeError::not_found("x").is_not_found());
        assert!(!KnowledgeError::already_exists("x").is_not_found());
    }
}
