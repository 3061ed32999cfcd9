//! Input checks applied before anything reaches disk.

use crate::error::{KnowledgeError, Result};

/// Accept a finite confidence, clamped to [0, 1].
///
/// NaN and infinities are rejected: they cannot be written to the graph
/// index or to frontmatter in a form that reads back.
pub fn check_confidence(confidence: f64) -> Result<f64> {
    if !confidence.is_finite() {
        return Err(KnowledgeError::validation(format!(
            "confidence must be a finite number, got {confidence}"
        )));
    }
    Ok(confidence.clamp(0.0, 1.0))
}

/// Reject ids that are empty or could address a file outside the store.
pub fn check_node_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(KnowledgeError::validation("node id must not be empty"));
    }
    if id.contains(['/', '\\', '\0']) || id.contains("..") {
        return Err(KnowledgeError::validation(format!(
            "node id {id:?} must not contain path separators or \"..\""
        )));
    }
    Ok(())
}
