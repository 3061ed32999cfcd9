//! Errors raised while parsing model values from text.

use thiserror::Error;

/// Failure to interpret a string as one of the enumerated model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid node type: \"{0}\" (expected one of: decision, component, convention, concept, session, pattern, issue)")]
    InvalidNodeType(String),

    #[error("invalid node status: \"{0}\" (expected one of: active, needs_review, superseded)")]
    InvalidNodeStatus(String),

    #[error("invalid relation type: \"{0}\" (expected one of: affects, uses, supersedes, relates_to, implements, depends_on, derived_from)")]
    InvalidRelationType(String),

    #[error("invalid tag match mode: \"{0}\" (expected \"all\" or \"any\")")]
    InvalidTagMatchMode(String),
}
