//! Node type classification.

mod classifier;
pub mod heuristics;

pub use classifier::*;
pub use heuristics::{classify_node_type, suggest_alternatives, ClassificationResult};
