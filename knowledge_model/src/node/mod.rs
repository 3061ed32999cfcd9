//! Knowledge node definitions.

mod knowledge_node;
mod update;

pub use knowledge_node::*;
pub use update::*;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// The seven kinds of captured knowledge.
///
/// Declaration order is significant: it is the fixed order used for directory
/// probing, classification tie-breaking, and per-type reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Architectural decisions and design choices.
    Decision,
    /// Code components, modules, and services.
    Component,
    /// Coding conventions and standards.
    Convention,
    /// Domain concepts and business logic.
    Concept,
    /// Coding session summaries.
    Session,
    /// Design patterns and reusable solutions.
    Pattern,
    /// Known issues and technical debt.
    Issue,
}

impl NodeType {
    /// All node types in their fixed order.
    pub const ALL: [NodeType; 7] = [
        NodeType::Decision,
        NodeType::Component,
        NodeType::Convention,
        NodeType::Concept,
        NodeType::Session,
        NodeType::Pattern,
        NodeType::Issue,
    ];

    /// The lowercase name used in frontmatter and the graph index.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Decision => "decision",
            NodeType::Component => "component",
            NodeType::Convention => "convention",
            NodeType::Concept => "concept",
            NodeType::Session => "session",
            NodeType::Pattern => "pattern",
            NodeType::Issue => "issue",
        }
    }

    /// Name of the directory holding nodes of this type (the plural form).
    pub fn dir_name(&self) -> &'static str {
        match self {
            NodeType::Decision => "decisions",
            NodeType::Component => "components",
            NodeType::Convention => "conventions",
            NodeType::Concept => "concepts",
            NodeType::Session => "sessions",
            NodeType::Pattern => "patterns",
            NodeType::Issue => "issues",
        }
    }

    /// Short human-readable description of what this type captures.
    pub fn description(&self) -> &'static str {
        match self {
            NodeType::Decision => "Architectural decisions and design choices",
            NodeType::Component => "Code components, modules, and services",
            NodeType::Convention => "Coding conventions and standards",
            NodeType::Concept => "Domain concepts and business logic",
            NodeType::Session => "Coding session summaries",
            NodeType::Pattern => "Design patterns and reusable solutions",
            NodeType::Issue => "Known issues and technical debt",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| ModelError::InvalidNodeType(s.to_string()))
    }
}

/// Review state of a node. Any value may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Active,
    NeedsReview,
    Superseded,
}

impl NodeStatus {
    pub const ALL: [NodeStatus; 3] = [
        NodeStatus::Active,
        NodeStatus::NeedsReview,
        NodeStatus::Superseded,
    ];

    /// The lowercase name used on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Active => "active",
            NodeStatus::NeedsReview => "needs_review",
            NodeStatus::Superseded => "superseded",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        NodeStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| ModelError::InvalidNodeStatus(s.to_string()))
    }
}

/// The situation in which a node was captured.
///
/// Lifecycle hooks report a context so the classifier can favour the types
/// that situation usually produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceContext {
    /// Captured right after a file write.
    HookWrite,
    /// Captured right after a commit.
    HookCommit,
    /// Captured at session end.
    HookSession,
    /// Captured explicitly by the user.
    #[default]
    Manual,
}

impl SourceContext {
    /// The label recorded as a node's source.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceContext::HookWrite => "hook_write",
            SourceContext::HookCommit => "hook_commit",
            SourceContext::HookSession => "hook_session",
            SourceContext::Manual => "manual",
        }
    }

    /// Map a free-text label to a context. Unknown labels count as manual.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "hook_write" => SourceContext::HookWrite,
            "hook_commit" => SourceContext::HookCommit,
            "hook_session" => SourceContext::HookSession,
            _ => SourceContext::Manual,
        }
    }
}

impl std::fmt::Display for SourceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a confidence into [0, 1]. NaN becomes 0.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0)
}
