//! Query inputs and ranked outputs.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::node::{KnowledgeNode, NodeStatus, NodeType};

/// Criteria for listing nodes. Every field left unset matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFilter {
    pub node_type: Option<NodeType>,
    pub status: Option<NodeStatus>,

    /// Inclusive lower bound on confidence.
    pub min_confidence: Option<f64>,

    /// All of these must be present, compared exactly.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Some embedded relation must target this id.
    pub related_to: Option<String>,

    /// Case-insensitive substring over title, content and tags.
    pub search_query: Option<String>,
}

impl NodeFilter {
    /// A filter that matches every node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only nodes of this type.
    pub fn with_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    /// Only nodes with this status.
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Only nodes at or above this confidence.
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    /// Require these tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Only nodes with an embedded relation to `id`.
    pub fn with_related_to(mut self, id: impl Into<String>) -> Self {
        self.related_to = Some(id.into());
        self
    }

    /// Only nodes whose text contains `query`.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    /// Whether `node` satisfies every criterion that is set.
    pub fn matches(&self, node: &KnowledgeNode) -> bool {
        if self.node_type.is_some_and(|t| t != node.node_type) {
            return false;
        }
        if self.status.is_some_and(|s| s != node.status) {
            return false;
        }
        if self.min_confidence.is_some_and(|min| node.confidence < min) {
            return false;
        }
        if !self.tags.iter().all(|tag| node.has_tag(tag)) {
            return false;
        }
        if let Some(target) = &self.related_to {
            if !node.relates_to(target) {
                return false;
            }
        }
        if let Some(query) = &self.search_query {
            let needle = query.to_lowercase();
            if !node.searchable_text().to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// How a tag search combines the requested tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMatchMode {
    /// Every requested tag must be present.
    #[default]
    All,
    /// At least one requested tag must be present.
    Any,
}

impl std::str::FromStr for TagMatchMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(TagMatchMode::All),
            "any" => Ok(TagMatchMode::Any),
            _ => Err(ModelError::InvalidTagMatchMode(s.to_string())),
        }
    }
}

/// A node paired with its ranking score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub node: KnowledgeNode,
    pub score: f64,
}

impl SearchResult {
    /// Pair a node with its score.
    pub fn new(node: KnowledgeNode, score: f64) -> Self {
        Self { node, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::{Relation, RelationType};

    fn sample() -> KnowledgeNode {
        KnowledgeNode::new("dec-1", NodeType::Decision, "Use PostgreSQL", "ACID guarantees")
            .with_tags(["database", "Storage"])
            .with_confidence(0.9)
            .with_relation(Relation::new(RelationType::Affects, "comp-1", 0.8))
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(NodeFilter::new().matches(&sample()));
    }

    #[test]
    fn test_filter_criteria() {
        let node = sample();
        assert!(NodeFilter::new().with_type(NodeType::Decision).matches(&node));
        assert!(!NodeFilter::new().with_type(NodeType::Issue).matches(&node));
        assert!(!NodeFilter::new().with_status(NodeStatus::Superseded).matches(&node));
        assert!(NodeFilter::new().with_min_confidence(0.9).matches(&node));
        assert!(!NodeFilter::new().with_min_confidence(0.95).matches(&node));
        assert!(NodeFilter::new().with_related_to("comp-1").matches(&node));
        assert!(!NodeFilter::new().with_related_to("comp-2").matches(&node));
    }

    #[test]
    fn test_filter_tags_are_exact() {
        let node = sample();
        assert!(NodeFilter::new().with_tags(["database", "Storage"]).matches(&node));
        assert!(!NodeFilter::new().with_tags(["storage"]).matches(&node));
        assert!(!NodeFilter::new().with_tags(["database", "sql"]).matches(&node));
    }

    #[test]
    fn test_filter_query_is_case_insensitive() {
        let node = sample();
        assert!(NodeFilter::new().with_query("postgresql").matches(&node));
        assert!(NodeFilter::new().with_query("acid GUARANTEES").matches(&node));
        assert!(NodeFilter::new().with_query("storage").matches(&node));
        assert!(!NodeFilter::new().with_query("mysql").matches(&node));
    }

    #[test]
    fn test_tag_match_mode_from_str() {
        assert_eq!("ANY".parse::<TagMatchMode>().unwrap(), TagMatchMode::Any);
        assert_eq!("all".parse::<TagMatchMode>().unwrap(), TagMatchMode::All);
        assert!("some".parse::<TagMatchMode>().is_err());
    }
}
