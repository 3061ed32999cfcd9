//! The knowledge node - a typed unit of captured knowledge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{clamp_confidence, NodeStatus, NodeType};
use crate::relation::Relation;

/// Confidence given to a node when none is specified.
pub const DEFAULT_NODE_CONFIDENCE: f64 = 0.8;

/// Provenance tag recorded when a node is captured by hand.
pub const DEFAULT_NODE_SOURCE: &str = "manual";

/// A piece of institutional knowledge stored as one markdown file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeNode {
    /// Caller-assigned identifier, unique within a store.
    pub id: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    pub title: String,

    /// Markdown body.
    pub content: String,

    /// Stored as given; compared case-insensitively by the heuristics.
    pub tags: Vec<String>,

    /// Embedded relations. Targets are lookup keys and need not exist.
    pub relations: Vec<Relation>,

    /// Certainty in [0, 1].
    pub confidence: f64,

    /// Set once at construction.
    pub created: DateTime<Utc>,

    /// Refreshed by every update.
    pub modified: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,

    /// Free-text provenance tag (e.g. `manual`, `hook_commit`).
    pub source: String,

    /// File paths this node pertains to.
    pub references: Vec<String>,

    pub status: NodeStatus,
}

impl KnowledgeNode {
    /// Create a new active node with default confidence and no tags, relations, or references.
    pub fn new(
        id: impl Into<String>,
        node_type: NodeType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            node_type,
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            relations: Vec::new(),
            confidence: DEFAULT_NODE_CONFIDENCE,
            created: now,
            modified: now,
            session: None,
            source: DEFAULT_NODE_SOURCE.to_string(),
            references: Vec::new(),
            status: NodeStatus::Active,
        }
    }

    /// Add a tag unless an identical one is already present.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Add multiple tags.
    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tags.into_iter().fold(self, |node, tag| node.with_tag(tag))
    }

    /// Add a file reference.
    pub fn with_reference(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !self.references.contains(&path) {
            self.references.push(path);
        }
        self
    }

    /// Add multiple file references.
    pub fn with_references<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paths.into_iter().fold(self, |node, path| node.with_reference(path))
    }

    /// Set the session id. An empty id leaves the node without a session.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        let session = session.into();
        self.session = (!session.is_empty()).then_some(session);
        self
    }

    /// Set the provenance tag.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    /// Set the lifecycle status.
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    /// Embed a relation.
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Exact, case-sensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether any embedded relation points at `target`.
    pub fn relates_to(&self, target: &str) -> bool {
        self.relations.iter().any(|r| r.target == target)
    }

    /// Whether any reference equals `path` exactly.
    pub fn references_file(&self, path: &str) -> bool {
        self.references.iter().any(|r| r == path)
    }

    /// Title, content, and tags joined by spaces. Not lowercased.
    pub fn searchable_text(&self) -> String {
        format!("{} {} {}", self.title, self.content, self.tags.join(" "))
    }

    /// Fractional days between the last modification and `now`.
    pub fn age_in_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.modified).num_milliseconds() as f64 / 86_400_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::RelationType;
    use chrono::Duration;

    #[test]
    fn test_node_defaults() {
        let node = KnowledgeNode::new("dec-1", NodeType::Decision, "Use PostgreSQL", "We chose it");
        assert_eq!(node.id, "dec-1");
        assert_eq!(node.confidence, DEFAULT_NODE_CONFIDENCE);
        assert_eq!(node.source, "manual");
        assert_eq!(node.status, NodeStatus::Active);
        assert_eq!(node.created, node.modified);
        assert!(node.tags.is_empty());
        assert!(node.relations.is_empty());
        assert!(node.session.is_none());
    }

    #[test]
    fn test_node_builder() {
        let node = KnowledgeNode::new("comp-1", NodeType::Component, "Auth Service", "Handles login")
            .with_tags(["auth", "security", "auth"])
            .with_references(["src/auth.rs"])
            .with_session("session-1")
            .with_source("hook_write")
            .with_relation(Relation::new(RelationType::Uses, "comp-2", 0.8));

        assert_eq!(node.tags, vec!["auth", "security"]);
        assert!(node.has_tag("auth"));
        assert!(!node.has_tag("Auth"));
        assert!(node.references_file("src/auth.rs"));
        assert!(node.relates_to("comp-2"));
        assert_eq!(node.session.as_deref(), Some("session-1"));
        assert_eq!(node.source, "hook_write");
    }

    #[test]
    fn test_confidence_clamping() {
        let high = KnowledgeNode::new("a", NodeType::Concept, "A", "a").with_confidence(1.4);
        assert_eq!(high.confidence, 1.0);

        let low = KnowledgeNode::new("b", NodeType::Concept, "B", "b").with_confidence(-0.2);
        assert_eq!(low.confidence, 0.0);

        let nan = KnowledgeNode::new("c", NodeType::Concept, "C", "c").with_confidence(f64::NAN);
        assert_eq!(nan.confidence, 0.0);
    }

    #[test]
    fn test_empty_session_is_none() {
        let node = KnowledgeNode::new("a", NodeType::Session, "A", "a").with_session("");
        assert_eq!(node.session, None);
    }

    #[test]
    fn test_searchable_text() {
        let node = KnowledgeNode::new("a", NodeType::Concept, "Order Lifecycle", "Orders move")
            .with_tags(["domain", "orders"]);
        assert_eq!(node.searchable_text(), "Order Lifecycle Orders move domain orders");
    }

    #[test]
    fn test_age_in_days() {
        let mut node = KnowledgeNode::new("a", NodeType::Concept, "A", "a");
        let now = node.modified;
        node.modified = now - Duration::days(3);
        assert!((node.age_in_days(now) - 3.0).abs() < 0.001);
    }
}
