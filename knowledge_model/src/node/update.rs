//! Partial-field node updates.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{clamp_confidence, KnowledgeNode, NodeStatus};

/// A set of optional field replacements applied to an existing node.
///
/// `id`, `type` and `created` are deliberately absent: they never change
/// after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub references: Option<Vec<String>>,
    pub status: Option<NodeStatus>,
    pub confidence: Option<f64>,
}

impl NodeUpdate {
    /// An update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replace the content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Replace the tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the file references.
    pub fn references<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references = Some(references.into_iter().map(Into::into).collect());
        self
    }

    /// Change the status.
    pub fn status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Change the confidence.
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Names of the fields this update replaces, in declaration order.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.content.is_some() {
            fields.push("content");
        }
        if self.tags.is_some() {
            fields.push("tags");
        }
        if self.references.is_some() {
            fields.push("references");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.confidence.is_some() {
            fields.push("confidence");
        }
        fields
    }
}

impl KnowledgeNode {
    /// Apply a partial update and refresh `modified`.
    ///
    /// Confidence is clamped to [0, 1]. `created` is never touched.
    pub fn apply_update(&mut self, update: NodeUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(references) = update.references {
            self.references = references;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(confidence) = update.confidence {
            self.confidence = clamp_confidence(confidence);
        }
        self.modified = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;
    use chrono::Duration;

    #[test]
    fn test_empty_update() {
        let update = NodeUpdate::new();
        assert!(update.is_empty());
        assert!(update.changed_fields().is_empty());
    }

    #[test]
    fn test_changed_fields() {
        let update = NodeUpdate::new()
            .title("New")
            .status(NodeStatus::Superseded)
            .confidence(0.5);
        assert_eq!(update.changed_fields(), vec!["title", "status", "confidence"]);
    }

    #[test]
    fn test_apply_update_preserves_created() {
        let mut node = KnowledgeNode::new("n-1", NodeType::Issue, "Slow query", "Takes 3s");
        let created = node.created - Duration::days(10);
        node.created = created;
        node.modified = created;

        node.apply_update(
            NodeUpdate::new()
                .content("Takes 5s")
                .tags(["perf"])
                .status(NodeStatus::NeedsReview)
                .confidence(2.0),
        );

        assert_eq!(node.created, created);
        assert!(node.modified > created);
        assert_eq!(node.title, "Slow query");
        assert_eq!(node.content, "Takes 5s");
        assert_eq!(node.tags, vec!["perf"]);
        assert_eq!(node.status, NodeStatus::NeedsReview);
        assert_eq!(node.confidence, 1.0);
    }

    #[test]
    fn test_nan_confidence_update_is_clamped() {
        let mut node = KnowledgeNode::new("n-1", NodeType::Issue, "Slow query", "Takes 3s");
        node.apply_update(NodeUpdate::new().confidence(f64::NAN));
        assert_eq!(node.confidence, 0.0);
    }

    #[test]
    fn test_any_status_transition_allowed() {
        let mut node = KnowledgeNode::new("n-1", NodeType::Decision, "D", "d")
            .with_status(NodeStatus::Superseded);
        node.apply_update(NodeUpdate::new().status(NodeStatus::Active));
        assert_eq!(node.status, NodeStatus::Active);
    }
}
