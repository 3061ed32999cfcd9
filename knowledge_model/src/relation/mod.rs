//! Typed, directed relations between knowledge nodes.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::node::clamp_confidence;

/// Kinds of relation between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// A decision changes how a component works.
    Affects,
    /// One component relies on another.
    Uses,
    /// A newer decision replaces an older one.
    Supersedes,
    /// Loosely related.
    RelatesTo,
    /// A component is an instance of a pattern.
    Implements,
    DependsOn,
    DerivedFrom,
}

impl RelationType {
    pub const ALL: [RelationType; 7] = [
        RelationType::Affects,
        RelationType::Uses,
        RelationType::Supersedes,
        RelationType::RelatesTo,
        RelationType::Implements,
        RelationType::DependsOn,
        RelationType::DerivedFrom,
    ];

    /// The snake_case name used on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Affects => "affects",
            RelationType::Uses => "uses",
            RelationType::Supersedes => "supersedes",
            RelationType::RelatesTo => "relates_to",
            RelationType::Implements => "implements",
            RelationType::DependsOn => "depends_on",
            RelationType::DerivedFrom => "derived_from",
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        RelationType::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| ModelError::InvalidRelationType(s.to_string()))
    }
}

/// A relation embedded in its source node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub relation_type: RelationType,

    /// Id of the target node. A weak reference: the target may not exist.
    pub target: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Certainty in [0, 1].
    pub confidence: f64,
}

impl Relation {
    /// Create a relation with an empty description.
    pub fn new(relation_type: RelationType, target: impl Into<String>, confidence: f64) -> Self {
        Self {
            relation_type,
            target: target.into(),
            description: String::new(),
            confidence: clamp_confidence(confidence),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The same fact as a graph index entry originating at `source`.
    pub fn to_graph_relation(&self, source: impl Into<String>) -> GraphRelation {
        GraphRelation {
            source: source.into(),
            target: self.target.clone(),
            relation_type: self.relation_type,
            description: self.description.clone(),
            confidence: self.confidence,
        }
    }
}

/// A relation as stored in the graph index, queryable from either endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelation {
    pub source: String,
    pub target: String,

    #[serde(rename = "type")]
    pub relation_type: RelationType,

    #[serde(default)]
    pub description: String,

    pub confidence: f64,
}

impl GraphRelation {
    /// Whether this entry has exactly the given (source, target, type) triple.
    pub fn matches(&self, source: &str, target: &str, relation_type: RelationType) -> bool {
        self.source == source && self.target == target && self.relation_type == relation_type
    }

    /// Whether `node_id` is either endpoint.
    pub fn involves(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// Drop the source and keep the rest as an embedded relation.
    pub fn to_relation(&self) -> Relation {
        Relation {
            relation_type: self.relation_type,
            target: self.target.clone(),
            description: self.description.clone(),
            confidence: self.confidence,
        }
    }
}

/// Which end of a relation a queried node sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationDirection {
    /// The queried node is the source.
    Outgoing,
    /// The queried node is the target.
    Incoming,
}

impl std::fmt::Display for RelationDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationDirection::Outgoing => f.write_str("outgoing"),
            RelationDirection::Incoming => f.write_str("incoming"),
        }
    }
}

/// A graph relation tagged with its direction relative to a queried node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectedRelation {
    #[serde(flatten)]
    pub relation: GraphRelation,
    pub direction: RelationDirection,
}
