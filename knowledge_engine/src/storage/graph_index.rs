//! Graph Index - the persisted adjacency list of typed relations.
//!
//! Held fully in memory and rewritten wholesale on every mutation. A mutation
//! is applied to a copy, saved, and only then swapped in, so a failed save
//! leaves memory matching disk. Lookups are linear scans.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use knowledge_model::{DirectedRelation, GraphRelation, RelationDirection, RelationType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::atomic::write_atomic;
use crate::error::{KnowledgeError, Result};
use crate::validate::check_confidence;

/// On-disk format version of `graph.json`.
pub const GRAPH_FORMAT_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDocument {
    version: String,
    last_updated: String,
    #[serde(default)]
    relations: Vec<GraphRelation>,
}

/// Relation counts for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStatistics {
    pub total_relations: usize,
    /// One entry per relation type, in fixed enum order.
    pub by_type: Vec<(RelationType, usize)>,
}

/// Relations queryable from either endpoint without loading any node.
#[derive(Debug, Clone)]
pub struct GraphIndex {
    path: PathBuf,
    relations: Vec<GraphRelation>,
}

impl GraphIndex {
    /// An empty, unloaded index backed by `<root>/graph.json`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join("graph.json"),
            relations: Vec::new(),
        }
    }

    /// Create and load in one step.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let mut index = Self::new(root);
        index.load()?;
        Ok(index)
    }

    /// Location of `graph.json`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load relations from disk, writing an empty index if none exists yet.
    pub fn load(&mut self) -> Result<()> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent).map_err(|e| KnowledgeError::io("create directory", parent, e))?;
                }
                self.relations.clear();
                return self.save(&[]);
            }
            Err(e) => return Err(KnowledgeError::io("read", &self.path, e)),
        };

        let document: GraphDocument = serde_json::from_str(&text).map_err(|e| {
            KnowledgeError::validation(format!("malformed graph index {}: {e}", self.path.display()))
        })?;
        self.relations = document.relations;
        debug!(path = %self.path.display(), relations = self.relations.len(), "Loaded graph index");
        Ok(())
    }

    /// Insert a relation, or overwrite the description and confidence of the
    /// existing one with the same (source, target, type).
    ///
    /// Confidence is clamped to [0, 1]; a non-finite value is a validation error.
    pub fn add_relation(
        &mut self,
        source: &str,
        target: &str,
        relation_type: RelationType,
        description: &str,
        confidence: f64,
    ) -> Result<()> {
        let confidence = check_confidence(confidence)?;

        let mut updated = self.relations.clone();
        if let Some(existing) = updated.iter_mut().find(|r| r.matches(source, target, relation_type)) {
            existing.description = description.to_string();
            existing.confidence = confidence;
        } else {
            updated.push(GraphRelation {
                source: source.to_string(),
                target: target.to_string(),
                relation_type,
                description: description.to_string(),
                confidence,
            });
        }

        self.commit(updated)
    }

    /// Remove the exact (source, target, type) relation. Returns whether one existed.
    pub fn remove_relation(&mut self, source: &str, target: &str, relation_type: RelationType) -> Result<bool> {
        let updated: Vec<GraphRelation> = self
            .relations
            .iter()
            .filter(|r| !r.matches(source, target, relation_type))
            .cloned()
            .collect();
        if updated.len() == self.relations.len() {
            return Ok(false);
        }
        self.commit(updated)?;
        Ok(true)
    }

    /// Remove every relation with `id` at either end. Returns how many were removed.
    pub fn remove_node_relations(&mut self, id: &str) -> Result<usize> {
        let updated: Vec<GraphRelation> = self.relations.iter().filter(|r| !r.involves(id)).cloned().collect();
        let removed = self.relations.len() - updated.len();
        if removed > 0 {
            self.commit(updated)?;
        }
        Ok(removed)
    }

    /// Relations touching `id`, each tagged with its direction.
    ///
    /// A self-relation is reported once, as outgoing.
    pub fn get_node_relations(&self, id: &str) -> Vec<DirectedRelation> {
        self.relations
            .iter()
            .filter_map(|r| {
                let direction = if r.source == id {
                    RelationDirection::Outgoing
                } else if r.target == id {
                    RelationDirection::Incoming
                } else {
                    return None;
                };
                Some(DirectedRelation {
                    relation: r.clone(),
                    direction,
                })
            })
            .collect()
    }

    /// Distinct neighbor ids in either direction, in first-seen order.
    pub fn get_related_nodes(&self, id: &str) -> Vec<String> {
        let mut related: Vec<String> = Vec::new();
        for r in &self.relations {
            let neighbor = if r.source == id {
                &r.target
            } else if r.target == id {
                &r.source
            } else {
                continue;
            };
            if !related.contains(neighbor) {
                related.push(neighbor.clone());
            }
        }
        related
    }

    /// Relations with `id` as source.
    pub fn outgoing_relations(&self, id: &str) -> Vec<&GraphRelation> {
        self.relations.iter().filter(|r| r.source == id).collect()
    }

    /// Relations with `id` as target.
    pub fn incoming_relations(&self, id: &str) -> Vec<&GraphRelation> {
        self.relations.iter().filter(|r| r.target == id).collect()
    }

    /// Every relation, in insertion order.
    pub fn relations(&self) -> &[GraphRelation] {
        &self.relations
    }

    /// Total and per-type relation counts.
    pub fn statistics(&self) -> GraphStatistics {
        let by_type = RelationType::ALL
            .into_iter()
            .map(|t| (t, self.relations.iter().filter(|r| r.relation_type == t).count()))
            .collect();
        GraphStatistics {
            total_relations: self.relations.len(),
            by_type,
        }
    }

    // Persist first; memory only changes once the file is in place.
    fn commit(&mut self, relations: Vec<GraphRelation>) -> Result<()> {
        self.save(&relations)?;
        self.relations = relations;
        Ok(())
    }

    fn save(&self, relations: &[GraphRelation]) -> Result<()> {
        let document = GraphDocument {
            version: GRAPH_FORMAT_VERSION.to_string(),
            last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            relations: relations.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| KnowledgeError::validation(format!("failed to encode graph index: {e}")))?;
        write_atomic(&self.path, &json)?;
        debug!(path = %self.path.display(), relations = relations.len(), "Saved graph index");
        Ok(())
    }
}
