//! The knowledge engine facade.
//!
//! Composes the node store, graph index, classifier, relation inferrer and
//! context scorer behind the operations a transport adapter exposes. The
//! graph index is the authoritative relation set; relations embedded in node
//! files are a derived copy refreshed with
//! [`KnowledgeEngine::refresh_embedded_relations`].

use knowledge_model::{
    KnowledgeNode, NodeFilter, NodeStatus, NodeType, NodeUpdate, RelationType, SearchResult, SourceContext,
    TagMatchMode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classification::{ClassificationOptions, ClassificationResponse, Classifier};
use crate::config::EngineConfig;
use crate::enrichment::{format_context_results, group_by_action, infer_relations, score_nodes_for_context};
use crate::enrichment::{ContextSignals, InferredRelation, ScoredNode};
use crate::error::{KnowledgeError, Result};
use crate::id::generate_node_id;
use crate::storage::{GraphIndex, GraphStatistics, NodeStore, SearchEngine};
use crate::validate::{check_confidence, check_node_id};

/// Confidence used by [`KnowledgeEngine::relate`] when none is given.
pub const DEFAULT_RELATION_CONFIDENCE: f64 = 0.8;

/// Nodes below this confidence count as low in [`StatusReport`].
const LOW_CONFIDENCE_CEILING: f64 = 0.5;

/// Nodes at or above this confidence count as high in [`StatusReport`].
const HIGH_CONFIDENCE_FLOOR: f64 = 0.8;

/// Everything needed to capture one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureRequest {
    pub title: String,
    pub content: String,

    /// Skips classification when present.
    pub node_type: Option<NodeType>,

    pub tags: Vec<String>,
    pub references: Vec<String>,
    pub session: Option<String>,
    pub source: SourceContext,

    /// Falls back to the configured default confidence.
    pub confidence: Option<f64>,

    /// Generated from the title and type when absent.
    pub id: Option<String>,
}

impl CaptureRequest {
    /// Create a request with the given title and content.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Set the node type, skipping classification.
    pub fn with_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    /// Add tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Add file references.
    pub fn with_references<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Set the session id.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Set the capture context.
    pub fn with_source(mut self, source: SourceContext) -> Self {
        self.source = source;
        self
    }

    /// Set the node confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Use a caller-chosen id instead of a generated one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Result of a capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutcome {
    /// The stored node, including its auto-created relations.
    pub node: KnowledgeNode,
    pub classification: ClassificationResponse,
    /// Inferred relations below the auto-create threshold, left for review.
    pub suggested: Vec<InferredRelation>,
}

impl CaptureOutcome {
    /// Number of relations created automatically.
    pub fn auto_created(&self) -> usize {
        self.node.relations.len()
    }
}

/// Node counts by confidence band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfidenceBuckets {
    /// Below 0.5.
    pub low: usize,
    /// In [0.5, 0.8).
    pub medium: usize,
    /// 0.8 and above.
    pub high: usize,
}

impl ConfidenceBuckets {
    fn record(&mut self, confidence: f64) {
        if confidence < LOW_CONFIDENCE_CEILING {
            self.low += 1;
        } else if confidence < HIGH_CONFIDENCE_FLOOR {
            self.medium += 1;
        } else {
            self.high += 1;
        }
    }
}

/// Snapshot of the store's contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub total_nodes: usize,
    /// One entry per node type, in fixed enum order.
    pub by_type: Vec<(NodeType, usize)>,
    /// One entry per status, in fixed enum order.
    pub by_status: Vec<(NodeStatus, usize)>,
    pub confidence: ConfidenceBuckets,
    pub graph: GraphStatistics,
}

/// Single entry point over one knowledge store.
#[derive(Debug)]
pub struct KnowledgeEngine {
    config: EngineConfig,
    store: NodeStore,
    index: GraphIndex,
    classifier: Classifier,
}

impl KnowledgeEngine {
    /// Validate `config`, create the store layout and load the graph index.
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let store = NodeStore::new(&config.root);
        store.initialize()?;
        let index = GraphIndex::open(&config.root)?;

        info!(
            root = %config.root.display(),
            relations = index.relations().len(),
            "Opened knowledge store"
        );

        Ok(Self {
            config,
            store,
            index,
            classifier: Classifier::with_defaults(),
        })
    }

    /// Replace the classifier, e.g. to change its thresholds.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// The configuration this engine was opened with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying node store.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// The loaded graph index.
    pub fn index(&self) -> &GraphIndex {
        &self.index
    }

    /// A search engine over the current store and index.
    pub fn search_engine(&self) -> SearchEngine<'_> {
        SearchEngine::new(&self.store, &self.index)
    }

    /// Classify, store and auto-relate a new node.
    ///
    /// The node file is written before its relations are added to the graph
    /// index. A failure in between leaves the node stored with embedded
    /// relations the index does not yet know about.
    pub fn capture(&mut self, request: CaptureRequest) -> Result<CaptureOutcome> {
        if request.title.trim().is_empty() || request.content.trim().is_empty() {
            return Err(KnowledgeError::validation("title and content are required"));
        }
        let confidence = check_confidence(request.confidence.unwrap_or(self.config.default_confidence))?;
        if let Some(id) = &request.id {
            check_node_id(id)?;
        }

        let mut options =
            ClassificationOptions::new(request.title.clone(), request.content.clone()).with_context(request.source);
        if let Some(hint) = request.node_type {
            options = options.with_hint(hint);
        }
        let classification = self.classifier.classify(&options);
        let node_type = classification.node_type;

        let id = request
            .id
            .unwrap_or_else(|| generate_node_id(&request.title, node_type));
        match self.store.find_node(&id) {
            Ok(_) => return Err(KnowledgeError::already_exists(id)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let mut node = KnowledgeNode::new(id, node_type, request.title, request.content)
            .with_tags(request.tags)
            .with_references(request.references)
            .with_source(request.source.as_str())
            .with_confidence(confidence);
        if let Some(session) = request.session {
            node = node.with_session(session);
        }

        let existing = self.store.all_nodes()?;
        let grouped = group_by_action(infer_relations(&node, &existing), self.config.auto_create_threshold);
        node.relations = grouped.auto_create.iter().map(InferredRelation::to_relation).collect();

        self.store.create(&node)?;
        for relation in &node.relations {
            self.index.add_relation(
                &node.id,
                &relation.target,
                relation.relation_type,
                &relation.description,
                relation.confidence,
            )?;
        }

        info!(
            id = %node.id,
            node_type = %node.node_type,
            auto_created = node.relations.len(),
            suggested = grouped.suggest.len(),
            "Captured node"
        );

        Ok(CaptureOutcome {
            node,
            classification,
            suggested: grouped.suggest,
        })
    }

    /// Look up a node by id across every type.
    pub fn get(&self, id: &str) -> Result<KnowledgeNode> {
        self.store.find_node(id)
    }

    /// Apply a partial update to an existing node.
    pub fn update(&mut self, id: &str, update: NodeUpdate) -> Result<KnowledgeNode> {
        if update.is_empty() {
            return Err(KnowledgeError::validation("no fields to update"));
        }
        if let Some(confidence) = update.confidence {
            check_confidence(confidence)?;
        }

        let mut node = self.store.find_node(id)?;
        let fields = update.changed_fields();
        node.apply_update(update);
        self.store.update(&node)?;

        info!(id = %node.id, fields = %fields.join(", "), "Updated node");
        Ok(node)
    }

    /// Delete a node and every index relation touching it. Returns the number
    /// of relations removed.
    pub fn delete(&mut self, id: &str) -> Result<usize> {
        let node = self.store.find_node(id)?;
        let removed = self.index.remove_node_relations(id)?;
        self.store.delete(id, node.node_type)?;

        info!(id = %id, node_type = %node.node_type, relations_removed = removed, "Deleted node");
        Ok(removed)
    }

    /// Create or update a relation between two existing nodes.
    pub fn relate(
        &mut self,
        source: &str,
        target: &str,
        relation_type: RelationType,
        description: &str,
        confidence: Option<f64>,
    ) -> Result<()> {
        self.store.find_node(source)?;
        self.store.find_node(target)?;

        let confidence = confidence.unwrap_or(DEFAULT_RELATION_CONFIDENCE);
        self.index
            .add_relation(source, target, relation_type, description, confidence)?;

        info!(source = %source, target = %target, relation = %relation_type, "Related nodes");
        Ok(())
    }

    /// Remove a relation. Returns whether it existed.
    pub fn unrelate(&mut self, source: &str, target: &str, relation_type: RelationType) -> Result<bool> {
        let removed = self.index.remove_relation(source, target, relation_type)?;
        if removed {
            info!(source = %source, target = %target, relation = %relation_type, "Removed relation");
        } else {
            debug!(source = %source, target = %target, relation = %relation_type, "No relation to remove");
        }
        Ok(removed)
    }

    /// Rewrite a node's embedded relations from its outgoing index edges.
    pub fn refresh_embedded_relations(&mut self, id: &str) -> Result<KnowledgeNode> {
        let mut node = self.store.find_node(id)?;
        node.relations = self
            .index
            .outgoing_relations(id)
            .into_iter()
            .map(|r| r.to_relation())
            .collect();
        self.store.update(&node)?;

        debug!(id = %id, relations = node.relations.len(), "Refreshed embedded relations");
        Ok(node)
    }

    /// Every node scored against the working context, highest first.
    pub fn score_context(&self, signals: &ContextSignals) -> Result<Vec<ScoredNode>> {
        Ok(score_nodes_for_context(self.store.all_nodes()?, signals))
    }

    /// Markdown digest of the nodes most relevant to the working context.
    pub fn context_for(&self, signals: &ContextSignals, limit: Option<usize>) -> Result<String> {
        let scored = self.score_context(signals)?;
        let limit = limit.unwrap_or(self.config.context_result_limit);
        Ok(format_context_results(&scored, limit))
    }

    /// Ranked filtered search, first page.
    pub fn search(&self, filter: &NodeFilter, limit: Option<usize>) -> Result<Vec<SearchResult>> {
        let limit = limit.unwrap_or(self.config.default_search_limit);
        self.search_engine().search(filter, limit, 0)
    }

    /// Nodes carrying all or any of `tags`.
    pub fn find_by_tags(&self, tags: &[String], mode: TagMatchMode) -> Result<Vec<SearchResult>> {
        self.search_engine().find_by_tags(tags, mode)
    }

    /// Nodes referencing a file path.
    pub fn find_by_file_reference(&self, path: &str) -> Result<Vec<SearchResult>> {
        self.search_engine().find_by_file_reference(path)
    }

    /// Nodes within `max_depth` hops, defaulting to the configured depth.
    pub fn find_related(&self, id: &str, max_depth: Option<usize>) -> Result<Vec<SearchResult>> {
        let depth = max_depth.unwrap_or(self.config.related_depth);
        self.search_engine().find_related(id, depth)
    }

    /// Counts by type, status and confidence band, plus graph statistics.
    pub fn status(&self) -> Result<StatusReport> {
        let nodes = self.store.all_nodes()?;

        let by_type = NodeType::ALL
            .iter()
            .map(|t| (*t, nodes.iter().filter(|n| n.node_type == *t).count()))
            .collect();
        let by_status = NodeStatus::ALL
            .iter()
            .map(|s| (*s, nodes.iter().filter(|n| n.status == *s).count()))
            .collect();

        let mut confidence = ConfidenceBuckets::default();
        for node in &nodes {
            confidence.record(node.confidence);
        }

        Ok(StatusReport {
            total_nodes: nodes.len(),
            by_type,
            by_status,
            confidence,
            graph: self.index.statistics(),
        })
    }
}
