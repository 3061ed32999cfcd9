//! Relation inference between a new node and the existing corpus.
//!
//! Signals are computed per candidate pair, then rules are tried in fixed
//! priority order. The first rule that applies decides the relation.

use std::collections::HashSet;

use knowledge_model::{KnowledgeNode, NodeType, Relation, RelationType};
use serde::{Deserialize, Serialize};

/// Keywords that mark one decision as replacing another.
const SUPERSESSION_KEYWORDS: [&str; 7] = [
    "supersedes",
    "replaces",
    "instead of",
    "rather than",
    "deprecates",
    "obsoletes",
    "upgrades from",
];

/// A proposed relation from the new node to an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredRelation {
    pub source: String,
    pub target: String,
    pub relation_type: RelationType,
    pub confidence: f64,
    pub reasoning: String,
}

impl InferredRelation {
    fn new(
        source: &KnowledgeNode,
        target: &KnowledgeNode,
        relation_type: RelationType,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            source: source.id.clone(),
            target: target.id.clone(),
            relation_type,
            confidence,
            reasoning: reasoning.into(),
        }
    }

    /// Embedded form, with the reasoning as description.
    pub fn to_relation(&self) -> Relation {
        Relation::new(self.relation_type, self.target.clone(), self.confidence)
            .with_description(self.reasoning.clone())
    }
}

/// Evidence that two nodes are related.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationSignals {
    /// Case-insensitive Jaccard index of the tag sets.
    pub tag_overlap: f64,
    /// Number of exactly shared file references.
    pub file_overlap: usize,
    /// Both nodes carry the same non-empty session id.
    pub same_session: bool,
    /// Jaccard index of title words longer than three characters.
    pub title_similarity: f64,
}

impl RelationSignals {
    /// Compute every signal for one pair.
    pub fn compute(source: &KnowledgeNode, target: &KnowledgeNode) -> Self {
        Self {
            tag_overlap: tag_overlap(&source.tags, &target.tags),
            file_overlap: file_overlap(&source.references, &target.references),
            same_session: matches!(
                (&source.session, &target.session),
                (Some(a), Some(b)) if !a.is_empty() && a == b
            ),
            title_similarity: title_similarity(&source.title, &target.title),
        }
    }
}

/// Relations from `new_node` to every other node in `existing`, strongest first.
pub fn infer_relations(new_node: &KnowledgeNode, existing: &[KnowledgeNode]) -> Vec<InferredRelation> {
    let mut inferred: Vec<InferredRelation> = existing
        .iter()
        .filter(|candidate| candidate.id != new_node.id)
        .filter_map(|candidate| {
            let signals = RelationSignals::compute(new_node, candidate);
            infer_specific_relation(new_node, candidate, &signals)
        })
        .collect();

    inferred.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    inferred
}

fn infer_specific_relation(
    source: &KnowledgeNode,
    target: &KnowledgeNode,
    signals: &RelationSignals,
) -> Option<InferredRelation> {
    let overlap_pct = signals.tag_overlap * 100.0;

    match (source.node_type, target.node_type) {
        (NodeType::Decision, NodeType::Component)
            if signals.tag_overlap > 0.3 || signals.file_overlap > 0 =>
        {
            return Some(InferredRelation::new(
                source,
                target,
                RelationType::Affects,
                0.7 + signals.tag_overlap * 0.2,
                format!("Decision affects component (tag overlap: {overlap_pct:.0}%)"),
            ));
        }
        (NodeType::Component, NodeType::Pattern)
            if signals.tag_overlap > 0.4 || contains_pattern_reference(&source.content, &target.title) =>
        {
            return Some(InferredRelation::new(
                source,
                target,
                RelationType::Implements,
                0.75,
                "Component implements pattern",
            ));
        }
        (NodeType::Component, NodeType::Component) if signals.file_overlap > 0 => {
            return Some(InferredRelation::new(
                source,
                target,
                RelationType::Uses,
                0.8,
                format!("Shared file references: {} file(s)", signals.file_overlap),
            ));
        }
        (NodeType::Decision, NodeType::Decision)
            if contains_supersession(&source.content, &target.title)
                || contains_supersession(&source.title, &target.title) =>
        {
            return Some(InferredRelation::new(
                source,
                target,
                RelationType::Supersedes,
                0.85,
                "Decision supersedes previous decision",
            ));
        }
        (NodeType::Convention, NodeType::Component) if signals.tag_overlap > 0.3 => {
            return Some(InferredRelation::new(
                source,
                target,
                RelationType::RelatesTo,
                0.65,
                "Convention relates to component",
            ));
        }
        _ => {}
    }

    if signals.same_session && signals.tag_overlap > 0.2 {
        return Some(InferredRelation::new(
            source,
            target,
            RelationType::RelatesTo,
            0.6,
            "Created in same session with shared tags",
        ));
    }

    if signals.tag_overlap > 0.5 {
        return Some(InferredRelation::new(
            source,
            target,
            RelationType::RelatesTo,
            0.55 + signals.tag_overlap * 0.15,
            format!("High tag overlap: {overlap_pct:.0}%"),
        ));
    }

    None
}

/// Relations split by whether they clear the auto-create threshold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedRelations {
    pub auto_create: Vec<InferredRelation>,
    pub suggest: Vec<InferredRelation>,
}

/// Partition into auto-create (`>= threshold`) and suggest-only, keeping order.
pub fn group_by_action(relations: Vec<InferredRelation>, auto_create_threshold: f64) -> GroupedRelations {
    let (auto_create, suggest) = relations
        .into_iter()
        .partition(|r| r.confidence >= auto_create_threshold);
    GroupedRelations { auto_create, suggest }
}

/// Relations at or above `min_confidence`, in their original order.
pub fn filter_by_confidence(relations: &[InferredRelation], min_confidence: f64) -> Vec<InferredRelation> {
    relations
        .iter()
        .filter(|r| r.confidence >= min_confidence)
        .cloned()
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Case-insensitive Jaccard index of two tag lists.
pub fn tag_overlap(a: &[String], b: &[String]) -> f64 {
    let lower = |tags: &[String]| tags.iter().map(|t| t.to_lowercase()).collect::<HashSet<_>>();
    jaccard(&lower(a), &lower(b))
}

/// Number of references present in both lists.
pub fn file_overlap(a: &[String], b: &[String]) -> usize {
    let ours: HashSet<&String> = a.iter().collect();
    b.iter().filter(|r| ours.contains(r)).count()
}

/// Jaccard index of the title words longer than three characters.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let words = |title: &str| {
        title
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.chars().count() > 3)
            .map(str::to_string)
            .collect::<HashSet<_>>()
    };
    jaccard(&words(a), &words(b))
}

/// Whether `content` names the pattern, also trying the title without a
/// " pattern" suffix and with hyphens as spaces.
fn contains_pattern_reference(content: &str, pattern_title: &str) -> bool {
    let content = content.to_lowercase();
    let title = pattern_title.to_lowercase();
    [title.clone(), title.replace(" pattern", ""), title.replace('-', " ")]
        .iter()
        .any(|needle| !needle.trim().is_empty() && content.contains(needle.as_str()))
}

fn contains_supersession(text: &str, target_title: &str) -> bool {
    let text = text.to_lowercase();
    let title = target_title.to_lowercase();
    !title.trim().is_empty()
        && text.contains(&title)
        && SUPERSESSION_KEYWORDS.iter().any(|k| text.contains(k))
}
