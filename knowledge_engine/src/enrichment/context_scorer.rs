//! Context Scorer - ranks nodes by relevance to the current working context.
//!
//! Bonuses are additive and independent:
//! 1. **Current file**: exact reference match, then a similar-file match
//! 2. **Recent files**: share of recent files the node references
//! 3. **Task**: share of task keywords found in the node text
//! 4. **Priors**: node type weight, confidence, recency, relation density
//! 5. **Status**: a multiplier applied to the total last
//!
//! Scores are not capped.

use chrono::{DateTime, Utc};
use knowledge_model::{KnowledgeNode, NodeStatus, NodeType};
use serde::{Deserialize, Serialize};

const CURRENT_FILE_BONUS: f64 = 1.0;
const SIMILAR_FILE_BONUS: f64 = 0.6;
const RECENT_FILES_WEIGHT: f64 = 0.4;
const TASK_WEIGHT: f64 = 0.8;
const TASK_MATCH_THRESHOLD: f64 = 0.3;
const CONFIDENCE_WEIGHT: f64 = 0.2;
const MAX_RECENCY_BONUS: f64 = 0.3;
const RECENCY_REASON_THRESHOLD: f64 = 0.1;
const WELL_CONNECTED_BONUS: f64 = 0.15;
const WELL_CONNECTED_MIN_RELATIONS: usize = 3;
const PREVIEW_CHARS: usize = 200;

const STOP_WORDS: [&str; 24] = [
    "the", "is", "at", "which", "on", "in", "to", "for", "of", "and", "or", "but", "with", "from",
    "this", "that", "these", "those", "will", "would", "should", "could", "can", "may",
];

/// What the caller is working on right now.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSignals {
    pub current_file: Option<String>,
    pub current_task: Option<String>,
    #[serde(default)]
    pub recent_files: Vec<String>,
}

impl ContextSignals {
    /// Empty signals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file being edited.
    pub fn with_current_file(mut self, path: impl Into<String>) -> Self {
        self.current_file = Some(path.into());
        self
    }

    /// Set the task description.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.current_task = Some(task.into());
        self
    }

    /// Add recently touched files.
    pub fn with_recent_files<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recent_files.extend(paths.into_iter().map(Into::into));
        self
    }
}

/// A node with its context score and the reasons behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    pub node: KnowledgeNode,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Scored nodes bucketed by score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelevanceGroups {
    /// Score of at least 1.0.
    pub high: Vec<ScoredNode>,
    /// Score in [0.5, 1.0).
    pub medium: Vec<ScoredNode>,
    pub low: Vec<ScoredNode>,
}

/// Fixed prior for each node type.
pub fn type_weight(node_type: NodeType) -> f64 {
    match node_type {
        NodeType::Decision => 0.30,
        NodeType::Convention => 0.25,
        NodeType::Pattern => 0.20,
        NodeType::Component => 0.20,
        NodeType::Concept => 0.15,
        NodeType::Issue => 0.10,
        NodeType::Session => 0.05,
    }
}

fn status_multiplier(status: NodeStatus) -> f64 {
    match status {
        NodeStatus::Active => 1.0,
        NodeStatus::NeedsReview => 0.8,
        NodeStatus::Superseded => 0.3,
    }
}

/// Score every node against `signals`, dropping non-positive scores, highest first.
pub fn score_nodes_for_context(nodes: Vec<KnowledgeNode>, signals: &ContextSignals) -> Vec<ScoredNode> {
    score_nodes_at(nodes, signals, Utc::now())
}

/// [`score_nodes_for_context`] with an explicit clock.
pub fn score_nodes_at(nodes: Vec<KnowledgeNode>, signals: &ContextSignals, now: DateTime<Utc>) -> Vec<ScoredNode> {
    let mut scored: Vec<ScoredNode> = nodes
        .into_iter()
        .map(|node| score_node(node, signals, now))
        .filter(|s| s.score > 0.0)
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

/// Score one node.
pub fn score_node(node: KnowledgeNode, signals: &ContextSignals, now: DateTime<Utc>) -> ScoredNode {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    if let Some(current) = &signals.current_file {
        if node.references_file(current) {
            score += CURRENT_FILE_BONUS;
            reasons.push("References current file".to_string());
        }
        if node.references.iter().any(|r| files_are_similar(current, r)) {
            score += SIMILAR_FILE_BONUS;
            reasons.push("References similar file".to_string());
        }
    }

    if !signals.recent_files.is_empty() {
        let matched = signals
            .recent_files
            .iter()
            .filter(|recent| node.references_file(recent))
            .count();
        if matched > 0 {
            let ratio = (matched as f64 / signals.recent_files.len() as f64).min(1.0);
            score += RECENT_FILES_WEIGHT * ratio;
            reasons.push(format!("References {matched} recent file(s)"));
        }
    }

    if let Some(task) = &signals.current_task {
        let ratio = keyword_match(&extract_keywords(task), &node.searchable_text());
        if ratio > TASK_MATCH_THRESHOLD {
            score += ratio * TASK_WEIGHT;
            reasons.push(format!("Matches task keywords ({:.0}%)", ratio * 100.0));
        }
    }

    score += type_weight(node.node_type);
    score += node.confidence * CONFIDENCE_WEIGHT;

    let recency = (MAX_RECENCY_BONUS - node.age_in_days(now) / 30.0 * 0.1).max(0.0);
    score += recency;
    if recency > RECENCY_REASON_THRESHOLD {
        reasons.push("Recently modified".to_string());
    }

    if node.relations.len() > WELL_CONNECTED_MIN_RELATIONS {
        score += WELL_CONNECTED_BONUS;
        reasons.push(format!("Well-connected ({} relations)", node.relations.len()));
    }

    score *= status_multiplier(node.status);
    if node.status == NodeStatus::Superseded {
        reasons.push("Superseded (low priority)".to_string());
    }

    ScoredNode { node, score, reasons }
}

/// Same directory, same base name without extension, or one base name
/// containing the other.
pub fn files_are_similar(a: &str, b: &str) -> bool {
    let (dir_a, file_a) = a.rsplit_once('/').unwrap_or(("", a));
    let (dir_b, file_b) = b.rsplit_once('/').unwrap_or(("", b));

    if !dir_a.is_empty() && dir_a == dir_b {
        return true;
    }

    let stem = |name: &str| -> String {
        name.rsplit_once('.').map_or(name, |(stem, _)| stem).to_string()
    };
    let (stem_a, stem_b) = (stem(file_a), stem(file_b));
    if stem_a.is_empty() || stem_b.is_empty() {
        return false;
    }
    stem_a == stem_b || stem_a.contains(&stem_b) || stem_b.contains(&stem_a)
}

/// Distinct lowercase words longer than three characters, minus stop words.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in text.to_lowercase().split_whitespace() {
        if word.chars().count() > 3 && !STOP_WORDS.contains(&word) && !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }
    keywords
}

fn keyword_match(keywords: &[String], text: &str) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let text = text.to_lowercase();
    let matched = keywords.iter().filter(|k| text.contains(k.as_str())).count();
    matched as f64 / keywords.len() as f64
}

/// Bucket scored nodes into high, medium and low relevance, keeping order.
pub fn group_by_relevance(scored: Vec<ScoredNode>) -> RelevanceGroups {
    let mut groups = RelevanceGroups::default();
    for entry in scored {
        if entry.score >= 1.0 {
            groups.high.push(entry);
        } else if entry.score >= 0.5 {
            groups.medium.push(entry);
        } else {
            groups.low.push(entry);
        }
    }
    groups
}

/// Render up to `limit` scored nodes as a markdown digest.
pub fn format_context_results(scored: &[ScoredNode], limit: usize) -> String {
    if scored.is_empty() {
        return "No relevant context found for current task.".to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    for entry in scored.iter().take(limit) {
        let node = &entry.node;
        lines.push(String::new());
        lines.push(format!("## {}", node.title));
        lines.push(format!(
            "**Type**: {} | **Relevance**: {:.0}%",
            node.node_type,
            entry.score * 100.0
        ));
        lines.push(format!("**Why**: {}", entry.reasons.join(", ")));
        if !node.tags.is_empty() {
            lines.push(format!("**Tags**: {}", node.tags.join(", ")));
        }

        let mut preview: String = node.content.chars().take(PREVIEW_CHARS).collect();
        preview = preview.replace('\n', " ");
        if node.content.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        lines.push(String::new());
        lines.push(preview);
        lines.push(String::new());
    }
    lines.join("\n")
}
