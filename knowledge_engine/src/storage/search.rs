//! Ranked search over the Node Store and Graph Index.

use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use knowledge_model::{KnowledgeNode, NodeFilter, SearchResult, TagMatchMode};
use tracing::warn;

use super::graph_index::GraphIndex;
use super::node_store::NodeStore;
use crate::error::{KnowledgeError, Result};

const TYPE_MATCH_BOOST: f64 = 0.2;
const TAG_WEIGHT: f64 = 0.3;
const TEXT_WEIGHT: f64 = 0.5;
const RELATED_BOOST: f64 = 0.3;
const MAX_RECENCY_BOOST: f64 = 0.2;

/// Per-term occurrence cap in text scoring.
const MAX_TERM_OCCURRENCES: usize = 5;

/// Score decay per traversal hop beyond the first.
const DEPTH_DECAY: f64 = 0.7;

/// Query front end composing node storage and the relation graph.
pub struct SearchEngine<'a> {
    store: &'a NodeStore,
    index: &'a GraphIndex,
}

impl<'a> SearchEngine<'a> {
    /// Create a search engine over a store and its index.
    pub fn new(store: &'a NodeStore, index: &'a GraphIndex) -> Self {
        Self { store, index }
    }

    /// Filtered listing ranked by [`relevance_score`], then paged.
    pub fn search(&self, filter: &NodeFilter, limit: usize, offset: usize) -> Result<Vec<SearchResult>> {
        let now = Utc::now();
        let mut results: Vec<SearchResult> = self
            .store
            .list_nodes(filter)?
            .into_iter()
            .map(|node| {
                let score = relevance_score(&node, filter, now);
                SearchResult::new(node, score)
            })
            .collect();
        sort_by_score(&mut results);

        Ok(results.into_iter().skip(offset).take(limit).collect())
    }

    /// Nodes carrying all (or any) of `tags`, scored by the matched share.
    pub fn find_by_tags(&self, tags: &[String], mode: TagMatchMode) -> Result<Vec<SearchResult>> {
        let mut results: Vec<SearchResult> = self
            .store
            .all_nodes()?
            .into_iter()
            .filter(|node| match mode {
                TagMatchMode::All => tags.iter().all(|tag| node.has_tag(tag)),
                TagMatchMode::Any => tags.iter().any(|tag| node.has_tag(tag)),
            })
            .map(|node| {
                let score = tag_score(&node.tags, tags);
                SearchResult::new(node, score)
            })
            .collect();
        sort_by_score(&mut results);
        Ok(results)
    }

    /// Term-frequency search over title, content and tags.
    pub fn full_text_search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let terms = query_terms(query);
        let mut results: Vec<SearchResult> = self
            .store
            .all_nodes()?
            .into_iter()
            .filter_map(|node| {
                let score = text_score(&node, &terms);
                (score > 0.0).then(|| SearchResult::new(node, score))
            })
            .collect();
        sort_by_score(&mut results);
        results.truncate(limit);
        Ok(results)
    }

    /// Nodes with a reference containing `path`. Every hit scores 1.0.
    pub fn find_by_file_reference(&self, path: &str) -> Result<Vec<SearchResult>> {
        Ok(self
            .store
            .all_nodes()?
            .into_iter()
            .filter(|node| node.references.iter().any(|r| r.contains(path)))
            .map(|node| SearchResult::new(node, 1.0))
            .collect())
    }

    /// Nodes reachable from `node_id` within `max_depth` hops, edges taken
    /// as undirected.
    ///
    /// Traversal is breadth-first, so each node is scored at its shortest
    /// distance `d` as `confidence * 0.7^(d - 1)`. The origin is excluded.
    /// Neighbors that cannot be loaded are skipped and not expanded.
    pub fn find_related(&self, node_id: &str, max_depth: usize) -> Result<Vec<SearchResult>> {
        let mut visited: HashSet<String> = HashSet::from([node_id.to_string()]);
        let mut frontier: VecDeque<(String, usize)> = VecDeque::from([(node_id.to_string(), 0)]);
        let mut results = Vec::new();

        while let Some((current, depth)) = frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for neighbor in self.index.get_related_nodes(&current) {
                if !visited.insert(neighbor.clone()) {
                    continue;
                }
                let node = match self.store.find_node(&neighbor) {
                    Ok(node) => node,
                    Err(KnowledgeError::NotFound { .. }) => {
                        warn!(id = %neighbor, from = %current, "Graph index points at a missing node");
                        continue;
                    }
                    Err(KnowledgeError::Validation(reason)) => {
                        warn!(id = %neighbor, from = %current, %reason, "Skipping unloadable node");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                let score = node.confidence * DEPTH_DECAY.powi(depth as i32);
                results.push(SearchResult::new(node, score));
                frontier.push_back((neighbor, depth + 1));
            }
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.node.id.cmp(&b.node.id))
        });
        Ok(results)
    }
}

/// Relevance of a node to a filter, capped at 1.0.
///
/// Base confidence plus boosts for a type match, tag overlap, query text
/// matches, a relation to `filter.related_to`, and recency over one year.
pub fn relevance_score(node: &KnowledgeNode, filter: &NodeFilter, now: DateTime<Utc>) -> f64 {
    let mut score = node.confidence;

    if filter.node_type == Some(node.node_type) {
        score += TYPE_MATCH_BOOST;
    }
    if !filter.tags.is_empty() {
        score += tag_score(&node.tags, &filter.tags) * TAG_WEIGHT;
    }
    if let Some(query) = &filter.search_query {
        score += text_score(node, &query_terms(query)) * TEXT_WEIGHT;
    }
    if let Some(target) = &filter.related_to {
        if node.relates_to(target) {
            score += RELATED_BOOST;
        }
    }

    let age_days = node.age_in_days(now);
    score += (MAX_RECENCY_BOOST - age_days / 365.0 * MAX_RECENCY_BOOST).max(0.0);

    score.clamp(0.0, 1.0)
}

/// Share of `requested` tags present in `tags`, compared exactly.
pub fn tag_score(tags: &[String], requested: &[String]) -> f64 {
    if requested.is_empty() {
        return 0.0;
    }
    let matched = requested.iter().filter(|r| tags.contains(r)).count();
    matched as f64 / requested.len() as f64
}

/// Mean per-term score, each term worth up to 1.0 at five occurrences.
pub fn text_score(node: &KnowledgeNode, terms: &[String]) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let text = node.searchable_text().to_lowercase();
    let total: f64 = terms
        .iter()
        .map(|term| text.matches(term.as_str()).count().min(MAX_TERM_OCCURRENCES) as f64)
        .map(|hits| hits / MAX_TERM_OCCURRENCES as f64)
        .sum();
    (total / terms.len() as f64).min(1.0)
}

fn query_terms(query: &str) -> Vec<String> {
    query.to_lowercase().split_whitespace().map(str::to_string).collect()
}

// Stable, so equal scores keep listing order.
fn sort_by_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use knowledge_model::{NodeType, RelationType};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: NodeStore,
        index: GraphIndex,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = NodeStore::new(dir.path());
            store.initialize().unwrap();
            let index = GraphIndex::open(dir.path()).unwrap();
            Self { _dir: dir, store, index }
        }

        fn add(&self, node: KnowledgeNode) {
            self.store.create(&node).unwrap();
        }

        fn engine(&self) -> SearchEngine<'_> {
            SearchEngine::new(&self.store, &self.index)
        }
    }

    fn node(id: &str, node_type: NodeType, title: &str, content: &str) -> KnowledgeNode {
        KnowledgeNode::new(id, node_type, title, content)
    }

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.node.id.as_str()).collect()
    }

    #[test]
    fn test_find_by_tags_all_and_any() {
        let fx = Fixture::new();
        fx.add(node("a", NodeType::Convention, "Table tests", "x").with_tags(["go", "testing", "ci"]));
        fx.add(node("b", NodeType::Component, "Builder", "y").with_tags(["go", "build"]));

        let all = fx.engine().find_by_tags(&tags(&["go", "testing"]), TagMatchMode::All).unwrap();
        assert_eq!(ids(&all), vec!["a"]);
        assert!((all[0].score - 1.0).abs() < 0.001);

        let any = fx.engine().find_by_tags(&tags(&["testing", "build", "docs"]), TagMatchMode::Any).unwrap();
        assert_eq!(any.len(), 2);
        assert!(any.iter().all(|r| (r.score - 1.0 / 3.0).abs() < 0.001));
    }

    #[test]
    fn test_full_text_search_ranks_and_limits() {
        let fx = Fixture::new();
        fx.add(node("a", NodeType::Concept, "Cache", "cache cache cache cache cache cache"));
        fx.add(node("b", NodeType::Concept, "Queue", "one cache mention"));
        fx.add(node("c", NodeType::Concept, "Unrelated", "nothing here"));

        let results = fx.engine().full_text_search("Cache", 10).unwrap();
        assert_eq!(ids(&results), vec!["a", "b"]);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert!((results[1].score - 0.2).abs() < 0.001);

        let limited = fx.engine().full_text_search("cache", 1).unwrap();
        assert_eq!(ids(&limited), vec!["a"]);
    }

    #[test]
    fn test_text_score_averages_terms() {
        let n = node("a", NodeType::Concept, "Redis cache", "");
        let score = text_score(&n, &query_terms("redis postgres"));
        assert!((score - 0.1).abs() < 0.001);
        assert_eq!(text_score(&n, &[]), 0.0);
    }

    #[test]
    fn test_find_by_file_reference_substring() {
        let fx = Fixture::new();
        fx.add(node("a", NodeType::Component, "Auth", "x").with_references(["src/auth/login.rs"]));
        fx.add(node("b", NodeType::Component, "Db", "y").with_references(["src/db.rs"]));

        let results = fx.engine().find_by_file_reference("auth/").unwrap();
        assert_eq!(ids(&results), vec!["a"]);
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_search_scores_bounded_and_paged() {
        let fx = Fixture::new();
        fx.add(node("a", NodeType::Decision, "Use Postgres", "postgres postgres").with_tags(["db"]).with_confidence(0.95));
        fx.add(node("b", NodeType::Decision, "Use Redis", "cache").with_tags(["db"]).with_confidence(0.1));
        fx.add(node("c", NodeType::Decision, "Use Kafka", "queue").with_tags(["db"]).with_confidence(0.2));

        let filter = NodeFilter::new().with_type(NodeType::Decision).with_tags(["db"]);
        let results = fx.engine().search(&filter, 10, 0).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(ids(&results), vec!["a", "c", "b"]);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert!((results[2].score - 0.8).abs() < 0.01);

        let page = fx.engine().search(&filter, 1, 1).unwrap();
        assert_eq!(ids(&page), vec!["c"]);
        assert!(fx.engine().search(&filter, 10, 5).unwrap().is_empty());
    }

    #[test]
    fn test_relevance_score_components() {
        let now = Utc::now();
        let mut n = node("a", NodeType::Issue, "Slow", "slow").with_confidence(0.1);
        n.modified = now - Duration::days(365 * 2);

        assert!((relevance_score(&n, &NodeFilter::new(), now) - 0.1).abs() < 0.001);

        let typed = NodeFilter::new().with_type(NodeType::Issue);
        assert!((relevance_score(&n, &typed, now) - 0.3).abs() < 0.001);

        n.modified = now;
        assert!((relevance_score(&n, &NodeFilter::new(), now) - 0.3).abs() < 0.001);
    }

    #[test]
    fn test_find_related_chain() {
        let mut fx = Fixture::new();
        fx.add(node("A", NodeType::Decision, "A", "a").with_confidence(0.9));
        fx.add(node("B", NodeType::Component, "B", "b").with_confidence(0.8));
        fx.add(node("C", NodeType::Component, "C", "c").with_confidence(0.6));
        fx.index.add_relation("A", "B", RelationType::Affects, "", 0.8).unwrap();
        fx.index.add_relation("B", "C", RelationType::Uses, "", 0.8).unwrap();

        let results = fx.engine().find_related("A", 2).unwrap();
        assert_eq!(ids(&results), vec!["B", "C"]);
        assert!((results[0].score - 0.8).abs() < 0.001);
        assert!((results[1].score - 0.6 * 0.7).abs() < 0.001);

        let shallow = fx.engine().find_related("A", 1).unwrap();
        assert_eq!(ids(&shallow), vec!["B"]);
        assert!(fx.engine().find_related("A", 0).unwrap().is_empty());
    }

    #[test]
    fn test_find_related_undirected_with_cycles() {
        let mut fx = Fixture::new();
        fx.add(node("A", NodeType::Concept, "A", "a"));
        fx.add(node("B", NodeType::Concept, "B", "b"));
        fx.add(node("C", NodeType::Concept, "C", "c"));
        fx.index.add_relation("B", "A", RelationType::DependsOn, "", 0.8).unwrap();
        fx.index.add_relation("B", "C", RelationType::Uses, "", 0.8).unwrap();
        fx.index.add_relation("C", "A", RelationType::RelatesTo, "", 0.8).unwrap();

        let results = fx.engine().find_related("A", 3).unwrap();
        assert_eq!(ids(&results), vec!["B", "C"]);
        assert!(results.iter().all(|r| (r.score - 0.8).abs() < 0.001));
    }

    #[test]
    fn test_find_related_skips_missing_nodes() {
        let mut fx = Fixture::new();
        fx.add(node("A", NodeType::Concept, "A", "a"));
        fx.add(node("C", NodeType::Concept, "C", "c"));
        fx.index.add_relation("A", "ghost", RelationType::Uses, "", 0.8).unwrap();
        fx.index.add_relation("ghost", "C", RelationType::Uses, "", 0.8).unwrap();

        let results = fx.engine().find_related("A", 3).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_find_related_skips_invalid_ids() {
        let mut fx = Fixture::new();
        fx.add(node("A", NodeType::Concept, "A", "a"));
        fx.add(node("B", NodeType::Concept, "B", "b"));
        fx.index.add_relation("A", "../outside", RelationType::Uses, "", 0.8).unwrap();
        fx.index.add_relation("A", "B", RelationType::Uses, "", 0.8).unwrap();

        let results = fx.engine().find_related("A", 2).unwrap();
        assert_eq!(ids(&results), vec!["B"]);
    }
}
