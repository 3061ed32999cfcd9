//! Keyword-weighted node type heuristics.
//!
//! 1. **Text**: lowercase `title + " " + content`
//! 2. **Scoring**: every keyword found as a substring adds its pattern weight
//! 3. **Boost**: the source context adds a fixed bonus to some types
//! 4. **Selection**: the highest score wins; ties go to the earlier type
//! 5. **Confidence**: `min(0.95, score / 10)`

use knowledge_model::{NodeType, SourceContext};
use serde::{Deserialize, Serialize};

/// Cap on heuristic confidence.
pub const MAX_HEURISTIC_CONFIDENCE: f64 = 0.95;

/// Score that maps to full confidence before the cap.
pub const SCORE_NORMALIZATION: f64 = 10.0;

/// Minimum confidence for a classification to stand without review.
pub const CONFIDENT_THRESHOLD: f64 = 0.6;

/// Type chosen when no keyword matches at all.
pub const FALLBACK_TYPE: NodeType = NodeType::Concept;

/// A group of keywords sharing one weight.
#[derive(Debug, Clone, Copy)]
pub struct KeywordPattern {
    pub keywords: &'static [&'static str],
    pub weight: f64,
}

const fn pattern(keywords: &'static [&'static str], weight: f64) -> KeywordPattern {
    KeywordPattern { keywords, weight }
}

const DECISION_PATTERNS: &[KeywordPattern] = &[
    pattern(&["chose", "choose", "decided", "decide", "selected", "select"], 1.0),
    pattern(&["decision", "choice", "selection"], 0.9),
    pattern(&["adopt", "use", "switch to", "move to"], 0.8),
    pattern(&["instead of", "over", "rather than", "vs"], 0.7),
    pattern(&["because", "since", "reason", "rationale"], 0.6),
    pattern(&["alternative", "option", "considered"], 0.5),
];

const COMPONENT_PATTERNS: &[KeywordPattern] = &[
    pattern(&["service", "module", "class", "function", "method"], 1.0),
    pattern(&["component", "controller", "model", "view"], 0.9),
    pattern(&["handles", "manages", "implements", "provides"], 0.8),
    pattern(&["api", "endpoint", "route", "handler"], 0.7),
    pattern(&["created", "built", "implemented"], 0.6),
];

const CONVENTION_PATTERNS: &[KeywordPattern] = &[
    pattern(&["always", "never", "must", "should", "shall"], 1.0),
    pattern(&["convention", "standard", "practice", "guideline"], 0.9),
    pattern(&["rule", "policy", "requirement"], 0.8),
    pattern(&["style", "format", "naming", "pattern"], 0.7),
    pattern(&["all", "every", "each", "any"], 0.6),
];

const CONCEPT_PATTERNS: &[KeywordPattern] = &[
    pattern(&["concept", "idea", "notion", "model"], 1.0),
    pattern(&["represents", "means", "refers to", "is"], 0.9),
    pattern(&["lifecycle", "workflow", "process", "flow"], 0.8),
    pattern(&["state", "status", "phase", "stage"], 0.7),
    pattern(&["domain", "business", "entity"], 0.6),
];

const SESSION_PATTERNS: &[KeywordPattern] = &[
    pattern(&["session", "worked on", "accomplished", "completed"], 1.0),
    pattern(&["today", "this session", "summary"], 0.9),
    pattern(&["implemented", "fixed", "added", "updated"], 0.7),
    pattern(&["progress", "status update"], 0.6),
];

const PATTERN_PATTERNS: &[KeywordPattern] = &[
    pattern(&["pattern", "approach", "strategy", "technique"], 1.0),
    pattern(&["reusable", "generic", "abstract", "common"], 0.9),
    pattern(&["design pattern", "architectural pattern"], 0.95),
    pattern(&["factory", "singleton", "observer", "repository"], 0.8),
    pattern(&["template", "blueprint", "recipe"], 0.7),
];

const ISSUE_PATTERNS: &[KeywordPattern] = &[
    pattern(&["issue", "problem", "bug", "error", "defect"], 1.0),
    pattern(&["broken", "failing", "not working"], 0.9),
    pattern(&["debt", "technical debt", "todo", "fixme"], 0.8),
    pattern(&["bottleneck", "performance", "slow"], 0.7),
    pattern(&["needs fix", "needs refactor", "improvement needed"], 0.6),
];

/// Keyword patterns for a node type.
pub fn patterns_for(node_type: NodeType) -> &'static [KeywordPattern] {
    match node_type {
        NodeType::Decision => DECISION_PATTERNS,
        NodeType::Component => COMPONENT_PATTERNS,
        NodeType::Convention => CONVENTION_PATTERNS,
        NodeType::Concept => CONCEPT_PATTERNS,
        NodeType::Session => SESSION_PATTERNS,
        NodeType::Pattern => PATTERN_PATTERNS,
        NodeType::Issue => ISSUE_PATTERNS,
    }
}

/// Score bonus a capture context gives a node type.
pub fn context_boost(context: SourceContext, node_type: NodeType) -> f64 {
    match (context, node_type) {
        (SourceContext::HookWrite, NodeType::Component) => 0.3,
        (SourceContext::HookWrite, NodeType::Convention) => 0.2,
        (SourceContext::HookCommit, NodeType::Decision) => 0.3,
        (SourceContext::HookCommit, NodeType::Issue) => 0.2,
        (SourceContext::HookSession, NodeType::Session) => 0.5,
        _ => 0.0,
    }
}

/// Outcome of the heuristic for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub node_type: NodeType,
    pub confidence: f64,
    pub reasoning: String,
}

impl ClassificationResult {
    /// Whether the confidence clears [`CONFIDENT_THRESHOLD`].
    pub fn is_confident(&self) -> bool {
        self.confidence >= CONFIDENT_THRESHOLD
    }
}

/// Raw keyword score of `text` (already lowercased) for one type.
pub fn keyword_score(text: &str, node_type: NodeType) -> f64 {
    patterns_for(node_type)
        .iter()
        .flat_map(|p| p.keywords.iter().map(move |k| (k, p.weight)))
        .filter(|(keyword, _)| text.contains(*keyword))
        .map(|(_, weight)| weight)
        .sum()
}

fn normalize(score: f64) -> f64 {
    (score / SCORE_NORMALIZATION).min(MAX_HEURISTIC_CONFIDENCE)
}

fn lowered_text(title: &str, content: &str) -> String {
    format!("{title} {content}").to_lowercase()
}

/// Classify text by keyword scoring plus the context boost.
pub fn classify_node_type(title: &str, content: &str, context: SourceContext) -> ClassificationResult {
    let text = lowered_text(title, content);

    let scores: Vec<(NodeType, f64)> = NodeType::ALL
        .into_iter()
        .map(|t| (t, keyword_score(&text, t) + context_boost(context, t)))
        .collect();

    let (best_type, best_score) = scores
        .iter()
        .fold((FALLBACK_TYPE, 0.0), |best, &(t, score)| if score > best.1 { (t, score) } else { best });

    ClassificationResult {
        node_type: best_type,
        confidence: normalize(best_score),
        reasoning: reasoning(best_type, best_score, &text, &scores),
    }
}

fn reasoning(chosen: NodeType, chosen_score: f64, text: &str, scores: &[(NodeType, f64)]) -> String {
    let matched: Vec<&str> = patterns_for(chosen)
        .iter()
        .flat_map(|p| p.keywords.iter().copied())
        .filter(|keyword| text.contains(keyword))
        .take(3)
        .collect();

    let mut reasoning = format!(
        "Classified as '{}' based on keywords: {}",
        chosen,
        matched.join(", ")
    );

    let runner_up = scores
        .iter()
        .filter(|(t, _)| *t != chosen)
        .fold(None::<(NodeType, f64)>, |best, &(t, score)| match best {
            Some((_, s)) if s >= score => best,
            _ => Some((t, score)),
        });
    if let Some((alt_type, alt_score)) = runner_up {
        if alt_score > chosen_score * 0.7 {
            reasoning.push_str(&format!(". Also considered '{alt_type}' (score: {alt_score:.2})"));
        }
    }
    reasoning
}

/// Up to three types by raw keyword score, ignoring context and zero scores.
pub fn suggest_alternatives(title: &str, content: &str) -> Vec<ClassificationResult> {
    let text = lowered_text(title, content);

    let mut scores: Vec<(NodeType, f64)> = NodeType::ALL
        .into_iter()
        .map(|t| (t, keyword_score(&text, t)))
        .filter(|(_, score)| *score > 0.0)
        .collect();
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    scores
        .into_iter()
        .take(3)
        .map(|(node_type, score)| ClassificationResult {
            node_type,
            confidence: normalize(score),
            reasoning: format!("Score: {score:.2}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DB_TITLE: &str = "Database Decision";
    const DB_CONTENT: &str = "We decided to choose PostgreSQL instead of MySQL because of better ACID guarantees";

    #[test]
    fn test_decision_scenario() {
        let result = classify_node_type(DB_TITLE, DB_CONTENT, SourceContext::Manual);
        assert_eq!(result.node_type, NodeType::Decision);
        assert!(result.confidence >= CONFIDENT_THRESHOLD);
        assert!(result.is_confident());
        assert!(result
            .reasoning
            .starts_with("Classified as 'decision' based on keywords: choose, decided, decide"));
    }

    #[test]
    fn test_keyword_score_counts_each_keyword_once() {
        let score = keyword_score("bug bug bug", NodeType::Issue);
        assert!((score - 1.0).abs() < 0.001);

        let score = keyword_score("a bug and an error", NodeType::Issue);
        assert!((score - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_no_keywords_falls_back() {
        let result = classify_node_type("xyz", "qqq", SourceContext::Manual);
        assert_eq!(result.node_type, FALLBACK_TYPE);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.is_confident());
    }

    #[test]
    fn test_context_boost_decides() {
        let plain = classify_node_type("xyz", "qqq", SourceContext::Manual);
        assert_eq!(plain.node_type, NodeType::Concept);

        let session = classify_node_type("xyz", "qqq", SourceContext::HookSession);
        assert_eq!(session.node_type, NodeType::Session);
        assert!((session.confidence - 0.05).abs() < 0.001);

        let commit = classify_node_type("xyz", "qqq", SourceContext::HookCommit);
        assert_eq!(commit.node_type, NodeType::Decision);
    }

    #[test]
    fn test_ties_go_to_earlier_type() {
        assert_eq!(keyword_score("bug", NodeType::Issue), keyword_score("session", NodeType::Session));
        let result = classify_node_type("bug", "session", SourceContext::Manual);
        assert_eq!(result.node_type, NodeType::Session);
    }

    #[test]
    fn test_confidence_capped() {
        let text = "chose choose decided decide selected select decision choice selection adopt use \
                    switch to move to instead of rather than vs because since reason rationale";
        let result = classify_node_type("", text, SourceContext::HookCommit);
        assert_eq!(result.node_type, NodeType::Decision);
        assert!((result.confidence - MAX_HEURISTIC_CONFIDENCE).abs() < 0.001);
    }

    #[test]
    fn test_runner_up_mentioned() {
        let result = classify_node_type("Auth service", "has a bug", SourceContext::Manual);
        assert_eq!(result.node_type, NodeType::Component);
        assert!(result.reasoning.contains("Also considered 'issue' (score: 1.00)"));
    }

    #[test]
    fn test_suggest_alternatives() {
        let alternatives = suggest_alternatives(DB_TITLE, DB_CONTENT);
        assert!(!alternatives.is_empty() && alternatives.len() <= 3);
        assert_eq!(alternatives[0].node_type, NodeType::Decision);
        assert_eq!(alternatives[0].reasoning, "Score: 6.00");
        assert!(alternatives.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert!(alternatives.iter().all(|a| a.confidence > 0.0));

        assert!(suggest_alternatives("xyz", "qqq").is_empty());
    }

    #[test]
    fn test_suggest_alternatives_at_most_three() {
        let text = "bug session pattern service decision always concept";
        let alternatives = suggest_alternatives("", text);
        assert_eq!(alternatives.len(), 3);
    }
}
