//! Node type classification with user hints and review flagging.

use knowledge_model::{NodeType, SourceContext};
use serde::{Deserialize, Serialize};

use super::heuristics::{classify_node_type, suggest_alternatives};

/// Confidence reported for a user-supplied type.
pub const USER_HINT_CONFIDENCE: f64 = 0.95;

/// Inputs for one classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOptions {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub source_context: SourceContext,
    /// Trusted as-is when present.
    pub user_hint: Option<NodeType>,
}

impl ClassificationOptions {
    /// Options for manual capture with no hint.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Set the capture context.
    pub fn with_context(mut self, context: SourceContext) -> Self {
        self.source_context = context;
        self
    }

    /// Set a user-supplied type.
    pub fn with_hint(mut self, hint: NodeType) -> Self {
        self.user_hint = Some(hint);
        self
    }
}

/// Another plausible type for low-confidence text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub node_type: NodeType,
    pub confidence: f64,
}

/// Final classification handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub node_type: NodeType,
    pub confidence: f64,
    pub reasoning: String,
    /// Populated only when the heuristic was not confident.
    pub alternatives: Vec<Alternative>,
    pub needs_review: bool,
}

/// Thresholds for the classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Minimum heuristic confidence to accept without review.
    pub confident_threshold: f64,

    /// Minimum confidence for a reclassification to be suggested.
    pub reclassify_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confident_threshold: super::heuristics::CONFIDENT_THRESHOLD,
            reclassify_threshold: 0.7,
        }
    }
}

/// Assigns node types to captured text.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    /// Create a classifier with the given thresholds.
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Create a classifier with default thresholds.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Classify one item.
    ///
    /// A user hint short-circuits the heuristic. Otherwise a confident
    /// heuristic result is returned as-is, and a weak one is flagged for
    /// review with up to three alternatives.
    pub fn classify(&self, options: &ClassificationOptions) -> ClassificationResponse {
        if let Some(hint) = options.user_hint {
            return ClassificationResponse {
                node_type: hint,
                confidence: USER_HINT_CONFIDENCE,
                reasoning: "User-specified type".to_string(),
                alternatives: Vec::new(),
                needs_review: false,
            };
        }

        let result = classify_node_type(&options.title, &options.content, options.source_context);

        if result.confidence >= self.config.confident_threshold {
            return ClassificationResponse {
                node_type: result.node_type,
                confidence: result.confidence,
                reasoning: result.reasoning,
                alternatives: Vec::new(),
                needs_review: false,
            };
        }

        let alternatives = suggest_alternatives(&options.title, &options.content)
            .into_iter()
            .map(|alt| Alternative {
                node_type: alt.node_type,
                confidence: alt.confidence,
            })
            .collect();

        ClassificationResponse {
            node_type: result.node_type,
            confidence: result.confidence,
            reasoning: format!("{} (low confidence - review recommended)", result.reasoning),
            alternatives,
            needs_review: true,
        }
    }

    /// Classify each item independently.
    pub fn classify_batch(&self, items: &[ClassificationOptions]) -> Vec<ClassificationResponse> {
        items.iter().map(|item| self.classify(item)).collect()
    }

    /// Suggest a new type for edited content, or `None` to keep the current one.
    pub fn reclassify(&self, current: NodeType, title: &str, content: &str) -> Option<ClassificationResponse> {
        let result = self.classify(&ClassificationOptions::new(title, content));
        (result.node_type != current && result.confidence >= self.config.reclassify_threshold).then_some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_hint_short_circuits() {
        let classifier = Classifier::with_defaults();
        let response = classifier.classify(
            &ClassificationOptions::new("Random", "no keywords").with_hint(NodeType::Pattern),
        );
        assert_eq!(response.node_type, NodeType::Pattern);
        assert!((response.confidence - USER_HINT_CONFIDENCE).abs() < 0.001);
        assert_eq!(response.reasoning, "User-specified type");
        assert!(!response.needs_review);
        assert!(response.alternatives.is_empty());
    }

    #[test]
    fn test_confident_capture_scenario() {
        let classifier = Classifier::with_defaults();
        let response = classifier.classify(&ClassificationOptions::new(
            "Database Decision",
            "We decided to choose PostgreSQL instead of MySQL because of better ACID guarantees",
        ));
        assert_eq!(response.node_type, NodeType::Decision);
        assert!(response.confidence >= 0.6);
        assert!(!response.needs_review);
        assert!(response.alternatives.is_empty());
    }

    #[test]
    fn test_low_confidence_flagged() {
        let classifier = Classifier::with_defaults();
        let response = classifier.classify(&ClassificationOptions::new("Login bug", "The form is slow"));
        assert!(response.needs_review);
        assert!(response.reasoning.ends_with("(low confidence - review recommended)"));
        assert!(!response.alternatives.is_empty());
        assert!(response.alternatives.len() <= 3);
        assert!(response
            .alternatives
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_context_passed_through() {
        let classifier = Classifier::with_defaults();
        let response = classifier.classify(
            &ClassificationOptions::new("Notes", "xyz").with_context(SourceContext::HookSession),
        );
        assert_eq!(response.node_type, NodeType::Session);
    }

    #[test]
    fn test_confidence_within_bounds() {
        let classifier = Classifier::with_defaults();
        let inputs = [
            ("", ""),
            ("Auth service", "handles login via api endpoint"),
            ("Always", "always never must should shall convention standard practice guideline rule policy"),
        ];
        for (title, content) in inputs {
            let response = classifier.classify(&ClassificationOptions::new(title, content));
            assert!((0.0..=0.95).contains(&response.confidence));
        }
    }

    #[test]
    fn test_classify_batch() {
        let classifier = Classifier::with_defaults();
        let items = vec![
            ClassificationOptions::new("A", "x").with_hint(NodeType::Issue),
            ClassificationOptions::new("B", "y").with_hint(NodeType::Component),
        ];
        let responses = classifier.classify_batch(&items);
        let types: Vec<_> = responses.iter().map(|r| r.node_type).collect();
        assert_eq!(types, vec![NodeType::Issue, NodeType::Component]);
    }

    #[test]
    fn test_reclassify() {
        let classifier = Classifier::with_defaults();
        let content = "We decided to choose PostgreSQL instead of MySQL because of the selected \
                       option; the choice was considered over alternatives since the rationale holds";

        let suggestion = classifier.reclassify(NodeType::Concept, "Database decision", content);
        let suggestion = suggestion.expect("strong decision text should trigger reclassification");
        assert_eq!(suggestion.node_type, NodeType::Decision);
        assert!(suggestion.confidence >= 0.7);

        assert!(classifier.reclassify(NodeType::Decision, "Database decision", content).is_none());
        assert!(classifier.reclassify(NodeType::Concept, "Login bug", "slow").is_none());
    }
}
