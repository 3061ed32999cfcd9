//! Enrichment of captured knowledge: relation inference and context scoring.

pub mod context_scorer;
pub mod relation_inferrer;

pub use context_scorer::{
    format_context_results, group_by_relevance, score_nodes_for_context, ContextSignals, RelevanceGroups,
    ScoredNode,
};
pub use relation_inferrer::{
    filter_by_confidence, group_by_action, infer_relations, GroupedRelations, InferredRelation, RelationSignals,
};
