//! Persistence and retrieval.
//!
//! Nodes live as markdown files under `<root>/nodes/<type>s/`, relations in
//! `<root>/graph.json`. The two relation representations are independent at
//! this layer; callers keep them in step.

pub mod atomic;
pub mod graph_index;
pub mod markdown;
pub mod node_store;
pub mod search;

pub use graph_index::{GraphIndex, GraphStatistics};
pub use markdown::{parse_node, serialize_node};
pub use node_store::NodeStore;
pub use search::SearchEngine;
