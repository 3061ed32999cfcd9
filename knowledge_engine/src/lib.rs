//! # Knowledge Engine
//!
//! Persists, classifies, relates and retrieves typed knowledge nodes captured
//! during software development.
//!
//! ## Core Components
//!
//! - **storage**: markdown node files, the JSON graph index, and ranked search
//! - **classification**: keyword-weighted node type classifier
//! - **enrichment**: relation inference and working-context relevance scoring
//! - **engine**: the [`KnowledgeEngine`] facade used by transport adapters
//!
//! All operations are synchronous and assume a single active writer.

pub mod classification;
pub mod config;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod id;
pub mod storage;
pub mod validate;

pub use classification::*;
pub use config::EngineConfig;
pub use engine::*;
pub use enrichment::*;
pub use error::{KnowledgeError, Result};
pub use storage::*;

pub use knowledge_model;
