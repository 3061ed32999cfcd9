//! Markdown-with-frontmatter encoding of knowledge nodes.
//!
//! ```text
//! ---
//! id: use-postgresql-3f2a9c1d
//! type: decision
//! title: Use PostgreSQL
//! tags:
//! - database
//! ...
//! ---
//!
//! We chose PostgreSQL because ...
//! ```
//!
//! Parsing is lenient about absent optional fields and strict about the
//! delimiters, the identity fields, enum values and timestamps.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use knowledge_model::{KnowledgeNode, NodeStatus, NodeType, Relation, RelationType};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{KnowledgeError, Result};

const DELIMITER: &str = "---";

/// Frontmatter field order on disk.
#[derive(Serialize)]
struct Frontmatter<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    node_type: NodeType,
    title: &'a str,
    tags: &'a [String],
    relations: &'a [Relation],
    confidence: f64,
    created: String,
    modified: String,
    source: &'a str,
    references: &'a [String],
    status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
}

/// Render a node as frontmatter plus markdown body.
///
/// A non-finite confidence on the node or any embedded relation is a
/// validation error, since it would not parse back. An empty session is
/// omitted like an absent one.
pub fn serialize_node(node: &KnowledgeNode) -> Result<String> {
    let confidences = std::iter::once(node.confidence).chain(node.relations.iter().map(|r| r.confidence));
    for confidence in confidences {
        if !confidence.is_finite() {
            return Err(KnowledgeError::validation(format!(
                "node {} has non-finite confidence {confidence}",
                node.id
            )));
        }
    }

    let frontmatter = Frontmatter {
        id: &node.id,
        node_type: node.node_type,
        title: &node.title,
        tags: &node.tags,
        relations: &node.relations,
        confidence: node.confidence,
        created: format_timestamp(&node.created),
        modified: format_timestamp(&node.modified),
        source: &node.source,
        references: &node.references,
        status: node.status,
        session: node.session.as_deref().filter(|s| !s.is_empty()),
    };

    let yaml = serde_yaml::to_string(&frontmatter)
        .map_err(|e| KnowledgeError::validation(format!("failed to encode frontmatter for {}: {e}", node.id)))?;

    let mut out = String::with_capacity(yaml.len() + node.content.len() + 16);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push_str("\n\n");
    out.push_str(&node.content);
    Ok(out)
}

/// Parse a node file. The body loses its leading blank lines.
pub fn parse_node(text: &str) -> Result<KnowledgeNode> {
    let (yaml, body) = split_frontmatter(text)?;

    let value: Value = serde_yaml::from_str(yaml)
        .map_err(|e| KnowledgeError::validation(format!("malformed frontmatter: {e}")))?;
    let map = match value {
        Value::Mapping(map) => map,
        _ => return Err(KnowledgeError::validation("frontmatter is not a key/value mapping")),
    };

    let id = scalar(&map, "id").ok_or_else(|| KnowledgeError::validation("frontmatter is missing id"))?;
    let node_type: NodeType = scalar(&map, "type")
        .ok_or_else(|| KnowledgeError::validation(format!("node {id} is missing type")))?
        .parse()?;

    let status = match scalar(&map, "status") {
        Some(s) => s.parse()?,
        None => NodeStatus::default(),
    };

    Ok(KnowledgeNode {
        node_type,
        title: scalar(&map, "title").unwrap_or_default(),
        content: body.to_string(),
        tags: string_list(&map, "tags"),
        relations: relations(&map)?,
        confidence: confidence(map.get("confidence"), &id)?,
        created: timestamp(&map, "created")?,
        modified: timestamp(&map, "modified")?,
        session: scalar(&map, "session"),
        source: scalar(&map, "source").unwrap_or_default(),
        references: string_list(&map, "references"),
        status,
        id,
    })
}

/// Split `text` into the frontmatter YAML and the body after the closing
/// delimiter, with the body's leading blank lines removed.
fn split_frontmatter(text: &str) -> Result<(&str, &str)> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next().unwrap_or_default();
    if first.trim_end() != DELIMITER {
        return Err(KnowledgeError::validation("missing opening frontmatter delimiter"));
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return Ok((yaml, body.trim_start_matches(['\n', '\r'])));
        }
        offset += line.len();
    }

    Err(KnowledgeError::validation("missing closing frontmatter delimiter"))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn timestamp(map: &Mapping, key: &str) -> Result<DateTime<Utc>> {
    match scalar(map, key) {
        None => Ok(DateTime::<Utc>::default()),
        Some(raw) => parse_timestamp(&raw)
            .ok_or_else(|| KnowledgeError::validation(format!("unparseable {key} timestamp: {raw}"))),
    }
}

fn confidence(value: Option<&Value>, owner: &str) -> Result<f64> {
    let confidence = match value {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    }
    .ok_or_else(|| KnowledgeError::validation(format!("{owner}: confidence is not a number")))?;

    if !(0.0..=1.0).contains(&confidence) {
        return Err(KnowledgeError::validation(format!(
            "{owner}: confidence {confidence} is outside [0, 1]"
        )));
    }
    Ok(confidence)
}

// Scalars are read leniently: numbers and booleans become their text form,
// empty strings and nulls count as absent.
fn scalar_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar(map: &Mapping, key: &str) -> Option<String> {
    map.get(key).and_then(scalar_value)
}

// Inside a list an empty string is a real entry.
fn list_item(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        other => scalar_value(other),
    }
}

fn string_list(map: &Mapping, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Sequence(items)) => items.iter().filter_map(list_item).collect(),
        _ => Vec::new(),
    }
}

fn relations(map: &Mapping) -> Result<Vec<Relation>> {
    let items = match map.get("relations") {
        Some(Value::Sequence(items)) => items,
        _ => return Ok(Vec::new()),
    };

    items
        .iter()
        .map(|item| {
            let entry = item
                .as_mapping()
                .ok_or_else(|| KnowledgeError::validation("relation entry is not a mapping"))?;
            let target = scalar(entry, "target")
                .ok_or_else(|| KnowledgeError::validation("relation is missing target"))?;
            let relation_type: RelationType = scalar(entry, "type")
                .ok_or_else(|| KnowledgeError::validation(format!("relation to {target} is missing type")))?
                .parse()?;
            Ok(Relation {
                relation_type,
                confidence: confidence(entry.get("confidence"), &target)?,
                description: scalar(entry, "description").unwrap_or_default(),
                target,
            })
        })
        .collect()
}
