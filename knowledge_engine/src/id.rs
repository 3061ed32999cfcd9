//! Identifier generation for nodes and sessions.

use chrono::{SecondsFormat, Utc};
use knowledge_model::NodeType;
use sha2::{Digest, Sha256};

const MAX_SLUG_LEN: usize = 50;

/// Build a stable id from a title and type: `<slug>-<8 hex chars>`.
///
/// The hash covers `"<type>:<title>"`, so equal titles of different types
/// get different ids.
pub fn generate_node_id(title: &str, node_type: NodeType) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", node_type.as_str(), title).as_bytes());
    let digest = hex::encode(hasher.finalize());

    let slug = slugify(title);
    if slug.is_empty() {
        format!("{}-{}", node_type.as_str(), &digest[..8])
    } else {
        format!("{}-{}", slug, &digest[..8])
    }
}

/// `session-` followed by the current UTC time with `:` and `.` replaced by `-`.
pub fn generate_session_id() -> String {
    let stamp = Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("session-{stamp}")
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}
