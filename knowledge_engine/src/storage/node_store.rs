//! File-backed node storage: one markdown file per node.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use knowledge_model::{KnowledgeNode, NodeFilter, NodeType};
use tracing::{debug, warn};

use super::atomic::write_atomic;
use super::markdown::{parse_node, serialize_node};
use crate::error::{KnowledgeError, Result};
use crate::validate::check_node_id;

/// CRUD over `<root>/nodes/<type>s/<id>.md`.
#[derive(Debug, Clone)]
pub struct NodeStore {
    nodes_dir: PathBuf,
}

impl NodeStore {
    /// Store rooted at `root`. Nothing is touched until [`NodeStore::initialize`].
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            nodes_dir: root.as_ref().join("nodes"),
        }
    }

    /// Create one directory per node type. Idempotent.
    pub fn initialize(&self) -> Result<()> {
        for node_type in NodeType::ALL {
            let dir = self.type_dir(node_type);
            fs::create_dir_all(&dir).map_err(|e| KnowledgeError::io("create directory", &dir, e))?;
        }
        Ok(())
    }

    /// Directory holding nodes of one type.
    pub fn type_dir(&self, node_type: NodeType) -> PathBuf {
        self.nodes_dir.join(node_type.dir_name())
    }

    /// File path for a node. Ids that could escape the type directory are
    /// a validation error.
    pub fn node_path(&self, id: &str, node_type: NodeType) -> Result<PathBuf> {
        check_node_id(id)?;
        Ok(self.type_dir(node_type).join(format!("{id}.md")))
    }

    /// Write a new node. Fails if a node with the same id and type exists.
    pub fn create(&self, node: &KnowledgeNode) -> Result<()> {
        let path = self.node_path(&node.id, node.node_type)?;
        if path.exists() {
            return Err(KnowledgeError::already_exists(&node.id));
        }
        self.write(node, &path)?;
        debug!(id = %node.id, node_type = %node.node_type, path = %path.display(), "Created node");
        Ok(())
    }

    /// Load the node `id` of a known type.
    pub fn read(&self, id: &str, node_type: NodeType) -> Result<KnowledgeNode> {
        let path = self.node_path(id, node_type)?;
        let text = fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => KnowledgeError::not_found(id),
            _ => KnowledgeError::io("read", &path, e),
        })?;
        parse_node(&text)
    }

    /// Overwrite an existing node. Never creates one.
    pub fn update(&self, node: &KnowledgeNode) -> Result<()> {
        let path = self.node_path(&node.id, node.node_type)?;
        if !path.exists() {
            return Err(KnowledgeError::not_found(&node.id));
        }
        self.write(node, &path)?;
        debug!(id = %node.id, node_type = %node.node_type, "Updated node");
        Ok(())
    }

    /// Remove a node file. Its relations are left to the caller.
    pub fn delete(&self, id: &str, node_type: NodeType) -> Result<()> {
        let path = self.node_path(id, node_type)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => KnowledgeError::not_found(id),
            _ => KnowledgeError::io("delete", &path, e),
        })?;
        debug!(id, node_type = %node_type, "Deleted node");
        Ok(())
    }

    /// Locate a node whose type is unknown by probing every type directory
    /// in fixed order.
    pub fn find_node(&self, id: &str) -> Result<KnowledgeNode> {
        for node_type in NodeType::ALL {
            match self.read(id, node_type) {
                Ok(node) => return Ok(node),
                Err(KnowledgeError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(KnowledgeError::not_found(id))
    }

    /// Every parseable node of one type, ordered by file name.
    ///
    /// Unparseable files are logged and skipped.
    pub fn list_by_type(&self, node_type: NodeType) -> Result<Vec<KnowledgeNode>> {
        let dir = self.type_dir(node_type);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(KnowledgeError::io("list", &dir, e)),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        paths.sort();

        let mut nodes = Vec::with_capacity(paths.len());
        for path in paths {
            let parsed = fs::read_to_string(&path)
                .map_err(|e| KnowledgeError::io("read", &path, e))
                .and_then(|text| parse_node(&text));
            match parsed {
                Ok(node) => nodes.push(node),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable node file"),
            }
        }
        Ok(nodes)
    }

    /// Nodes of every type, or only the filtered type, that satisfy `filter`.
    pub fn list_nodes(&self, filter: &NodeFilter) -> Result<Vec<KnowledgeNode>> {
        let types: Vec<NodeType> = match filter.node_type {
            Some(node_type) => vec![node_type],
            None => NodeType::ALL.to_vec(),
        };

        let mut nodes = Vec::new();
        for node_type in types {
            nodes.extend(
                self.list_by_type(node_type)?
                    .into_iter()
                    .filter(|node| filter.matches(node)),
            );
        }
        Ok(nodes)
    }

    /// Every parseable node in the store.
    pub fn all_nodes(&self) -> Result<Vec<KnowledgeNode>> {
        self.list_nodes(&NodeFilter::default())
    }

    fn write(&self, node: &KnowledgeNode, path: &Path) -> Result<()> {
        let text = serialize_node(node)?;
        write_atomic(path, text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge_model::{NodeStatus, NodeUpdate, Relation, RelationType};
    use tempfile::TempDir;

    fn store() -> (TempDir, NodeStore) {
        let dir = TempDir::new().unwrap();
        let store = NodeStore::new(dir.path());
        store.initialize().unwrap();
        (dir, store)
    }

    fn node(id: &str, node_type: NodeType, title: &str) -> KnowledgeNode {
        KnowledgeNode::new(id, node_type, title, format!("Body of {title}"))
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (dir, store) = store();
        store.initialize().unwrap();
        for node_type in NodeType::ALL {
            assert!(dir.path().join("nodes").join(node_type.dir_name()).is_dir());
        }
    }

    #[test]
    fn test_create_and_read() {
        let (dir, store) = store();
        let created = node("dec-1", NodeType::Decision, "Use PostgreSQL").with_tags(["database"]);
        store.create(&created).unwrap();

        assert!(dir.path().join("nodes/decisions/dec-1.md").is_file());
        let read = store.read("dec-1", NodeType::Decision).unwrap();
        assert_eq!(read, created);
    }

    #[test]
    fn test_create_duplicate_fails() {
        let (_dir, store) = store();
        let created = node("dec-1", NodeType::Decision, "Use PostgreSQL");
        store.create(&created).unwrap();
        assert!(matches!(store.create(&created), Err(KnowledgeError::AlreadyExists { .. })));
    }

    #[test]
    fn test_missing_node_errors() {
        let (_dir, store) = store();
        let ghost = node("ghost", NodeType::Issue, "Ghost");
        assert!(store.read("ghost", NodeType::Issue).unwrap_err().is_not_found());
        assert!(store.update(&ghost).unwrap_err().is_not_found());
        assert!(store.delete("ghost", NodeType::Issue).unwrap_err().is_not_found());
        assert!(store.find_node("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_rewrites_file() {
        let (_dir, store) = store();
        let mut stored = node("iss-1", NodeType::Issue, "Slow query");
        store.create(&stored).unwrap();

        stored.apply_update(NodeUpdate::new().status(NodeStatus::Superseded).content("Fixed"));
        store.update(&stored).unwrap();

        let read = store.read("iss-1", NodeType::Issue).unwrap();
        assert_eq!(read.status, NodeStatus::Superseded);
        assert_eq!(read.content, "Fixed");
    }

    #[test]
    fn test_find_node_searches_types() {
        let (_dir, store) = store();
        store.create(&node("pat-1", NodeType::Pattern, "Repository Pattern")).unwrap();

        let found = store.find_node("pat-1").unwrap();
        assert_eq!(found.node_type, NodeType::Pattern);

        store.delete("pat-1", NodeType::Pattern).unwrap();
        assert!(store.find_node("pat-1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_corrupt_file_skipped() {
        let (dir, store) = store();
        store.create(&node("comp-1", NodeType::Component, "Auth Service")).unwrap();
        store.create(&node("comp-2", NodeType::Component, "User Service")).unwrap();
        fs::write(dir.path().join("nodes/components/broken.md"), "no frontmatter here").unwrap();
        fs::write(dir.path().join("nodes/components/notes.txt"), "ignored").unwrap();

        let listed = store.list_by_type(NodeType::Component).unwrap();
        let ids: Vec<_> = listed.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["comp-1", "comp-2"]);
    }

    #[test]
    fn test_list_nodes_filter() {
        let (_dir, store) = store();
        store
            .create(
                &node("dec-1", NodeType::Decision, "Use PostgreSQL")
                    .with_tags(["database", "storage"])
                    .with_relation(Relation::new(RelationType::Affects, "comp-1", 0.8)),
            )
            .unwrap();
        store
            .create(&node("dec-2", NodeType::Decision, "Use Redis").with_tags(["cache"]).with_confidence(0.4))
            .unwrap();
        store
            .create(&node("comp-1", NodeType::Component, "DB Service").with_tags(["database"]))
            .unwrap();

        let ids = |filter: NodeFilter| -> Vec<String> {
            store.list_nodes(&filter).unwrap().into_iter().map(|n| n.id).collect()
        };

        assert_eq!(ids(NodeFilter::new()).len(), 3);
        assert_eq!(ids(NodeFilter::new().with_type(NodeType::Decision)), vec!["dec-1", "dec-2"]);
        assert_eq!(ids(NodeFilter::new().with_tags(["database"])), vec!["dec-1", "comp-1"]);
        assert_eq!(ids(NodeFilter::new().with_min_confidence(0.5)), vec!["dec-1", "comp-1"]);
        assert_eq!(ids(NodeFilter::new().with_related_to("comp-1")), vec!["dec-1"]);
        assert_eq!(ids(NodeFilter::new().with_query("REDIS")), vec!["dec-2"]);
    }

    #[test]
    fn test_unsafe_ids_rejected() {
        let (dir, store) = store();
        let escaping = node("../../../escaped", NodeType::Concept, "Escape");

        assert!(matches!(store.create(&escaping), Err(KnowledgeError::Validation(_))));
        assert!(!dir.path().join("escaped.md").exists());
        assert!(!dir.path().parent().unwrap().join("escaped.md").exists());

        for id in ["", "a/b", "a\\b", ".."] {
            assert!(matches!(store.read(id, NodeType::Concept), Err(KnowledgeError::Validation(_))));
            assert!(matches!(store.delete(id, NodeType::Concept), Err(KnowledgeError::Validation(_))));
            assert!(matches!(store.find_node(id), Err(KnowledgeError::Validation(_))));
        }
        assert!(matches!(store.update(&escaping), Err(KnowledgeError::Validation(_))));
    }

    #[test]
    fn test_list_without_initialize() {
        let dir = TempDir::new().unwrap();
        let store = NodeStore::new(dir.path());
        assert!(store.all_nodes().unwrap().is_empty());
    }
}
