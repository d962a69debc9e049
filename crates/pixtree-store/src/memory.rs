use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use pixtree_types::{ContentHash, EntityKind, ExportRecord, ImageFormat};

use crate::blob::{blob_relative_path, BlobStore, StoredBlob};
use crate::entity::EntityStore;
use crate::error::{StoreError, StoreResult};
use crate::export::ExportStore;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Blobs are cloned on read/write.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<ContentHash, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, data: &[u8]) -> StoreResult<StoredBlob> {
        let hash = ContentHash::of(data);
        let format = ImageFormat::sniff(data);
        let mut map = self.blobs.write().expect("lock poisoned");
        let created = !map.contains_key(&hash);
        map.entry(hash).or_insert_with(|| data.to_vec());
        Ok(StoredBlob {
            hash,
            relative_path: blob_relative_path(&hash, format),
            size: data.len() as u64,
            format,
            created,
        })
    }

    fn get(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        let map = self.blobs.read().expect("lock poisoned");
        let data = map.get(hash).cloned().ok_or(StoreError::BlobNotFound(*hash))?;
        let computed = ContentHash::of(&data);
        if computed != *hash {
            return Err(StoreError::HashMismatch {
                expected: *hash,
                computed,
            });
        }
        Ok(data)
    }

    fn exists(&self, hash: &ContentHash) -> StoreResult<bool> {
        Ok(self.blobs.read().expect("lock poisoned").contains_key(hash))
    }

    fn delete(&self, hash: &ContentHash) -> StoreResult<bool> {
        Ok(self
            .blobs
            .write()
            .expect("lock poisoned")
            .remove(hash)
            .is_some())
    }

    fn list(&self) -> StoreResult<Vec<ContentHash>> {
        let map = self.blobs.read().expect("lock poisoned");
        let mut hashes: Vec<ContentHash> = map.keys().copied().collect();
        hashes.sort();
        Ok(hashes)
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}

/// In-memory entity store keyed by `(kind, id)`.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    docs: RwLock<BTreeMap<(EntityKind, String), Vec<u8>>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn read(&self, kind: EntityKind, id: &str) -> StoreResult<Option<Vec<u8>>> {
        let docs = self.docs.read().expect("lock poisoned");
        Ok(docs.get(&(kind, id.to_string())).cloned())
    }

    fn write(&self, kind: EntityKind, id: &str, data: &[u8]) -> StoreResult<()> {
        let mut docs = self.docs.write().expect("lock poisoned");
        if kind == EntityKind::Project {
            // A working copy holds exactly one project.
            docs.retain(|(k, _), _| *k != EntityKind::Project);
        }
        docs.insert((kind, id.to_string()), data.to_vec());
        Ok(())
    }

    fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<bool> {
        let mut docs = self.docs.write().expect("lock poisoned");
        Ok(docs.remove(&(kind, id.to_string())).is_some())
    }

    fn list_ids(&self, kind: EntityKind) -> StoreResult<Vec<String>> {
        let docs = self.docs.read().expect("lock poisoned");
        Ok(docs
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id.clone())
            .collect())
    }
}

/// In-memory export history keyed by node id.
#[derive(Debug, Default)]
pub struct InMemoryExportLog {
    records: RwLock<HashMap<String, Vec<ExportRecord>>>,
}

impl InMemoryExportLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExportStore for InMemoryExportLog {
    fn append(&self, record: &ExportRecord) -> StoreResult<()> {
        let mut records = self.records.write().expect("lock poisoned");
        records
            .entry(record.node_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn history(&self, node_id: &str) -> StoreResult<Vec<ExportRecord>> {
        let records = self.records.read().expect("lock poisoned");
        Ok(records.get(node_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRepository;
    use pixtree_types::{Project, Tree, TreePurpose};
    use std::sync::Arc;

    #[test]
    fn blob_dedup() {
        let store = InMemoryBlobStore::new();
        let a = store.put(b"same").unwrap();
        let b = store.put(b"same").unwrap();
        assert_eq!(a.hash, b.hash);
        assert!(a.created);
        assert!(!b.created);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn blob_get_missing() {
        let store = InMemoryBlobStore::new();
        assert!(matches!(
            store.get(&ContentHash::of(b"gone")),
            Err(StoreError::BlobNotFound(_))
        ));
    }

    #[test]
    fn blob_get_detects_corruption() {
        let store = InMemoryBlobStore::new();
        let stored = store.put(b"original").unwrap();
        store
            .blobs
            .write()
            .unwrap()
            .insert(stored.hash, b"tampered".to_vec());

        let err = store.get(&stored.hash).unwrap_err();
        match err {
            StoreError::HashMismatch { expected, computed } => {
                assert_eq!(expected, stored.hash);
                assert_eq!(computed, ContentHash::of(b"tampered"));
            }
            other => panic!("expected HashMismatch, got {other:?}"),
        }
    }

    #[test]
    fn blob_total_bytes_uses_default() {
        let store = InMemoryBlobStore::new();
        store.put(b"12345").unwrap();
        store.put(b"123456789").unwrap();
        assert_eq!(store.total_bytes().unwrap(), 14);
    }

    #[test]
    fn entity_repository_over_memory() {
        let repo = EntityRepository::new(Arc::new(InMemoryEntityStore::new()));
        let tree = Tree::new("project-a", "mem", TreePurpose::Variation);
        repo.save(&tree).unwrap();
        assert_eq!(repo.load::<Tree>(&tree.id).unwrap(), tree);
        assert_eq!(repo.list_ids(EntityKind::Tree).unwrap(), vec![tree.id.clone()]);
    }

    #[test]
    fn only_one_project_is_kept() {
        let repo = EntityRepository::new(Arc::new(InMemoryEntityStore::new()));
        repo.save(&Project::new("first")).unwrap();
        let second = Project::new("second");
        repo.save(&second).unwrap();
        assert_eq!(repo.project().unwrap(), second);
    }

    #[test]
    fn export_log_keeps_per_node_order() {
        let log = InMemoryExportLog::new();
        let record = |node: &str, dest: &str| ExportRecord {
            node_id: node.to_string(),
            exported_at: chrono::Utc::now(),
            destination: dest.to_string(),
            custom_name: None,
            format: "png".to_string(),
        };
        log.append(&record("node-1", "/out/a.png")).unwrap();
        log.append(&record("node-2", "/out/b.png")).unwrap();
        log.append(&record("node-1", "/out/c.png")).unwrap();

        let history = log.history("node-1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].destination, "/out/c.png");
        assert!(log.history("node-3").unwrap().is_empty());
    }
}
