//! One-file-per-entity metadata storage.
//!
//! [`EntityStore`] moves raw bytes; [`EntityRepository`] layers typed JSON
//! load/save on top of it. There is no partial-field update: callers load an
//! entity, change it in memory, and save the whole thing back.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use pixtree_types::{EntityKind, ImageNode, Project, Tree};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::fs::{read_optional, remove_optional, write_atomic};
use crate::layout::StoreLayout;

/// A persisted entity with a stable id.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Tree {
    const KIND: EntityKind = EntityKind::Tree;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for ImageNode {
    const KIND: EntityKind = EntityKind::Node;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Ids are used as file names, so anything outside `[a-z0-9_-]` cannot name
/// a stored entity.
pub fn is_storable_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

/// Raw storage for entity documents.
///
/// Implementations must be thread-safe and write each document whole.
pub trait EntityStore: Send + Sync {
    /// Read the document for an entity. Returns `Ok(None)` if absent.
    fn read(&self, kind: EntityKind, id: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Create or replace the document for an entity.
    fn write(&self, kind: EntityKind, id: &str, data: &[u8]) -> StoreResult<()>;

    /// Delete an entity. Returns `true` if it existed.
    fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<bool>;

    /// All ids of the given kind, sorted.
    fn list_ids(&self, kind: EntityKind) -> StoreResult<Vec<String>>;
}

/// Entity store over the working copy's `project.json`, `trees/`, `nodes/`.
#[derive(Clone, Debug)]
pub struct FsEntityStore {
    layout: StoreLayout,
}

impl FsEntityStore {
    pub fn new(layout: &StoreLayout) -> Self {
        Self {
            layout: layout.clone(),
        }
    }

    fn path_for(&self, kind: EntityKind, id: &str) -> PathBuf {
        match kind {
            EntityKind::Project => self.layout.project_file(),
            EntityKind::Tree => self.layout.trees_dir().join(format!("{id}.json")),
            EntityKind::Node => self.layout.nodes_dir().join(format!("{id}.json")),
        }
    }

    fn project_id(&self) -> StoreResult<Option<String>> {
        let Some(data) = read_optional(&self.layout.project_file())? else {
            return Ok(None);
        };
        let value: serde_json::Value = serde_json::from_slice(&data)?;
        Ok(value
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }
}

impl EntityStore for FsEntityStore {
    fn read(&self, kind: EntityKind, id: &str) -> StoreResult<Option<Vec<u8>>> {
        if !is_storable_id(id) {
            return Ok(None);
        }
        Ok(read_optional(&self.path_for(kind, id))?)
    }

    fn write(&self, kind: EntityKind, id: &str, data: &[u8]) -> StoreResult<()> {
        if !is_storable_id(id) {
            return Err(StoreError::Serialization(format!(
                "refusing to store {kind} with unsafe id {id:?}"
            )));
        }
        write_atomic(&self.path_for(kind, id), data)?;
        Ok(())
    }

    fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<bool> {
        if !is_storable_id(id) {
            return Ok(false);
        }
        Ok(remove_optional(&self.path_for(kind, id))?)
    }

    fn list_ids(&self, kind: EntityKind) -> StoreResult<Vec<String>> {
        let dir = match kind {
            EntityKind::Project => return Ok(self.project_id()?.into_iter().collect()),
            EntityKind::Tree => self.layout.trees_dir(),
            EntityKind::Node => self.layout.nodes_dir(),
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if is_storable_id(id) {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Typed entity access over any [`EntityStore`].
#[derive(Clone)]
pub struct EntityRepository {
    store: Arc<dyn EntityStore>,
}

impl std::fmt::Debug for EntityRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRepository").finish_non_exhaustive()
    }
}

impl EntityRepository {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Repository over the filesystem layout of a working copy.
    pub fn open(layout: &StoreLayout) -> Self {
        Self::new(Arc::new(FsEntityStore::new(layout)))
    }

    /// Serialize and write the whole entity.
    pub fn save<E: Entity>(&self, entity: &E) -> StoreResult<()> {
        let mut data = serde_json::to_vec_pretty(entity)?;
        data.push(b'\n');
        self.store.write(E::KIND, entity.id(), &data)?;
        debug!(kind = %E::KIND, id = entity.id(), "saved entity");
        Ok(())
    }

    /// Load an entity by id. Fails with `NotFound` if absent.
    pub fn load<E: Entity>(&self, id: &str) -> StoreResult<E> {
        let data = self
            .store
            .read(E::KIND, id)?
            .ok_or_else(|| StoreError::not_found(E::KIND, id))?;
        let entity: E = serde_json::from_slice(&data)?;
        // The project file is shared by every id lookup; reject mismatches.
        if entity.id() != id {
            return Err(StoreError::not_found(E::KIND, id));
        }
        Ok(entity)
    }

    /// Load an entity, mapping `NotFound` to `None`.
    pub fn find<E: Entity>(&self, id: &str) -> StoreResult<Option<E>> {
        match self.load(id) {
            Ok(entity) => Ok(Some(entity)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn exists(&self, kind: EntityKind, id: &str) -> StoreResult<bool> {
        Ok(self.store.read(kind, id)?.is_some())
    }

    pub fn list_ids(&self, kind: EntityKind) -> StoreResult<Vec<String>> {
        self.store.list_ids(kind)
    }

    /// Load every entity of a kind. Returns an empty list when there are none.
    ///
    /// An id that disappears between listing and loading is skipped.
    pub fn load_all<E: Entity>(&self) -> StoreResult<Vec<E>> {
        let ids = self.store.list_ids(E::KIND)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load::<E>(&id) {
                Ok(entity) => out.push(entity),
                Err(StoreError::NotFound { .. }) => {
                    warn!(kind = %E::KIND, id = %id, "entity vanished while listing");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    pub fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<bool> {
        let existed = self.store.delete(kind, id)?;
        debug!(kind = %kind, id, existed, "deleted entity");
        Ok(existed)
    }

    /// The single project of this working copy.
    pub fn project(&self) -> StoreResult<Project> {
        let id = self
            .store
            .list_ids(EntityKind::Project)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found(EntityKind::Project, "<project>"))?;
        self.load(&id)
    }
}
