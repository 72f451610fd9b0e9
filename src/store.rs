//! Document store boundary.
//!
//! The marketplace treats its database as a black-box document store: documents are JSON
//! objects keyed by `(collection, id)`, queried by equality on a single field, and mutated
//! one document at a time or through bounded write batches.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

pub type Document = Map<String, Value>;

/// Upper bound on operations in one committed batch.
pub const MAX_BATCH_OPS: usize = 500;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,
    #[error("document already exists")]
    AlreadyExists,
    #[error("batch of {0} operations exceeds the limit of {max}", max = MAX_BATCH_OPS)]
    BatchTooLarge(usize),
    #[error("field '{0}' is not numeric")]
    NotNumeric(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set { collection: String, id: String, doc: Document },
    Delete { collection: String, id: String },
}

/// Ordered group of writes committed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete { collection: collection.into(), id: id.into() });
        self
    }

    pub fn set(&mut self, collection: &str, id: &str, doc: Document) -> &mut Self {
        self.ops.push(WriteOp::Set { collection: collection.into(), id: id.into(), doc });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Split operations into batches of at most [`MAX_BATCH_OPS`].
    pub fn chunked(ops: Vec<WriteOp>) -> Vec<WriteBatch> {
        ops.chunks(MAX_BATCH_OPS)
            .map(|c| WriteBatch { ops: c.to_vec() })
            .collect()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;
    /// Fails with `AlreadyExists` when the key is taken.
    async fn create(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()>;
    /// Create or overwrite.
    async fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()>;
    /// Shallow merge of `patch` into an existing document; returns the merged document.
    async fn merge(&self, collection: &str, id: &str, patch: Document) -> StoreResult<Document>;
    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;
    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Document)>>;
    async fn find_eq(&self, collection: &str, field: &str, value: &Value) -> StoreResult<Vec<(String, Document)>>;
    /// Atomically add `by` to a numeric field (missing fields count as 0).
    async fn increment(&self, collection: &str, id: &str, field: &str, by: i64) -> StoreResult<()>;
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}

// ---------------- In-memory implementation with JSON snapshots ----------------

const SNAPSHOT_FILE: &str = "state.json";

#[derive(Default, Serialize, Deserialize)]
struct State {
    collections: HashMap<String, BTreeMap<String, Document>>,
}

impl State {
    fn apply(&mut self, op: WriteOp) {
        match op {
            WriteOp::Set { collection, id, doc } => {
                self.collections.entry(collection).or_default().insert(id, doc);
            }
            WriteOp::Delete { collection, id } => {
                if let Some(c) = self.collections.get_mut(&collection) {
                    c.remove(&id);
                }
            }
        }
    }
}

/// Process-local document store. Persists a JSON snapshot after every mutation when a data
/// directory is configured; otherwise it is purely ephemeral.
#[derive(Clone)]
pub struct InMemStore {
    state: Arc<RwLock<State>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl InMemStore {
    pub fn ephemeral() -> Self {
        Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
    }

    /// Open (or start) a store persisted under `data_dir/state.json`.
    pub fn persistent(data_dir: &Path) -> Self {
        let path = data_dir.join(SNAPSHOT_FILE);
        let state = Self::load_state_from(&path);
        Self { state: Arc::new(RwLock::new(state)), snapshot_path: Some(Arc::new(path)) }
    }

    pub fn from_config(data_dir: Option<&Path>) -> Self {
        match data_dir {
            Some(dir) => Self::persistent(dir),
            None => Self::ephemeral(),
        }
    }

    fn load_state_from(path: &Path) -> State {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                Ok(s) => {
                    info!(path = %path.display(), "loaded document store snapshot");
                    s
                }
                Err(e) => {
                    error!(path = %path.display(), "failed to parse snapshot: {e}; starting empty");
                    State::default()
                }
            },
            Err(e) => {
                info!(path = %path.display(), "no snapshot ({e}); starting empty");
                State::default()
            }
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| StoreError::Unavailable("state lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| StoreError::Unavailable("state lock poisoned".into()))
    }

    fn persist(&self) {
        let Some(path) = &self.snapshot_path else { return };
        let bytes = match self.read().map(|s| serde_json::to_vec_pretty(&*s)) {
            Ok(Ok(b)) => b,
            Ok(Err(e)) => {
                error!("failed to serialise snapshot: {e}");
                return;
            }
            Err(e) => {
                error!("failed to read state for snapshot: {e}");
                return;
            }
        };
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = std::fs::write(path.as_ref(), bytes) {
            warn!(path = %path.display(), "failed to write snapshot: {e}");
        }
    }
}

impl Default for InMemStore {
    fn default() -> Self {
        Self::ephemeral()
    }
}

#[async_trait]
impl DocumentStore for InMemStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let s = self.read()?;
        Ok(s.collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn create(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        let mut s = self.write()?;
        let c = s.collections.entry(collection.to_string()).or_default();
        if c.contains_key(id) {
            return Err(StoreError::AlreadyExists);
        }
        c.insert(id.to_string(), doc);
        drop(s);
        self.persist();
        Ok(())
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        let mut s = self.write()?;
        s.apply(WriteOp::Set { collection: collection.into(), id: id.into(), doc });
        drop(s);
        self.persist();
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, patch: Document) -> StoreResult<Document> {
        let mut s = self.write()?;
        let doc = s
            .collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or(StoreError::NotFound)?;
        for (k, v) in patch {
            doc.insert(k, v);
        }
        let merged = doc.clone();
        drop(s);
        self.persist();
        Ok(merged)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut s = self.write()?;
        let removed = s.collections.get_mut(collection).and_then(|c| c.remove(id)).is_some();
        drop(s);
        if removed {
            self.persist();
        }
        Ok(removed)
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Document)>> {
        let s = self.read()?;
        Ok(s.collections
            .get(collection)
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn find_eq(&self, collection: &str, field: &str, value: &Value) -> StoreResult<Vec<(String, Document)>> {
        let s = self.read()?;
        Ok(s.collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .filter(|(_, d)| d.get(field) == Some(value))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn increment(&self, collection: &str, id: &str, field: &str, by: i64) -> StoreResult<()> {
        let mut s = self.write()?;
        let doc = s
            .collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or(StoreError::NotFound)?;
        let current = match doc.get(field) {
            None | Some(Value::Null) => 0,
            Some(v) => v.as_i64().ok_or_else(|| StoreError::NotNumeric(field.to_string()))?,
        };
        doc.insert(field.to_string(), Value::from(current + by));
        drop(s);
        self.persist();
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.len() > MAX_BATCH_OPS {
            return Err(StoreError::BatchTooLarge(batch.len()));
        }
        if batch.is_empty() {
            return Ok(());
        }
        let mut s = self.write()?;
        for op in batch.ops {
            s.apply(op);
        }
        drop(s);
        self.persist();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn merge_only_touches_supplied_fields() {
        let s = InMemStore::ephemeral();
        s.create("c", "1", doc(json!({"a": 1, "b": "x"}))).await.unwrap();
        let merged = s.merge("c", "1", doc(json!({"b": "y"}))).await.unwrap();
        assert_eq!(Value::Object(merged), json!({"a": 1, "b": "y"}));
        assert_eq!(s.merge("c", "missing", Document::new()).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_keys() {
        let s = InMemStore::ephemeral();
        s.create("c", "1", Document::new()).await.unwrap();
        assert_eq!(s.create("c", "1", Document::new()).await, Err(StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn increment_treats_missing_as_zero() {
        let s = InMemStore::ephemeral();
        s.set("c", "1", doc(json!({"n": "text"}))).await.unwrap();
        s.increment("c", "1", "views", 2).await.unwrap();
        let d = s.get("c", "1").await.unwrap().unwrap();
        assert_eq!(d["views"], json!(2));
        assert!(matches!(s.increment("c", "1", "n", 1).await, Err(StoreError::NotNumeric(_))));
        assert_eq!(s.increment("c", "2", "views", 1).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn batches_are_bounded() {
        let s = InMemStore::ephemeral();
        let ops: Vec<WriteOp> = (0..1201)
            .map(|i| WriteOp::Delete { collection: "c".into(), id: i.to_string() })
            .collect();
        let batches = WriteBatch::chunked(ops.clone());
        assert_eq!(batches.iter().map(WriteBatch::len).collect::<Vec<_>>(), vec![500, 500, 201]);
        let oversized = WriteBatch { ops };
        assert_eq!(s.commit(oversized).await, Err(StoreError::BatchTooLarge(1201)));
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let s = InMemStore::persistent(dir.path());
        s.set("users", "u1", doc(json!({"uid": "u1"}))).await.unwrap();
        let reopened = InMemStore::persistent(dir.path());
        assert!(reopened.get("users", "u1").await.unwrap().is_some());
    }
}
