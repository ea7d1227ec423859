use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{Document, Store, StoreError, Update};

/// Dashmap-backed document store. When opened with a snapshot path, every
/// mutation rewrites the snapshot so separate CLI invocations share state.
pub struct MemoryStore {
    collections: DashMap<String, DashMap<String, Document>>,
    snapshot: Option<PathBuf>,
    // Serializes snapshot writes; collection access itself is lock-free.
    persist_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            snapshot: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// Open a store persisted at `data_dir/store.json`, loading any existing
    /// snapshot. A corrupt snapshot is logged and replaced, not fatal.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join("store.json");

        let store = Self {
            collections: DashMap::new(),
            snapshot: Some(path.clone()),
            persist_lock: Mutex::new(()),
        };

        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<BTreeMap<String, BTreeMap<String, Document>>>(&raw) {
                Ok(data) => {
                    for (name, docs) in data {
                        let collection = DashMap::new();
                        for (id, doc) in docs {
                            collection.insert(id, doc);
                        }
                        store.collections.insert(name, collection);
                    }
                    debug!(path = %path.display(), "loaded store snapshot");
                }
                Err(e) => warn!(path = %path.display(), "snapshot unreadable, starting fresh: {}", e),
            }
        }

        Ok(store)
    }

    fn collection(&self, name: &str) -> dashmap::mapref::one::Ref<'_, String, DashMap<String, Document>> {
        if !self.collections.contains_key(name) {
            self.collections.entry(name.to_string()).or_default();
        }
        self.collections
            .get(name)
            .expect("collection just ensured")
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock().expect("persist lock poisoned");

        let mut state: BTreeMap<String, BTreeMap<String, Document>> = BTreeMap::new();
        for entry in self.collections.iter() {
            let mut docs = BTreeMap::new();
            for doc in entry.value().iter() {
                docs.insert(doc.key().clone(), doc.value().clone());
            }
            state.insert(entry.key().clone(), docs);
        }

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&state)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn sorted_capped(
        mut docs: Vec<Document>,
        sort_desc: &str,
        limit: Option<usize>,
    ) -> Vec<Document> {
        docs.sort_by(|a, b| {
            let a_key = a.get(sort_desc).and_then(Value::as_str).unwrap_or("");
            let b_key = b.get(sort_desc).and_then(Value::as_str).unwrap_or("");
            b_key.cmp(a_key)
        });
        if let Some(cap) = limit {
            docs.truncate(cap);
        }
        docs
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn doc_id(doc: &Document) -> Result<String, StoreError> {
    doc.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(StoreError::MissingId)
}

fn apply_update(doc: &mut Document, update: &Update) {
    let Some(obj) = doc.as_object_mut() else {
        return;
    };
    for (field, value) in &update.set {
        obj.insert(field.clone(), value.clone());
    }
    for (field, by) in &update.inc {
        let current = obj.get(field).and_then(Value::as_i64).unwrap_or(0);
        obj.insert(field.clone(), Value::from(current + by));
    }
    for (field, value) in &update.push {
        match obj.get_mut(field) {
            Some(Value::Array(items)) => items.push(value.clone()),
            _ => {
                obj.insert(field.clone(), Value::Array(vec![value.clone()]));
            }
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        let id = doc_id(&doc)?;
        self.collection(collection).insert(id, doc);
        self.persist()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.collection(collection).get(id).map(|d| d.value().clone()))
    }

    async fn list(
        &self,
        collection: &str,
        sort_desc: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, StoreError> {
        let docs: Vec<Document> = self
            .collection(collection)
            .iter()
            .map(|d| d.value().clone())
            .collect();
        Ok(Self::sorted_capped(docs, sort_desc, limit))
    }

    async fn find_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        sort_desc: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, StoreError> {
        let docs: Vec<Document> = self
            .collection(collection)
            .iter()
            .filter(|d| d.value().get(field) == Some(value))
            .map(|d| d.value().clone())
            .collect();
        Ok(Self::sorted_capped(docs, sort_desc, limit))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        update: Update,
    ) -> Result<bool, StoreError> {
        let found = {
            let collection = self.collection(collection);
            match collection.get_mut(id) {
                Some(mut doc) => {
                    // The entry guard serializes concurrent updates to one
                    // document; increments never race.
                    apply_update(doc.value_mut(), &update);
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist()?;
        }
        Ok(found)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let removed = self.collection(collection).remove(id).is_some();
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    async fn clear(&self, collection: &str) -> Result<u64, StoreError> {
        let collection = self.collection(collection);
        let count = collection.len() as u64;
        collection.clear();
        drop(collection);
        self.persist()?;
        Ok(count)
    }
}
