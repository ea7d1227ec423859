//! Document-store interface consumed by the core. The real persistence
//! engine is an external collaborator; what the pipeline relies on is atomic
//! single-document upsert/increment semantics and recency-sorted reads. The
//! bundled [`MemoryStore`] provides exactly that over dashmap, with an
//! optional JSON snapshot so CLI runs see each other's state.

pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryStore;

/// Collection names used across the system.
pub mod collections {
    pub const CHECKS: &str = "checks";
    pub const VALID_LOGS: &str = "valid_logs";
    pub const FREE_COOKIES: &str = "free_cookies";
    pub const SETTINGS: &str = "settings";
}

/// A stored document: a JSON object carrying a string `id` field.
pub type Document = Value;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document has no string `id` field")]
    MissingId,

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One atomic document mutation: field sets, integer increments and array
/// pushes applied together under the document's lock.
#[derive(Debug, Clone, Default)]
pub struct Update {
    pub(crate) set: Map<String, Value>,
    pub(crate) inc: Vec<(String, i64)>,
    pub(crate) push: Vec<(String, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set.insert(field.into(), value);
        self
    }

    pub fn inc(mut self, field: impl Into<String>, by: i64) -> Self {
        self.inc.push((field.into(), by));
        self
    }

    pub fn push(mut self, field: impl Into<String>, value: Value) -> Self {
        self.push.push((field.into(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty() && self.push.is_empty()
    }
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// All documents, sorted descending by the named field, capped at
    /// `limit` when given.
    async fn list(
        &self,
        collection: &str,
        sort_desc: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Top-level field equality filter with the same sort/limit contract as
    /// [`Store::list`].
    async fn find_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        sort_desc: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Apply an [`Update`] atomically. Returns false when the document does
    /// not exist.
    async fn update(&self, collection: &str, id: &str, update: Update)
        -> Result<bool, StoreError>;

    /// Returns false when the document does not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Remove every document in the collection, returning how many went.
    async fn clear(&self, collection: &str) -> Result<u64, StoreError>;
}

/// Deserialize a fetched document into a typed record.
pub fn decode<T: serde::de::DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(doc)?)
}

/// Serialize a typed record into a storable document.
pub fn encode<T: serde::Serialize>(record: &T) -> Result<Document, StoreError> {
    Ok(serde_json::to_value(record)?)
}
