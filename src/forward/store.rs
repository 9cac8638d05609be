use crate::forward::item::{Document, Item};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize item: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("item {id} already exists in {container}")]
    Conflict { container: String, id: String },

    #[error("container {0} does not exist")]
    NotFound(String),

    #[error("document has no string `id` field")]
    MissingId,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A key/attribute table that accepts whole items
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Write an item, replacing any item with the same key
    async fn put_item(&self, table: &str, item: Item) -> Result<()>;
}

/// A document database of partitioned containers
#[async_trait]
pub trait ContainerStore: Send + Sync {
    /// Create the container if it does not exist yet
    async fn ensure_container(
        &self,
        database: &str,
        container: &str,
        partition_key_path: &str,
    ) -> Result<()>;

    /// Insert a new document. Fails with `Conflict` when its `id` is taken.
    async fn create_item(
        &self,
        database: &str,
        container: &str,
        partition_key: &str,
        document: Document,
    ) -> Result<()>;
}

pub(crate) fn container_name(database: &str, container: &str) -> String {
    format!("{}.{}", database, container)
}

pub(crate) fn document_id(document: &Document) -> Result<&str> {
    document
        .get("id")
        .and_then(|id| id.as_str())
        .ok_or(StoreError::MissingId)
}

/// In-process store, useful for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Item>>>,
    containers: Mutex<HashMap<String, ContainerState>>,
}

#[derive(Debug, Default)]
struct ContainerState {
    partition_key_path: String,
    ids: HashSet<(String, String)>,
    documents: Vec<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items written to a table, in write order
    pub fn items(&self, table: &str) -> Vec<Item> {
        self.tables
            .lock()
            .map(|tables| tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Documents created in a container, in write order
    pub fn documents(&self, database: &str, container: &str) -> Vec<Document> {
        self.containers
            .lock()
            .map(|containers| {
                containers
                    .get(&container_name(database, container))
                    .map(|state| state.documents.clone())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    pub fn partition_key_path(&self, database: &str, container: &str) -> Option<String> {
        let containers = self.containers.lock().ok()?;
        containers
            .get(&container_name(database, container))
            .map(|state| state.partition_key_path.clone())
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        let mut tables = self.tables.lock().map_err(poisoned)?;
        tables.entry(table.to_string()).or_default().push(item);
        Ok(())
    }
}

#[async_trait]
impl ContainerStore for MemoryStore {
    async fn ensure_container(
        &self,
        database: &str,
        container: &str,
        partition_key_path: &str,
    ) -> Result<()> {
        let mut containers = self.containers.lock().map_err(poisoned)?;
        containers
            .entry(container_name(database, container))
            .or_insert_with(|| ContainerState {
                partition_key_path: partition_key_path.to_string(),
                ..Default::default()
            });
        Ok(())
    }

    async fn create_item(
        &self,
        database: &str,
        container: &str,
        partition_key: &str,
        document: Document,
    ) -> Result<()> {
        let name = container_name(database, container);
        let id = document_id(&document)?.to_string();

        let mut containers = self.containers.lock().map_err(poisoned)?;
        let state = containers
            .get_mut(&name)
            .ok_or_else(|| StoreError::NotFound(name.clone()))?;

        if !state.ids.insert((partition_key.to_string(), id.clone())) {
            return Err(StoreError::Conflict { container: name, id });
        }
        state.documents.push(document);
        Ok(())
    }
}
