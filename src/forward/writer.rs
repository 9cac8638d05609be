use crate::forward::item::{Document, Item};
use crate::forward::store::{
    container_name, document_id, ContainerStore, Result, StoreError, TableStore,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Writes items as JSON Lines, one file per table or container
pub struct JsonlStore {
    output_dir: PathBuf,
    state: Mutex<WriterState>,
}

#[derive(Default)]
struct WriterState {
    writers: HashMap<String, BufWriter<File>>,
    containers: HashSet<String>,
    /// (container, partition key, id) of every document written
    ids: HashSet<(String, String, String)>,
}

impl JsonlStore {
    /// Create a store that writes into `output_dir`, creating it if needed
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        std::fs::create_dir_all(&output_dir)?;

        Ok(JsonlStore {
            output_dir: output_dir.as_ref().to_path_buf(),
            state: Mutex::new(WriterState::default()),
        })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.jsonl", name))
    }

    /// Flush all open files
    pub fn flush(&self) -> Result<()> {
        let mut state = self.lock()?;
        for writer in state.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, WriterState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("writer lock poisoned".to_string()))
    }

    fn append(&self, state: &mut WriterState, name: &str, line: String) -> Result<()> {
        if !state.writers.contains_key(name) {
            let path = self.path_for(name);
            debug!(path = %path.display(), "opening output file");
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            state.writers.insert(name.to_string(), BufWriter::new(file));
        }

        if let Some(writer) = state.writers.get_mut(name) {
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for JsonlStore {
    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        let line = serde_json::to_string(&item)?;
        let mut state = self.lock()?;
        self.append(&mut state, table, line)
    }
}

#[async_trait]
impl ContainerStore for JsonlStore {
    async fn ensure_container(
        &self,
        database: &str,
        container: &str,
        _partition_key_path: &str,
    ) -> Result<()> {
        let mut state = self.lock()?;
        state.containers.insert(container_name(database, container));
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
        let line = serde_json::to_string(&document)?;

        let mut state = self.lock()?;
        if !state.containers.contains(&name) {
            return Err(StoreError::NotFound(name));
        }
        let key = (name.clone(), partition_key.to_string(), id.clone());
        if state.ids.contains(&key) {
            return Err(StoreError::Conflict { container: name, id });
        }

        // Only a written document claims its id
        self.append(&mut state, &name, line)?;
        state.ids.insert(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::item::AttributeValue;
    use serde_json::{json, Value};

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_items_go_to_one_file_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path()).unwrap();

        let item: Item = [
            ("MessageId".to_string(), AttributeValue::s("m-1")),
            ("BodyJson.n".to_string(), AttributeValue::N("1".into())),
        ]
        .into_iter()
        .collect();

        store.put_item("SqsMessages", item.clone()).await.unwrap();
        store.put_item("SqsMessages", item).await.unwrap();
        store.flush().unwrap();

        let lines = read_lines(&dir.path().join("SqsMessages.jsonl"));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], json!({"MessageId": {"S": "m-1"}, "BodyJson.n": {"N": "1"}}));
    }

    #[tokio::test]
    async fn test_documents_land_in_container_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path().join("nested")).unwrap();

        let document: Document = serde_json::from_value(json!({"id": "a", "Body": "x"})).unwrap();

        let err = store
            .create_item("db", "msgs", "a", document.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        store.ensure_container("db", "msgs", "/MessageId").await.unwrap();
        store.create_item("db", "msgs", "a", document.clone()).await.unwrap();
        let err = store.create_item("db", "msgs", "a", document).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        store.flush().unwrap();

        let lines = read_lines(&store.path_for("db.msgs"));
        assert_eq!(lines, vec![json!({"id": "a", "Body": "x"})]);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_reserve_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path()).unwrap();
        store.ensure_container("db", "msgs", "/MessageId").await.unwrap();

        // A directory where the output file belongs makes the open fail
        let target = store.path_for("db.msgs");
        std::fs::create_dir(&target).unwrap();

        let document: Document = serde_json::from_value(json!({"id": "a"})).unwrap();
        let err = store
            .create_item("db", "msgs", "a", document.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));

        std::fs::remove_dir(&target).unwrap();
        store.create_item("db", "msgs", "a", document).await.unwrap();
        store.flush().unwrap();

        assert_eq!(read_lines(&target), vec![json!({"id": "a"})]);
    }

    #[tokio::test]
    async fn test_buffered_lines_reach_disk_on_flush() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path()).unwrap();
        let item: Item = [("MessageId".to_string(), AttributeValue::s("m-1"))]
            .into_iter()
            .collect();

        store.put_item("SqsMessages", item).await.unwrap();
        store.flush().unwrap();

        assert_eq!(
            read_lines(&store.path_for("SqsMessages")),
            vec![json!({"MessageId": {"S": "m-1"}})]
        );
    }
}
