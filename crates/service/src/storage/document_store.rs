use std::{
    collections::HashMap,
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde_json::{Map, Value};
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::StoreError;

/// A schemaless JSON object as stored in the collection.
pub type Document = Map<String, Value>;

/// Identifier field assigned by the store on insert.
pub const ID_FIELD: &str = "_id";
const DELETED_FIELD: &str = "$$deleted";
const MIN_AUTOCOMPACTION: Duration = Duration::from_secs(5);

/// Loading options for [`DocumentStore`].
#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// Ratio of unreadable lines tolerated when loading (0.0 ..= 1.0).
    pub corrupt_alert_threshold: f64,
}

impl Default for StoreOptions {
    fn default() -> Self { Self { corrupt_alert_threshold: 0.1 } }
}

/// Append-only JSON lines document collection.
///
/// Every line of the data file holds one JSON object. Inserts and updates
/// append the full document, deletes append a `$$deleted` tombstone. Opening
/// the store replays the log and compacts it so that the file only carries
/// live documents.
///
/// Reads are served from memory behind a `RwLock`; writes are serialized by the
/// mutex guarding the append handle and hit the disk before memory changes.
pub struct DocumentStore {
    docs: RwLock<Vec<Document>>,
    file: Mutex<File>,
    file_path: PathBuf,
}

impl DocumentStore {
    /// Open (or create) the collection at `path`, replay it and compact it.
    pub async fn open<P: Into<PathBuf>>(path: P, options: StoreOptions) -> Result<Arc<Self>, StoreError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let docs = load(&file_path, options.corrupt_alert_threshold).await?;
        write_snapshot(&file_path, &docs).await?;
        let file = open_append(&file_path).await?;
        info!(path = %file_path.display(), documents = docs.len(), "document store loaded");

        Ok(Arc::new(Self { docs: RwLock::new(docs), file: Mutex::new(file), file_path }))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Snapshot of every live document, in insertion order.
    pub async fn all(&self) -> Vec<Document> {
        self.docs.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Every document whose top-level `field` equals `value`.
    pub async fn find(&self, field: &str, value: &Value) -> Vec<Document> {
        let docs = self.docs.read().await;
        docs.iter().filter(|d| d.get(field) == Some(value)).cloned().collect()
    }

    /// First document whose top-level `field` equals `value`.
    pub async fn find_one(&self, field: &str, value: &Value) -> Option<Document> {
        let docs = self.docs.read().await;
        docs.iter().find(|d| d.get(field) == Some(value)).cloned()
    }

    /// Insert a document under a freshly generated `_id` and persist it.
    ///
    /// Any `_id` carried by `doc` is replaced.
    pub async fn insert(&self, mut doc: Document) -> Result<Document, StoreError> {
        doc.insert(ID_FIELD.to_string(), Value::String(new_id()));
        check_fields(&doc)?;

        let mut file = self.file.lock().await;
        append(&mut file, &doc).await?;
        self.docs.write().await.push(doc.clone());
        debug!(id = ?doc.get(ID_FIELD), "document inserted");
        Ok(doc)
    }

    /// Shallow-merge `fields` into the first document matching `field == value`.
    ///
    /// Returns the number of documents updated (0 or 1).
    pub async fn update_one(&self, field: &str, value: &Value, fields: &Document) -> Result<u64, StoreError> {
        let mut file = self.file.lock().await;

        let (index, merged) = {
            let docs = self.docs.read().await;
            let Some(index) = docs.iter().position(|d| d.get(field) == Some(value)) else {
                return Ok(0);
            };
            let current = &docs[index];
            if let Some(id) = fields.get(ID_FIELD) {
                if current.get(ID_FIELD) != Some(id) {
                    return Err(StoreError::ImmutableId);
                }
            }
            let mut merged = current.clone();
            for (k, v) in fields {
                merged.insert(k.clone(), v.clone());
            }
            check_fields(&merged)?;
            (index, merged)
        };

        append(&mut file, &merged).await?;
        self.docs.write().await[index] = merged;
        Ok(1)
    }

    /// Remove the first document matching `field == value`.
    ///
    /// Returns the number of documents removed (0 or 1).
    pub async fn remove_one(&self, field: &str, value: &Value) -> Result<u64, StoreError> {
        let mut file = self.file.lock().await;

        let (index, id) = {
            let docs = self.docs.read().await;
            let Some(index) = docs.iter().position(|d| d.get(field) == Some(value)) else {
                return Ok(0);
            };
            (index, docs[index].get(ID_FIELD).cloned().unwrap_or(Value::Null))
        };

        let mut tombstone = Document::new();
        tombstone.insert(DELETED_FIELD.to_string(), Value::Bool(true));
        tombstone.insert(ID_FIELD.to_string(), id);
        append(&mut file, &tombstone).await?;
        self.docs.write().await.remove(index);
        Ok(1)
    }

    /// Rewrite the data file so it holds exactly the live documents.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let mut file = self.file.lock().await;
        let docs = self.docs.read().await.clone();
        write_snapshot(&self.file_path, &docs).await?;
        // the old handle still points at the replaced inode
        *file = open_append(&self.file_path).await?;
        debug!(path = %self.file_path.display(), documents = docs.len(), "data file compacted");
        Ok(())
    }

    /// Compact the data file periodically until the returned task is aborted.
    pub fn spawn_autocompaction(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let every = every.max(MIN_AUTOCOMPACTION);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick completes immediately; the store was compacted on open
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = store.compact().await {
                    warn!(error = %e, path = %store.file_path.display(), "autocompaction failed");
                }
            }
        })
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Field names may not start with `$` nor contain `.`, at any depth.
fn check_fields(doc: &Document) -> Result<(), StoreError> {
    for (key, value) in doc {
        if key.starts_with('$') || key.contains('.') {
            return Err(StoreError::InvalidField(key.clone()));
        }
        check_value(value)?;
    }
    Ok(())
}

fn check_value(value: &Value) -> Result<(), StoreError> {
    match value {
        Value::Object(map) => check_fields(map),
        Value::Array(items) => items.iter().try_for_each(check_value),
        _ => Ok(()),
    }
}

async fn load(path: &Path, threshold: f64) -> Result<Vec<Document>, StoreError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let mut slots: Vec<Option<Document>> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let (mut total, mut corrupt) = (0usize, 0usize);

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        total += 1;

        let Ok(Value::Object(doc)) = serde_json::from_str::<Value>(line) else {
            corrupt += 1;
            continue;
        };
        let Some(id) = doc.get(ID_FIELD).and_then(Value::as_str).map(str::to_owned) else {
            corrupt += 1;
            continue;
        };

        if doc.get(DELETED_FIELD) == Some(&Value::Bool(true)) {
            if let Some(slot) = by_id.remove(&id) {
                slots[slot] = None;
            }
        } else if let Some(&slot) = by_id.get(&id) {
            slots[slot] = Some(doc);
        } else {
            by_id.insert(id, slots.len());
            slots.push(Some(doc));
        }
    }

    if corrupt > 0 {
        if total > 0 && corrupt as f64 / total as f64 > threshold {
            return Err(StoreError::Corrupt { corrupt, total, threshold });
        }
        warn!(path = %path.display(), corrupt, total, "skipped unreadable lines in data file");
    }

    Ok(slots.into_iter().flatten().collect())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push("~");
    PathBuf::from(name)
}

/// Write `docs` to a sibling temp file, then rename it over `path`.
async fn write_snapshot(path: &Path, docs: &[Document]) -> Result<(), StoreError> {
    let mut data = String::new();
    for doc in docs {
        data.push_str(&serde_json::to_string(doc)?);
        data.push('\n');
    }

    let tmp = temp_path(path);
    let mut file = File::create(&tmp).await?;
    file.write_all(data.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn open_append(path: &Path) -> Result<File, StoreError> {
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    Ok(file)
}

async fn append(file: &mut File, doc: &Document) -> Result<(), StoreError> {
    let mut line = serde_json::to_string(doc)?;
    line.push('\n');
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
