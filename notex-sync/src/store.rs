/// Local store for offline use
///
/// One JSON document holding everything the client needs while the API is
/// unreachable. Keys:
///
/// - `notex_offline_user`: last known signed-in user
/// - `notex_online_notes`: last note list fetched from the API
/// - `notex_offline_notes`: notes created or edited locally
/// - `notex_sync_queue`: mutations waiting for replay, oldest first
///
/// A store opened with a path is rewritten after every mutation. Notes are
/// kept as raw JSON so locally created notes (`offline-<millis>` ids) and
/// server notes share one shape.
///
/// # Example
///
/// ```no_run
/// use notex_sync::store::OfflineStore;
///
/// # async fn example() -> Result<(), notex_sync::error::SyncError> {
/// let store = OfflineStore::open("/tmp/notex-store.json").await?;
/// let notes = store.merged_notes().await;
/// println!("{} notes available offline", notes.len());
/// # Ok(())
/// # }
/// ```

use crate::error::SyncResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Prefix of ids assigned to notes created while offline
pub const OFFLINE_ID_PREFIX: &str = "offline-";

/// Kind of deferred mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueAction {
    Create,
    Update,
    Delete,
}

/// One deferred mutation
///
/// Payload shapes: `create` holds the full local note, `update` holds
/// `{ "id", "data" }`, `delete` holds `{ "id" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub action: QueueAction,
    pub data: Value,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl QueueEntry {
    pub fn new(action: QueueAction, data: Value) -> Self {
        QueueEntry {
            action,
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Id of the note this entry touches
    pub fn note_id(&self) -> Option<String> {
        note_id(&self.data)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(rename = "notex_offline_user", default)]
    user: Option<Value>,

    #[serde(rename = "notex_online_notes", default)]
    online_notes: Vec<Value>,

    #[serde(rename = "notex_offline_notes", default)]
    offline_notes: Vec<Value>,

    #[serde(rename = "notex_sync_queue", default)]
    sync_queue: Vec<QueueEntry>,
}

/// Persistent (or in-memory) offline store
#[derive(Debug)]
pub struct OfflineStore {
    path: Option<PathBuf>,
    doc: Mutex<StoreDocument>,
}

/// Reads a note's id as a string, whatever its JSON type
pub fn note_id(note: &Value) -> Option<String> {
    match note.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn is_offline_id(id: &str) -> bool {
    id.starts_with(OFFLINE_ID_PREFIX)
}

fn note_timestamp(note: &Value) -> Option<DateTime<Utc>> {
    ["updated_at", "created_at"].iter().find_map(|key| {
        note.get(*key)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Overlays `offline` on `online` by note id and sorts newest first
///
/// A locally edited copy always replaces the server copy. Ordering uses
/// `updated_at`, falling back to `created_at`; notes with neither sort last.
pub fn merge_notes(online: &[Value], offline: &[Value]) -> Vec<Value> {
    let mut merged: Vec<Value> = online.to_vec();

    for note in offline {
        let id = note_id(note);
        match merged
            .iter_mut()
            .find(|existing| id.is_some() && note_id(existing) == id)
        {
            Some(slot) => *slot = note.clone(),
            None => merged.push(note.clone()),
        }
    }

    merged.sort_by(|a, b| note_timestamp(b).cmp(&note_timestamp(a)));
    merged
}

impl OfflineStore {
    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        OfflineStore {
            path: None,
            doc: Mutex::new(StoreDocument::default()),
        }
    }

    /// Opens a file-backed store, starting empty if the file does not exist
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or is not a store document.
    pub async fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref().to_path_buf();

        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => StoreDocument::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreDocument::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            path = %path.display(),
            queued = doc.sync_queue.len(),
            offline_notes = doc.offline_notes.len(),
            "Opened offline store"
        );

        Ok(OfflineStore {
            path: Some(path),
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Rewrites the backing file, if any, through a temp file and rename
    async fn persist(&self, doc: &StoreDocument) -> SyncResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(doc)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub async fn user(&self) -> Option<Value> {
        self.doc.lock().await.user.clone()
    }

    pub async fn set_user(&self, user: Value) -> SyncResult<()> {
        let mut doc = self.doc.lock().await;
        doc.user = Some(user);
        self.persist(&doc).await
    }

    pub async fn online_notes(&self) -> Vec<Value> {
        self.doc.lock().await.online_notes.clone()
    }

    pub async fn set_online_notes(&self, notes: Vec<Value>) -> SyncResult<()> {
        let mut doc = self.doc.lock().await;
        doc.online_notes = notes;
        self.persist(&doc).await
    }

    pub async fn offline_notes(&self) -> Vec<Value> {
        self.doc.lock().await.offline_notes.clone()
    }

    /// Online list overlaid with local edits
    pub async fn merged_notes(&self) -> Vec<Value> {
        let doc = self.doc.lock().await;
        merge_notes(&doc.online_notes, &doc.offline_notes)
    }

    /// Finds a note in the merged view
    pub async fn find_note(&self, id: &str) -> Option<Value> {
        let doc = self.doc.lock().await;
        doc.offline_notes
            .iter()
            .chain(doc.online_notes.iter())
            .find(|note| note_id(note).as_deref() == Some(id))
            .cloned()
    }

    /// Inserts or replaces a local note; new notes go to the front
    pub async fn save_offline_note(&self, note: Value) -> SyncResult<()> {
        let mut doc = self.doc.lock().await;
        let id = note_id(&note);

        match doc
            .offline_notes
            .iter_mut()
            .find(|existing| id.is_some() && note_id(existing) == id)
        {
            Some(slot) => *slot = note,
            None => doc.offline_notes.insert(0, note),
        }

        self.persist(&doc).await
    }

    /// Drops a note from both the local and the cached online lists
    pub async fn remove_note(&self, id: &str) -> SyncResult<()> {
        let mut doc = self.doc.lock().await;
        doc.offline_notes
            .retain(|note| note_id(note).as_deref() != Some(id));
        doc.online_notes
            .retain(|note| note_id(note).as_deref() != Some(id));
        self.persist(&doc).await
    }

    pub async fn enqueue(&self, action: QueueAction, data: Value) -> SyncResult<()> {
        let mut doc = self.doc.lock().await;
        doc.sync_queue.push(QueueEntry::new(action, data));
        self.persist(&doc).await
    }

    pub async fn queue(&self) -> Vec<QueueEntry> {
        self.doc.lock().await.sync_queue.clone()
    }

    /// Replaces the payload of the queued create for a locally created note
    ///
    /// Returns false if no create for `id` is queued.
    pub async fn replace_queued_create(&self, id: &str, note: Value) -> SyncResult<bool> {
        let mut doc = self.doc.lock().await;

        let Some(entry) = doc
            .sync_queue
            .iter_mut()
            .find(|e| e.action == QueueAction::Create && e.note_id().as_deref() == Some(id))
        else {
            return Ok(false);
        };

        entry.data = note;
        self.persist(&doc).await?;
        Ok(true)
    }

    /// Removes every queued entry touching `id`, returning how many were dropped
    pub async fn drop_queued(&self, id: &str) -> SyncResult<usize> {
        let mut doc = self.doc.lock().await;
        let before = doc.sync_queue.len();
        doc.sync_queue
            .retain(|entry| entry.note_id().as_deref() != Some(id));
        let dropped = before - doc.sync_queue.len();

        if dropped > 0 {
            self.persist(&doc).await?;
        }
        Ok(dropped)
    }

    /// Forgets the first `dispatched` queue entries and all local notes
    ///
    /// Entries enqueued after the replay snapshot was taken are kept.
    pub async fn finish_replay(&self, dispatched: usize) -> SyncResult<()> {
        let mut doc = self.doc.lock().await;
        let dispatched = dispatched.min(doc.sync_queue.len());
        doc.sync_queue = doc.sync_queue.split_off(dispatched);
        doc.offline_notes.clear();
        self.persist(&doc).await
    }
}
