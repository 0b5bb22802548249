/// Replay of mutations made while offline
///
/// Queued entries are sent in insertion order. A failed entry is logged and
/// skipped; it is not retried. Once every entry has been dispatched, the
/// replayed entries and all locally stored notes are dropped, so the next
/// `GET /api/notes` repopulates the cache from the server.

use crate::error::SyncResult;
use crate::store::{is_offline_id, note_id, OfflineStore, QueueAction, QueueEntry};
use crate::transport::{ApiRequest, Transport};
use serde_json::Value;

/// Outcome of one replay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Turns a queue entry into the API call that applies it
///
/// Returns `None` for entries without a usable note id.
pub fn replay_request(entry: &QueueEntry) -> Option<ApiRequest> {
    match entry.action {
        QueueAction::Create => {
            let mut note = entry.data.clone();
            if let Some(fields) = note.as_object_mut() {
                if note_id(&entry.data).is_some_and(|id| is_offline_id(&id)) {
                    fields.remove("id");
                }
                fields.remove("offline");
            }
            Some(ApiRequest::post("/api/notes", note))
        }
        QueueAction::Update => {
            let id = note_id(&entry.data)?;
            let data = entry.data.get("data").cloned().unwrap_or(Value::Null);
            Some(ApiRequest::put(format!("/api/notes/{}", id), data))
        }
        QueueAction::Delete => {
            let id = note_id(&entry.data)?;
            Some(ApiRequest::delete(format!("/api/notes/{}", id)))
        }
    }
}

/// Sends every queued mutation, then clears the replayed state
///
/// # Errors
///
/// Only fails if the store cannot be written afterwards; request failures
/// are counted in the report.
pub async fn replay_queue(transport: &dyn Transport, store: &OfflineStore) -> SyncResult<ReplayReport> {
    let queue = store.queue().await;
    let mut report = ReplayReport {
        dispatched: queue.len(),
        ..Default::default()
    };

    if queue.is_empty() {
        return Ok(report);
    }

    tracing::info!(count = queue.len(), "Syncing offline changes");

    for entry in &queue {
        let Some(request) = replay_request(entry) else {
            tracing::warn!(action = ?entry.action, "Skipping queue entry without a note id");
            report.failed += 1;
            continue;
        };

        match transport.send(&request).await {
            Ok(response) if response.is_success() => report.succeeded += 1,
            Ok(response) => {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    status = response.status,
                    "Replayed change rejected"
                );
                report.failed += 1;
            }
            Err(e) => {
                tracing::warn!(method = %request.method, path = %request.path, error = %e, "Replay request failed");
                report.failed += 1;
            }
        }
    }

    store.finish_replay(queue.len()).await?;

    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "Offline changes synced"
    );

    Ok(report)
}
