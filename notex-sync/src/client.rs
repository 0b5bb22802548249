/// Offline-aware API client
///
/// [`OfflineClient::send`] is a drop-in for calling the API directly. While
/// online it forwards requests and caches what it sees. While offline it
/// answers note and profile requests from the local store and queues note
/// mutations for replay.
///
/// # Offline behaviour
///
/// | Request                    | Answer                                        |
/// |----------------------------|-----------------------------------------------|
/// | `GET /api/notes`           | merged cached notes, `offline: true`          |
/// | `POST /api/notes`          | local note with an `offline-<millis>` id      |
/// | `PUT /api/notes/:id`       | cached note with the edit applied             |
/// | lock change on `offline-`  | 503, locking needs the server id              |
/// | `DELETE /api/notes/:id`    | removed locally                               |
/// | any `/share`               | 503, sharing needs the server                 |
/// | `GET /api/auth/me`         | cached user, or 401                           |
/// | `PUT /api/user/settings`   | cached user with the settings applied         |
/// | anything else              | 503 `{ "error": "Offline", "offline": true }` |
///
/// # Example
///
/// ```no_run
/// use notex_sync::{client::OfflineClient, store::OfflineStore, transport::{ApiRequest, MockTransport}};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), notex_sync::error::SyncError> {
/// let client = OfflineClient::new(Arc::new(MockTransport::new()), Arc::new(OfflineStore::in_memory()));
/// client.set_online(false);
/// let response = client.send(&ApiRequest::get("/api/notes")).await?;
/// assert_eq!(response.body["offline"], true);
/// # Ok(())
/// # }
/// ```

use crate::error::{SyncError, SyncResult};
use crate::store::{is_offline_id, note_id, OfflineStore, QueueAction, OFFLINE_ID_PREFIX};
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

const NOTES_ROUTE: &str = "/api/notes";

/// Title for notes created offline without one
const FALLBACK_NOTE_TITLE: &str = "Untitled Note";

/// Request fields that are never copied into cached records
const SECRET_FIELDS: [&str; 3] = ["password", "current_password", "new_password"];

/// Offline-aware client shared by the application and the connectivity monitor
#[derive(Clone)]
pub struct OfflineClient {
    transport: Arc<dyn Transport>,
    store: Arc<OfflineStore>,
    online: Arc<AtomicBool>,
    /// Millisecond stamp of the last `offline-` id handed out
    last_offline_stamp: Arc<AtomicI64>,
}

fn offline_error(status: u16, message: &str) -> ApiResponse {
    ApiResponse::new(status, json!({ "error": message, "offline": true }))
}

/// `/api/notes/:id` → `Some(id)`; nested routes like `/share` are not matched
fn note_route_id(route: &str) -> Option<&str> {
    let id = route.strip_prefix("/api/notes/")?;
    (!id.is_empty() && !id.contains('/')).then_some(id)
}

/// Shallow-merges `patch` into `target`, skipping secrets
fn merge_object(target: &mut Map<String, Value>, patch: &Value) {
    if let Some(patch) = patch.as_object() {
        for (key, value) in patch {
            if !SECRET_FIELDS.contains(&key.as_str()) {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

impl OfflineClient {
    /// Creates a client that starts out online
    pub fn new(transport: Arc<dyn Transport>, store: Arc<OfflineStore>) -> Self {
        OfflineClient {
            transport,
            store,
            online: Arc::new(AtomicBool::new(true)),
            last_offline_stamp: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn store(&self) -> &Arc<OfflineStore> {
        &self.store
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Sets connectivity, returning the previous value
    pub fn set_online(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::SeqCst)
    }

    /// Sends a request, or answers it locally while offline
    ///
    /// # Errors
    ///
    /// Online: the transport failed; the client then switches to offline
    /// mode until the monitor sees the API again. Offline: the local store
    /// could not be written.
    pub async fn send(&self, request: &ApiRequest) -> SyncResult<ApiResponse> {
        if !self.is_online() {
            return self.handle_offline(request).await;
        }

        match self.transport.send(request).await {
            Ok(response) => {
                if response.is_success() {
                    if let Err(e) = self.cache_response(request, &response).await {
                        tracing::warn!(error = %e, path = %request.path, "Failed to cache response");
                    }
                }
                Ok(response)
            }
            Err(e @ SyncError::Transport(_)) => {
                if self.set_online(false) {
                    tracing::warn!(error = %e, "API unreachable, switching to offline mode");
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn cache_response(&self, request: &ApiRequest, response: &ApiResponse) -> SyncResult<()> {
        let route = request.route();
        let body = &response.body;

        match (request.method, route) {
            (Method::Get, NOTES_ROUTE) => {
                if let Some(notes) = body.get("notes").and_then(Value::as_array) {
                    tracing::debug!(count = notes.len(), "Cached notes");
                    self.store.set_online_notes(notes.clone()).await?;
                }
            }
            (Method::Post, "/api/auth/login") | (Method::Post, "/api/auth/signup") => {
                if let Some(token) = body.get("access_token").and_then(Value::as_str) {
                    self.transport.set_access_token(Some(token.to_string())).await;
                }
                self.cache_user(body).await?;
            }
            (Method::Get, "/api/auth/me") | (Method::Put, "/api/user/settings") => {
                self.cache_user(body).await?;
            }
            (Method::Post, NOTES_ROUTE) | (Method::Put, _) if route.starts_with(NOTES_ROUTE) => {
                if let Some(note) = body.get("note").filter(|n| n.is_object()) {
                    self.store.save_offline_note(note.clone()).await?;
                }
            }
            (Method::Delete, _) => {
                if let Some(id) = note_route_id(route) {
                    tracing::debug!(note_id = id, "Evicted deleted note");
                    self.store.remove_note(id).await?;
                }
            }
            _ => {}
        }

        Ok(())
    }

    async fn cache_user(&self, body: &Value) -> SyncResult<()> {
        if let Some(user) = body.get("user").filter(|u| u.is_object()) {
            tracing::debug!("Cached user");
            self.store.set_user(user.clone()).await?;
        }
        Ok(())
    }

    async fn handle_offline(&self, request: &ApiRequest) -> SyncResult<ApiResponse> {
        let route = request.route();

        if route.contains("/share") {
            return Ok(offline_error(503, "Offline"));
        }

        match (request.method, route, note_route_id(route)) {
            (Method::Get, NOTES_ROUTE, _) => Ok(ApiResponse::new(
                200,
                json!({ "notes": self.store.merged_notes().await, "offline": true }),
            )),
            (Method::Post, NOTES_ROUTE, _) => self.create_note_offline(request.body.as_ref()).await,
            (Method::Put, _, Some(id)) => self.update_note_offline(id, request.body.as_ref()).await,
            (Method::Delete, _, Some(id)) => self.delete_note_offline(id).await,
            (Method::Get, "/api/auth/me", _) => Ok(match self.store.user().await {
                Some(user) => ApiResponse::new(200, json!({ "user": user, "offline": true })),
                None => offline_error(401, "Not authenticated"),
            }),
            (Method::Put, "/api/user/settings", _) => {
                self.update_settings_offline(request.body.as_ref()).await
            }
            _ => {
                tracing::debug!(method = %request.method, path = %request.path, "Refused offline request");
                Ok(offline_error(503, "Offline"))
            }
        }
    }

    /// Next `offline-<millis>` id, bumped past the last one so that notes
    /// created within the same millisecond stay distinct
    fn next_offline_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let last = self
            .last_offline_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or_else(|last| last);

        format!("{}{}", OFFLINE_ID_PREFIX, now.max(last + 1))
    }

    async fn create_note_offline(&self, body: Option<&Value>) -> SyncResult<ApiResponse> {
        let body = body.cloned().unwrap_or_else(|| json!({}));
        if !body.is_object() {
            return Ok(offline_error(400, "Failed to create note offline"));
        }

        let user = self.store.user().await;
        let author_id = user
            .as_ref()
            .and_then(|u| u.get("id"))
            .cloned()
            .unwrap_or_else(|| json!("offline-user"));

        let title = body
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                user.as_ref()
                    .and_then(|u| u.get("default_note_name"))
                    .and_then(Value::as_str)
            })
            .unwrap_or(FALLBACK_NOTE_TITLE)
            .to_string();

        let now = Utc::now();
        let note = json!({
            "id": self.next_offline_id(),
            "author_id": author_id,
            "title": title,
            "content": body.get("content").and_then(Value::as_str).unwrap_or_default(),
            "is_locked": false,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
            "offline": true,
        });

        self.store.save_offline_note(note.clone()).await?;
        self.store.enqueue(QueueAction::Create, note.clone()).await?;

        tracing::info!(note_id = ?note_id(&note), "Created note offline");

        Ok(ApiResponse::new(201, json!({ "note": note, "offline": true })))
    }

    async fn update_note_offline(&self, id: &str, body: Option<&Value>) -> SyncResult<ApiResponse> {
        let Some(update) = body.filter(|b| b.is_object()) else {
            return Ok(offline_error(400, "Failed to update note offline"));
        };

        // A create cannot carry a lock, so locking must wait for the server id
        if is_offline_id(id) && update.get("is_locked").is_some() {
            return Ok(offline_error(503, "Offline"));
        }

        let Some(mut note) = self.store.find_note(id).await else {
            return Ok(offline_error(404, "Note not found"));
        };

        if let Some(fields) = note.as_object_mut() {
            merge_object(fields, update);
            fields.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
            fields.insert("offline".to_string(), json!(true));
        }

        self.store.save_offline_note(note.clone()).await?;

        // Notes that only exist locally are folded into their pending create
        let folded = is_offline_id(id) && self.store.replace_queued_create(id, note.clone()).await?;
        if !folded {
            self.store
                .enqueue(QueueAction::Update, json!({ "id": id, "data": update }))
                .await?;
        }

        Ok(ApiResponse::new(200, json!({ "note": note, "offline": true })))
    }

    async fn delete_note_offline(&self, id: &str) -> SyncResult<ApiResponse> {
        self.store.remove_note(id).await?;

        if is_offline_id(id) {
            // Never reached the server: cancel its queued create and edits
            self.store.drop_queued(id).await?;
        } else {
            self.store
                .enqueue(QueueAction::Delete, json!({ "id": id }))
                .await?;
        }

        Ok(ApiResponse::new(200, json!({ "message": "Note deleted", "offline": true })))
    }

    async fn update_settings_offline(&self, body: Option<&Value>) -> SyncResult<ApiResponse> {
        let Some(settings) = body.filter(|b| b.is_object()) else {
            return Ok(offline_error(400, "Failed to update settings offline"));
        };

        let mut user = match self.store.user().await {
            Some(Value::Object(user)) => user,
            _ => Map::new(),
        };
        merge_object(&mut user, settings);

        let user = Value::Object(user);
        self.store.set_user(user.clone()).await?;

        Ok(ApiResponse::new(200, json!({ "user": user, "offline": true })))
    }
}
