/// User search for picking a share receiver
///
/// `GET /api/search/users?q=<substring>` returns at most ten matching users,
/// excluding the caller and banned accounts. A blank query returns an empty
/// list without touching the database.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use notex_shared::{
    auth::middleware::AuthContext,
    models::user::{User, UserSummary},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub users: Vec<UserSummary>,
}

pub async fn search_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(SearchResponse { users: Vec::new() }));
    }

    let users = User::search_by_username(&state.db, q, auth.user_id).await?;
    Ok(Json(SearchResponse { users }))
}
