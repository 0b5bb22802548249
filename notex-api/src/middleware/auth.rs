/// Authentication layers for protected routes
///
/// `jwt_auth_layer` resolves the bearer token to an [`AuthContext`] and
/// stores it in request extensions. `admin_only_layer` must run after it and
/// rejects callers without the admin flag.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use notex_shared::auth::{
    authorization::require_admin,
    middleware::{authenticate, AuthContext},
};

pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = authenticate(&state.db, state.jwt_secret(), req.headers()).await?;
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

pub async fn admin_only_layer(req: Request, next: Next) -> Result<Response, ApiError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::Unauthorized("Missing credentials".to_string()))?;

    require_admin(auth)?;

    Ok(next.run(req).await)
}
