/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use notex_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = notex_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        auth::{admin_only_layer, jwt_auth_layer},
        security::SecurityHeadersLayer,
    },
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /api/
///     ├── /auth/
///     │   ├── POST /signup             # public
///     │   ├── POST /login              # public
///     │   ├── POST /refresh            # public
///     │   ├── POST /reset-password     # public, needs an admin-issued token
///     │   └── GET  /me
///     ├── /notes/
///     │   ├── GET    /
///     │   ├── POST   /
///     │   ├── GET    /:id
///     │   ├── PUT    /:id
///     │   ├── DELETE /:id
///     │   ├── POST   /:id/unlock
///     │   └── POST   /:id/share
///     ├── /notifications/
///     │   ├── GET  /
///     │   └── POST /:id                # accept | reject
///     ├── /user/
///     │   ├── DELETE /
///     │   └── PUT    /settings
///     ├── /search/
///     │   └── GET /users?q=
///     └── /admin/                      # admin only
///         ├── GET  /users
///         ├── POST /ban
///         └── POST /users/:id/reset-token
/// ```
///
/// # Middleware Stack
///
/// 1. Security headers
/// 2. CORS
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication and admin checks (per router)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let jwt = || axum::middleware::from_fn_with_state(state.clone(), jwt_auth_layer);

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .layer(jwt())
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/reset-password", post(routes::auth::reset_password));

    let note_routes = Router::new()
        .route(
            "/",
            get(routes::notes::list_notes).post(routes::notes::create_note),
        )
        .route(
            "/:id",
            get(routes::notes::get_note)
                .put(routes::notes::update_note)
                .delete(routes::notes::delete_note),
        )
        .route("/:id/unlock", post(routes::notes::unlock_note))
        .route("/:id/share", post(routes::notes::share_note))
        .layer(jwt());

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route("/:id", post(routes::notifications::act_on_notification))
        .layer(jwt());

    let user_routes = Router::new()
        .route("/", delete(routes::users::delete_account))
        .route("/settings", put(routes::users::update_settings))
        .layer(jwt());

    let search_routes = Router::new()
        .route("/users", get(routes::search::search_users))
        .layer(jwt());

    // Layers run outside-in: jwt_auth_layer must populate AuthContext first
    let admin_routes = Router::new()
        .route("/users", get(routes::admin::list_users))
        .route("/ban", post(routes::admin::ban_user))
        .route("/users/:id/reset-token", post(routes::admin::issue_reset_token))
        .layer(axum::middleware::from_fn(admin_only_layer))
        .layer(jwt());

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/notes", note_routes)
        .nest("/notifications", notification_routes)
        .nest("/user", user_routes)
        .nest("/search", search_routes)
        .nest("/admin", admin_routes);

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS policy for the configured origins
///
/// `*` yields a permissive policy for development.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
