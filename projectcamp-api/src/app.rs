/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use projectcamp_api::{app::{build_router, AppState}, config::Config};
/// use projectcamp_shared::media::UnconfiguredMediaStore;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, Arc::new(UnconfiguredMediaStore));
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::require_session, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use projectcamp_shared::media::MediaStore;
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

    /// Attachment storage
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, media: Arc<dyn MediaStore>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            media,
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
/// /api/v1
/// ├── GET  /healthcheck
/// ├── /auth
/// │   ├── POST /register, /login, /refresh-token, /forgot-password
/// │   ├── GET  /verify-email/:token
/// │   ├── POST /reset-password/:token
/// │   └── (session) POST /logout, /change-password, /resend-email-verification
/// │                 GET  /current-user
/// ├── /projects                                    (session)
/// │   ├── GET|POST /
/// │   ├── GET|PUT|DELETE /:project_id
/// │   └── GET|POST /:project_id/members, PUT|DELETE /:project_id/members/:user_id
/// ├── /tasks/:project_id                           (session)
/// │   ├── GET|POST /
/// │   ├── GET|PUT|DELETE /t/:task_id
/// │   ├── POST /t/:task_id/subtasks
/// │   ├── DELETE /t/:task_id/attachments/:attachment_id
/// │   └── PUT|DELETE /st/:subtask_id
/// └── /notes/:project_id                           (session)
///     ├── GET|POST /
///     └── GET|PUT|DELETE /n/:note_id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost last):
/// 1. Session authentication (protected routes only)
/// 2. Request body limit
/// 3. Logging (tower-http TraceLayer)
/// 4. CORS (tower-http CorsLayer)
/// 5. Security headers
pub fn build_router(state: AppState) -> Router {
    let session = axum::middleware::from_fn_with_state(state.clone(), require_session);

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh-token", post(routes::auth::refresh_token))
        .route("/verify-email/:token", get(routes::auth::verify_email))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/reset-password/:token", post(routes::auth::reset_password));

    let session_auth_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/current-user", get(routes::auth::current_user))
        .route("/change-password", post(routes::auth::change_password))
        .route(
            "/resend-email-verification",
            post(routes::auth::resend_email_verification),
        )
        .route_layer(session.clone());

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:project_id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/:project_id/members",
            get(routes::members::list_members).post(routes::members::add_member),
        )
        .route(
            "/:project_id/members/:user_id",
            put(routes::members::update_member_role).delete(routes::members::remove_member),
        )
        .route_layer(session.clone());

    let task_routes = Router::new()
        .route(
            "/:project_id",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:project_id/t/:task_id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/:project_id/t/:task_id/subtasks",
            post(routes::tasks::create_subtask),
        )
        .route(
            "/:project_id/t/:task_id/attachments/:attachment_id",
            delete(routes::tasks::delete_attachment),
        )
        .route(
            "/:project_id/st/:subtask_id",
            put(routes::tasks::update_subtask).delete(routes::tasks::delete_subtask),
        )
        .route_layer(session.clone());

    let note_routes = Router::new()
        .route(
            "/:project_id",
            get(routes::notes::list_notes).post(routes::notes::create_note),
        )
        .route(
            "/:project_id/n/:note_id",
            get(routes::notes::get_note)
                .put(routes::notes::update_note)
                .delete(routes::notes::delete_note),
        )
        .route_layer(session);

    let v1_routes = Router::new()
        .route("/healthcheck", get(routes::health::health_check))
        .nest("/auth", public_auth_routes.merge(session_auth_routes))
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/notes", note_routes);

    let cors = cors_layer(&state.config.api.cors_origins);
    let body_limit = state.config.uploads.max_body_bytes();
    let production = state.config.api.production;

    Router::new()
        .nest("/api/v1", v1_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}

/// `*` allows any origin without credentials; an explicit list allows
/// credentials so browsers send the session cookies
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
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
