use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod handlers;
pub mod listing;
pub mod models;
pub mod repository;
pub mod store;

// Routing segregated by access level (public, authenticated, admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{RealtimeRepository, Repository, RepositoryState};
pub use store::{DocumentStore, FirebaseStore, MemoryStore, StoreState};

use handlers::{articles, categories, session, stats, users};

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` annotations, served as JSON at
/// `/api-docs/openapi.json` and browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        session::login, session::get_me, session::update_me,
        articles::list_published_articles, articles::get_featured_articles,
        articles::get_article_by_slug, articles::like_article,
        articles::list_admin_articles, articles::get_admin_article,
        articles::create_article, articles::update_article,
        articles::update_article_status, articles::delete_article,
        categories::list_categories, categories::get_category_by_slug,
        categories::list_category_articles, categories::list_admin_categories,
        categories::create_category, categories::update_category, categories::delete_category,
        users::list_users, users::get_user, users::create_user,
        users::update_user, users::delete_user,
        stats::get_dashboard_stats
    ),
    components(
        schemas(
            models::Article, models::ArticleSummary, models::ArticleStatus,
            models::Category, models::Role, models::UserProfile, models::DashboardStats,
            models::LikeResponse, models::LoginRequest, models::LoginResponse,
            models::UpdateMeRequest, models::CreateArticleRequest,
            models::UpdateArticleRequest, models::UpdateStatusRequest,
            models::CreateCategoryRequest, models::UpdateCategoryRequest,
            models::CreateUserRequest, models::UpdateUserRequest,
            listing::ArticleSort,
        )
    ),
    tags(
        (name = "culinary-cms", description = "Culinary news CMS API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container of everything a handler needs.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer; Firebase in production, in-memory locally and in tests.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl AppState {
    /// Wires a `RealtimeRepository` over `store`.
    pub fn new(store: StoreState, config: AppConfig) -> Self {
        Self {
            repo: Arc::new(RealtimeRepository::new(store)),
            config,
        }
    }

    /// State over a fresh `MemoryStore`.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the authenticated and admin routers.
///
/// *Mechanism*: it asks for an `AuthUser`. The extractor validates the token and loads
/// the account, and on failure rejects the request with 401 before the handler runs.
/// Role checks (editor, admin) happen inside the handlers, once this layer has passed.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies the scoped auth layer and the global
/// observability layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header used for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: reader-facing and login.
        .merge(public::public_routes())
        // Authenticated Routes: any active staff account.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin Routes: back office, nested under '/admin'.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers (outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` set by the layer above so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
