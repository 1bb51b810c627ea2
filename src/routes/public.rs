use crate::{
    AppState,
    handlers::{articles, categories, session},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints of the reader-facing site. Article handlers only ever
/// return `published` articles here.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/login
        // Exchanges staff credentials for a session token.
        .route("/auth/login", post(session::login))
        // GET /articles?page=&limit=&search=&category=&tag=&sort=
        .route("/articles", get(articles::list_published_articles))
        // GET /articles/featured
        // Static segment, matched before the slug route below.
        .route("/articles/featured", get(articles::get_featured_articles))
        // GET /articles/{slug}
        // Reader view; counts a view.
        .route("/articles/{slug}", get(articles::get_article_by_slug))
        // POST /articles/{slug}/like
        .route("/articles/{slug}/like", post(articles::like_article))
        .route("/categories", get(categories::list_categories))
        .route("/categories/{slug}", get(categories::get_category_by_slug))
        .route(
            "/categories/{slug}/articles",
            get(categories::list_category_articles),
        )
}
