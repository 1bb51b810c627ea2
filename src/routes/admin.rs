use crate::{
    AppState,
    handlers::{articles, categories, stats, users},
};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// The back office, nested under `/admin`. Access matrix:
/// - articles: every role (authors limited to their own drafts), status changes for
///   admins and editors only;
/// - categories: read for every role, writes for admins and editors;
/// - users: admins only;
/// - stats: admins and editors.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        .route("/stats", get(stats::get_dashboard_stats))
        // --- Articles ---
        .route(
            "/articles",
            get(articles::list_admin_articles).post(articles::create_article),
        )
        .route(
            "/articles/{id}",
            get(articles::get_admin_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        // PUT /admin/articles/{id}/status
        // Moderation: publish, unpublish, archive.
        .route("/articles/{id}/status", put(articles::update_article_status))
        // --- Categories ---
        .route(
            "/categories",
            get(categories::list_admin_categories).post(categories::create_category),
        )
        .route(
            "/categories/{id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        // --- Users ---
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}
