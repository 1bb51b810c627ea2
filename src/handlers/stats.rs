use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    listing::{ArticleSort, sort_articles},
    models::{Article, ArticleStatus, ArticleSummary, DashboardStats},
};

const TOP_ARTICLES: usize = 5;

/// get_dashboard_stats
///
/// [Admin Route] Counters for the dashboard, computed from full collection reads.
/// Admins and editors only.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = DashboardStats),
        (status = 403, description = "Not an editor")
    )
)]
pub async fn get_dashboard_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DashboardStats>> {
    user.require(|role| role.can_moderate())?;

    let articles = state.repo.list_articles().await?;
    let total_categories = state.repo.list_categories().await?.len();
    let total_users = state.repo.list_users().await?.len();

    let count = |status: ArticleStatus| articles.iter().filter(|a| a.status == status).count();

    let mut published: Vec<Article> = articles
        .iter()
        .filter(|a| a.is_published())
        .cloned()
        .collect();
    sort_articles(&mut published, ArticleSort::Popular);

    Ok(Json(DashboardStats {
        total_articles: articles.len(),
        published_articles: count(ArticleStatus::Published),
        draft_articles: count(ArticleStatus::Draft),
        archived_articles: count(ArticleStatus::Archived),
        total_categories,
        total_users,
        total_views: articles.iter().map(|a| a.views).sum(),
        total_likes: articles.iter().map(|a| a.likes).sum(),
        top_articles: published
            .iter()
            .take(TOP_ARTICLES)
            .map(ArticleSummary::from)
            .collect(),
    }))
}
