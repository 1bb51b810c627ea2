use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{categories::refresh_category_counts, optional_text, required_text};
use crate::{
    AppState,
    auth::AuthUser,
    content::{self, EXCERPT_CHARS},
    error::{AppError, AppResult},
    listing::{ArticleSort, MAX_PAGE_SIZE, PageParams, has_tag, matches_search, paginate, sort_articles},
    models::{
        Article, ArticleStatus, ArticleSummary, CreateArticleRequest, LikeResponse, Page,
        UpdateArticleRequest, UpdateStatusRequest,
    },
};

const MAX_TITLE_CHARS: usize = 200;
const DEFAULT_FEATURED: usize = 5;

// --- Filter Structs ---

/// ArticleFilter
///
/// Query parameters of the public listing (GET /articles).
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ArticleFilter {
    /// 1-based page number.
    pub page: Option<usize>,
    /// Page size, at most 50.
    pub limit: Option<usize>,
    /// Every term must appear in the title, excerpt, body or tags.
    pub search: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    pub tag: Option<String>,
    pub sort: Option<ArticleSort>,
}

/// AdminArticleFilter
///
/// Query parameters of the back-office listing (GET /admin/articles).
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct AdminArticleFilter {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
    pub status: Option<ArticleStatus>,
    /// Category id.
    pub category: Option<Uuid>,
    /// Author id.
    pub author: Option<Uuid>,
    pub sort: Option<ArticleSort>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct FeaturedParams {
    pub limit: Option<usize>,
}

pub(crate) fn summarize(page: Page<Article>) -> Page<ArticleSummary> {
    Page {
        items: page.items.iter().map(ArticleSummary::from).collect(),
        total: page.total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages,
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Slug for `requested` (or `fallback` when absent), made unique against every other
/// article.
fn article_slug(requested: Option<&str>, fallback: &str, others: &[Article], own_id: Uuid) -> String {
    let base = content::slugify(requested.unwrap_or(fallback));
    content::unique_slug(
        &base,
        others
            .iter()
            .filter(|a| a.id != own_id)
            .map(|a| a.slug.as_str()),
    )
}

/// Authors may only touch their own articles, and only while those are drafts.
/// Foreign articles are reported as missing rather than forbidden.
fn authorize_edit(user: &AuthUser, article: &Article) -> AppResult<()> {
    if user.role.can_moderate() {
        return Ok(());
    }
    if article.author_id != user.id {
        return Err(AppError::NotFound("Article"));
    }
    if article.status != ArticleStatus::Draft {
        return Err(AppError::Forbidden(
            "Only editors can change an article after it leaves draft",
        ));
    }
    Ok(())
}

// --- Public Handlers ---

/// list_published_articles
///
/// [Public Route] Paginated listing of published articles with search, category, tag
/// and sort filters. Unknown category slugs yield an empty page.
#[utoipa::path(
    get,
    path = "/articles",
    params(ArticleFilter),
    responses((status = 200, description = "Published articles", body = Page<ArticleSummary>))
)]
pub async fn list_published_articles(
    State(state): State<AppState>,
    Query(filter): Query<ArticleFilter>,
) -> AppResult<Json<Page<ArticleSummary>>> {
    let mut articles: Vec<Article> = state
        .repo
        .list_articles()
        .await?
        .into_iter()
        .filter(Article::is_published)
        .collect();

    if let Some(slug) = non_blank(&filter.category) {
        match state.repo.find_category_by_slug(slug).await? {
            Some(category) => articles.retain(|a| a.category_id == category.id),
            None => articles.clear(),
        }
    }
    if let Some(tag) = non_blank(&filter.tag) {
        articles.retain(|a| has_tag(a, tag));
    }
    if let Some(query) = non_blank(&filter.search) {
        articles.retain(|a| matches_search(a, query));
    }

    sort_articles(&mut articles, filter.sort.unwrap_or_default());
    let params = PageParams {
        page: filter.page,
        limit: filter.limit,
    };
    Ok(Json(summarize(paginate(articles, params))))
}

/// get_featured_articles
///
/// [Public Route] Published articles flagged as featured, newest first.
#[utoipa::path(
    get,
    path = "/articles/featured",
    params(FeaturedParams),
    responses((status = 200, description = "Featured articles", body = [ArticleSummary]))
)]
pub async fn get_featured_articles(
    State(state): State<AppState>,
    Query(params): Query<FeaturedParams>,
) -> AppResult<Json<Vec<ArticleSummary>>> {
    let limit = params.limit.unwrap_or(DEFAULT_FEATURED).clamp(1, MAX_PAGE_SIZE);

    let mut featured: Vec<Article> = state
        .repo
        .list_articles()
        .await?
        .into_iter()
        .filter(|a| a.is_published() && a.featured)
        .collect();
    sort_articles(&mut featured, ArticleSort::Latest);

    Ok(Json(featured.iter().take(limit).map(ArticleSummary::from).collect()))
}

/// get_article_by_slug
///
/// [Public Route] Full article for the reader view. Counts the read: the returned
/// `views` already includes it.
#[utoipa::path(
    get,
    path = "/articles/{slug}",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Found", body = Article),
        (status = 404, description = "Missing or not published")
    )
)]
pub async fn get_article_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Article>> {
    let mut article = state
        .repo
        .find_article_by_slug(&slug)
        .await?
        .filter(Article::is_published)
        .ok_or(AppError::NotFound("Article"))?;

    article.views = state.repo.increment_article_views(article.id).await?;
    Ok(Json(article))
}

/// like_article
///
/// [Public Route] Anonymous like. No per-visitor deduplication happens server-side.
#[utoipa::path(
    post,
    path = "/articles/{slug}/like",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Liked", body = LikeResponse),
        (status = 404, description = "Missing or not published")
    )
)]
pub async fn like_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<LikeResponse>> {
    let article = state
        .repo
        .find_article_by_slug(&slug)
        .await?
        .filter(Article::is_published)
        .ok_or(AppError::NotFound("Article"))?;

    let likes = state.repo.increment_article_likes(article.id).await?;
    Ok(Json(LikeResponse { likes }))
}

// --- Back Office Handlers ---

/// list_admin_articles
///
/// [Admin Route] Every article regardless of status. Authors only see their own.
#[utoipa::path(
    get,
    path = "/admin/articles",
    params(AdminArticleFilter),
    responses((status = 200, description = "Articles", body = Page<ArticleSummary>))
)]
pub async fn list_admin_articles(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AdminArticleFilter>,
) -> AppResult<Json<Page<ArticleSummary>>> {
    let mut articles = state.repo.list_articles().await?;

    if !user.role.can_moderate() {
        articles.retain(|a| a.author_id == user.id);
    }
    if let Some(status) = filter.status {
        articles.retain(|a| a.status == status);
    }
    if let Some(category_id) = filter.category {
        articles.retain(|a| a.category_id == category_id);
    }
    if let Some(author_id) = filter.author {
        articles.retain(|a| a.author_id == author_id);
    }
    if let Some(query) = non_blank(&filter.search) {
        articles.retain(|a| matches_search(a, query));
    }

    sort_articles(&mut articles, filter.sort.unwrap_or(ArticleSort::Updated));
    let params = PageParams {
        page: filter.page,
        limit: filter.limit,
    };
    Ok(Json(summarize(paginate(articles, params))))
}

/// get_admin_article
///
/// [Admin Route] Single article for the editor, any status.
#[utoipa::path(
    get,
    path = "/admin/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Found", body = Article),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_admin_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Article>> {
    let article = state
        .repo
        .get_article(id)
        .await?
        .filter(|a| user.role.can_moderate() || a.author_id == user.id)
        .ok_or(AppError::NotFound("Article"))?;
    Ok(Json(article))
}

/// create_article
///
/// [Admin Route] Creates an article authored by the caller. Authors can only create
/// non-featured drafts. Slug, excerpt and reading time are derived from the input.
#[utoipa::path(
    post,
    path = "/admin/articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Created", body = Article),
        (status = 400, description = "Invalid input or unknown category"),
        (status = 403, description = "Role may not publish or feature")
    )
)]
pub async fn create_article(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateArticleRequest>,
) -> AppResult<(StatusCode, Json<Article>)> {
    let title = required_text("Title", &payload.title, MAX_TITLE_CHARS)?;
    if payload.body.trim().is_empty() {
        return Err(AppError::Validation("Body is required".to_string()));
    }

    let status = payload.status.unwrap_or_default();
    if (status != ArticleStatus::Draft || payload.featured) && !user.role.can_moderate() {
        return Err(AppError::Forbidden("Authors can only create drafts"));
    }

    if state.repo.get_category(payload.category_id).await?.is_none() {
        return Err(AppError::Validation("Unknown category".to_string()));
    }

    let id = Uuid::new_v4();
    let existing = state.repo.list_articles().await?;
    let slug = article_slug(non_blank(&payload.slug), &title, &existing, id);
    let excerpt = optional_text(payload.excerpt)
        .unwrap_or_else(|| content::excerpt(&payload.body, EXCERPT_CHARS));

    let now = Utc::now();
    let article = Article {
        id,
        title,
        slug,
        excerpt,
        reading_time: content::reading_time(&payload.body),
        body: payload.body,
        cover_image_url: optional_text(payload.cover_image_url),
        tags: content::normalize_tags(&payload.tags),
        status,
        featured: payload.featured,
        category_id: payload.category_id,
        author_id: user.id,
        author_name: user.name.clone(),
        views: 0,
        likes: 0,
        created_at: now,
        updated_at: now,
        published_at: (status == ArticleStatus::Published).then_some(now),
    };

    state.repo.save_article(&article).await?;
    if article.is_published() {
        refresh_category_counts(&state.repo, &[article.category_id]).await?;
    }

    tracing::info!(article_id = %article.id, slug = %article.slug, author = %user.id, "article created");
    Ok((StatusCode::CREATED, Json(article)))
}

/// update_article
///
/// [Admin Route] Partial update. The slug only changes when one is supplied; the reading
/// time follows the body. Moving a published article refreshes both category counts.
#[utoipa::path(
    put,
    path = "/admin/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = Article),
        (status = 403, description = "Not allowed for this role"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateArticleRequest>,
) -> AppResult<Json<Article>> {
    let mut article = state
        .repo
        .get_article(id)
        .await?
        .ok_or(AppError::NotFound("Article"))?;
    authorize_edit(&user, &article)?;

    if payload.featured.is_some_and(|f| f != article.featured) && !user.role.can_moderate() {
        return Err(AppError::Forbidden("Only editors can feature articles"));
    }

    if let Some(title) = &payload.title {
        article.title = required_text("Title", title, MAX_TITLE_CHARS)?;
    }
    if let Some(body) = payload.body {
        if body.trim().is_empty() {
            return Err(AppError::Validation("Body is required".to_string()));
        }
        article.reading_time = content::reading_time(&body);
        article.body = body;
    }
    if let Some(requested) = non_blank(&payload.slug) {
        let others = state.repo.list_articles().await?;
        article.slug = article_slug(Some(requested), &article.title, &others, article.id);
    }
    if let Some(excerpt) = payload.excerpt {
        article.excerpt = optional_text(Some(excerpt))
            .unwrap_or_else(|| content::excerpt(&article.body, EXCERPT_CHARS));
    }
    if let Some(cover) = payload.cover_image_url {
        article.cover_image_url = optional_text(Some(cover));
    }
    if let Some(tags) = &payload.tags {
        article.tags = content::normalize_tags(tags);
    }
    if let Some(featured) = payload.featured {
        article.featured = featured;
    }

    let previous_category = article.category_id;
    if let Some(category_id) = payload.category_id {
        if state.repo.get_category(category_id).await?.is_none() {
            return Err(AppError::Validation("Unknown category".to_string()));
        }
        article.category_id = category_id;
    }

    article.updated_at = Utc::now();
    state.repo.save_article(&article).await?;

    if article.is_published() && previous_category != article.category_id {
        refresh_category_counts(&state.repo, &[previous_category, article.category_id]).await?;
    }

    tracing::info!(article_id = %article.id, editor = %user.id, "article updated");
    Ok(Json(article))
}

/// update_article_status
///
/// [Admin Route] Moderation endpoint: publish, unpublish or archive. Admins and editors
/// only. The first publication stamps `published_at`.
#[utoipa::path(
    put,
    path = "/admin/articles/{id}/status",
    params(("id" = Uuid, Path, description = "Article ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Article),
        (status = 403, description = "Not an editor"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_article_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Article>> {
    user.require(|role| role.can_moderate())?;

    let mut article = state
        .repo
        .get_article(id)
        .await?
        .ok_or(AppError::NotFound("Article"))?;

    let now = Utc::now();
    let previous = article.status;
    article.status = payload.status;
    if article.status == ArticleStatus::Published && article.published_at.is_none() {
        article.published_at = Some(now);
    }
    article.updated_at = now;

    state.repo.save_article(&article).await?;
    if previous != article.status {
        refresh_category_counts(&state.repo, &[article.category_id]).await?;
    }

    tracing::info!(
        article_id = %article.id,
        from = previous.as_str(),
        to = article.status.as_str(),
        "article status changed"
    );
    Ok(Json(article))
}

/// delete_article
///
/// [Admin Route] Removes an article. Authors can only delete their own drafts.
#[utoipa::path(
    delete,
    path = "/admin/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not allowed for this role"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let article = state
        .repo
        .get_article(id)
        .await?
        .ok_or(AppError::NotFound("Article"))?;
    authorize_edit(&user, &article)?;

    if !state.repo.delete_article(id).await? {
        return Err(AppError::NotFound("Article"));
    }
    if article.is_published() {
        refresh_category_counts(&state.repo, &[article.category_id]).await?;
    }

    tracing::info!(article_id = %id, editor = %user.id, "article deleted");
    Ok(StatusCode::NO_CONTENT)
}
