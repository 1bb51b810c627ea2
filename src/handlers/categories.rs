use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{articles::summarize, optional_text, required_text};
use crate::{
    AppState,
    auth::AuthUser,
    content,
    error::{AppError, AppResult},
    listing::{ArticleSort, PageParams, paginate, sort_articles},
    models::{
        Article, ArticleSummary, Category, CreateCategoryRequest, Page, UpdateCategoryRequest,
    },
    repository::RepositoryState,
    store::StoreError,
};

pub const DEFAULT_COLOR: &str = "#E4572E";
const MAX_NAME_CHARS: usize = 80;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct CategoryArticlesParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub sort: Option<ArticleSort>,
}

/// refresh_category_counts
///
/// Recomputes the denormalized `article_count` (published articles only) of each
/// listed category from the article collection. Categories that no longer exist are
/// skipped so the patch cannot resurrect them.
pub(crate) async fn refresh_category_counts(
    repo: &RepositoryState,
    category_ids: &[Uuid],
) -> Result<(), StoreError> {
    let articles = repo.list_articles().await?;

    let mut seen: Vec<Uuid> = Vec::with_capacity(category_ids.len());
    for id in category_ids {
        if seen.contains(id) {
            continue;
        }
        seen.push(*id);

        if repo.get_category(*id).await?.is_none() {
            continue;
        }
        let count = articles
            .iter()
            .filter(|a| a.category_id == *id && a.is_published())
            .count() as u64;
        repo.set_category_article_count(*id, count).await?;
    }
    Ok(())
}

fn resolve_color(color: Option<String>) -> AppResult<Option<String>> {
    match optional_text(color) {
        Some(color) if content::is_hex_color(&color) => Ok(Some(color.to_uppercase())),
        Some(_) => Err(AppError::Validation(
            "Color must be a hex value like #E4572E".to_string(),
        )),
        None => Ok(None),
    }
}

/// Rejects `slug` when another category already owns it.
fn ensure_slug_free(slug: &str, categories: &[Category], own_id: Option<Uuid>) -> AppResult<()> {
    let taken = categories
        .iter()
        .any(|c| c.slug == slug && Some(c.id) != own_id);
    if taken {
        return Err(AppError::Conflict(format!(
            "A category with slug '{slug}' already exists"
        )));
    }
    Ok(())
}

async fn sorted_categories(state: &AppState) -> AppResult<Vec<Category>> {
    let mut categories = state.repo.list_categories().await?;
    categories.sort_by_cached_key(|c| c.name.to_lowercase());
    Ok(categories)
}

/// list_categories
///
/// [Public Route] All categories, alphabetical.
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(sorted_categories(&state).await?))
}

#[utoipa::path(
    get,
    path = "/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Category>> {
    state
        .repo
        .find_category_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Category"))
}

/// list_category_articles
///
/// [Public Route] Published articles of one category, paginated.
#[utoipa::path(
    get,
    path = "/categories/{slug}/articles",
    params(("slug" = String, Path, description = "Category slug"), CategoryArticlesParams),
    responses(
        (status = 200, description = "Published articles", body = Page<ArticleSummary>),
        (status = 404, description = "Unknown category")
    )
)]
pub async fn list_category_articles(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<CategoryArticlesParams>,
) -> AppResult<Json<Page<ArticleSummary>>> {
    let category = state
        .repo
        .find_category_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound("Category"))?;

    let mut articles: Vec<Article> = state
        .repo
        .list_articles()
        .await?
        .into_iter()
        .filter(|a| a.is_published() && a.category_id == category.id)
        .collect();
    sort_articles(&mut articles, params.sort.unwrap_or_default());

    let page = PageParams {
        page: params.page,
        limit: params.limit,
    };
    Ok(Json(summarize(paginate(articles, page))))
}

/// list_admin_categories
///
/// [Admin Route] Same data as the public listing; every staff role needs it to file
/// articles.
#[utoipa::path(
    get,
    path = "/admin/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_admin_categories(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(sorted_categories(&state).await?))
}

/// create_category
///
/// [Admin Route] Admins and editors. The slug comes from `slug` or the name and must be
/// unique.
#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Duplicate slug")
    )
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    user.require(|role| role.can_manage_categories())?;

    let name = required_text("Name", &payload.name, MAX_NAME_CHARS)?;
    let slug = content::slugify(optional_text(payload.slug).as_deref().unwrap_or(&name));
    let existing = state.repo.list_categories().await?;
    ensure_slug_free(&slug, &existing, None)?;

    let now = Utc::now();
    let category = Category {
        id: Uuid::new_v4(),
        name,
        slug,
        description: optional_text(payload.description),
        color: resolve_color(payload.color)?.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        icon: optional_text(payload.icon),
        article_count: 0,
        created_at: now,
        updated_at: now,
    };
    state.repo.save_category(&category).await?;

    tracing::info!(category_id = %category.id, slug = %category.slug, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// update_category
///
/// [Admin Route] Partial update; renaming keeps the slug unless a new one is given.
#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Duplicate slug")
    )
)]
pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> AppResult<Json<Category>> {
    user.require(|role| role.can_manage_categories())?;

    let mut category = state
        .repo
        .get_category(id)
        .await?
        .ok_or(AppError::NotFound("Category"))?;

    if let Some(name) = &payload.name {
        category.name = required_text("Name", name, MAX_NAME_CHARS)?;
    }
    if let Some(slug) = optional_text(payload.slug) {
        let slug = content::slugify(&slug);
        let existing = state.repo.list_categories().await?;
        ensure_slug_free(&slug, &existing, Some(category.id))?;
        category.slug = slug;
    }
    if let Some(description) = payload.description {
        category.description = optional_text(Some(description));
    }
    if let Some(color) = resolve_color(payload.color)? {
        category.color = color;
    }
    if let Some(icon) = payload.icon {
        category.icon = optional_text(Some(icon));
    }
    category.updated_at = Utc::now();

    state.repo.save_category(&category).await?;
    Ok(Json(category))
}

/// delete_category
///
/// [Admin Route] Refused with 409 while any article, in any status, still uses the
/// category.
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Category still has articles")
    )
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require(|role| role.can_manage_categories())?;

    if state.repo.get_category(id).await?.is_none() {
        return Err(AppError::NotFound("Category"));
    }

    let in_use = state
        .repo
        .list_articles()
        .await?
        .iter()
        .filter(|a| a.category_id == id)
        .count();
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Category still has {in_use} article(s)"
        )));
    }

    state.repo.delete_category(id).await?;
    tracing::info!(category_id = %id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}
