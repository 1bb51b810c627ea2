use serde::Deserialize;
use std::cmp::Reverse;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::{Article, Page};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 50;

/// PageParams
///
/// Raw `page`/`limit` query parameters. Resolved leniently: missing or zero page means
/// the first page, the limit is clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl PageParams {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// paginate
///
/// Cuts one page out of an already filtered and sorted list.
pub fn paginate<T>(items: Vec<T>, params: PageParams) -> Page<T> {
    let page = params.page();
    let limit = params.limit();
    let total = items.len();
    let total_pages = total.div_ceil(limit);

    let items = items
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();

    Page {
        items,
        total,
        page,
        limit,
        total_pages,
    }
}

/// matches_search
///
/// Every whitespace-separated term of `query` must occur, case-insensitively, in the
/// title, excerpt, body or one of the tags. A blank query matches everything.
pub fn matches_search(article: &Article, query: &str) -> bool {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if terms.is_empty() {
        return true;
    }

    let haystack = format!(
        "{}\n{}\n{}\n{}",
        article.title,
        article.excerpt,
        article.body,
        article.tags.join("\n")
    )
    .to_lowercase();

    terms.iter().all(|term| haystack.contains(term.as_str()))
}

pub fn has_tag(article: &Article, tag: &str) -> bool {
    let tag = tag.trim();
    article.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// ArticleSort
///
/// Orderings offered by the article listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ArticleSort {
    /// Newest publication first; unpublished articles fall back to their creation date.
    #[default]
    Latest,
    Oldest,
    /// Most viewed first, likes breaking ties.
    Popular,
    /// Most recently edited first.
    Updated,
    Title,
}

pub fn sort_articles(articles: &mut [Article], sort: ArticleSort) {
    match sort {
        ArticleSort::Latest => {
            articles.sort_by_key(|a| Reverse((a.published_at.unwrap_or(a.created_at), a.created_at)))
        }
        ArticleSort::Oldest => {
            articles.sort_by_key(|a| (a.published_at.unwrap_or(a.created_at), a.created_at))
        }
        ArticleSort::Popular => articles.sort_by_key(|a| Reverse((a.views, a.likes))),
        ArticleSort::Updated => articles.sort_by_key(|a| Reverse(a.updated_at)),
        ArticleSort::Title => articles.sort_by_cached_key(|a| a.title.to_lowercase()),
    }
}
