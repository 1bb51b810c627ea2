use crate::models::{Article, Category, User};
use crate::store::{StoreError, StoreState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use uuid::Uuid;

pub const ARTICLES: &str = "articles";
pub const CATEGORIES: &str = "categories";
pub const USERS: &str = "users";

/// Repository Trait
///
/// Abstract contract for all persistence operations, one keyed collection per record
/// type. Handlers only see this trait (`Arc<dyn Repository>`), never the store behind it.
///
/// List operations return every record of a collection: filtering, sorting and
/// pagination happen in memory in the handlers.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Articles ---
    async fn list_articles(&self) -> Result<Vec<Article>, StoreError>;
    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, StoreError>;
    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError>;
    // Insert or update. `views` and `likes` are never written here; only the
    // increment operations touch them.
    async fn save_article(&self, article: &Article) -> Result<(), StoreError>;
    // Returns false when nothing was stored under `id`.
    async fn delete_article(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn increment_article_views(&self, id: Uuid) -> Result<u64, StoreError>;
    async fn increment_article_likes(&self, id: Uuid) -> Result<u64, StoreError>;

    // --- Categories ---
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError>;
    async fn save_category(&self, category: &Category) -> Result<(), StoreError>;
    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn set_category_article_count(&self, id: Uuid, count: u64) -> Result<(), StoreError>;

    // --- Users ---
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    // Case-insensitive.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// RealtimeRepository
///
/// `Repository` backed by a `DocumentStore`. Records live under
/// `{collection}/{id}` as plain JSON objects.
pub struct RealtimeRepository {
    store: StoreState,
}

impl RealtimeRepository {
    pub fn new(store: StoreState) -> Self {
        Self { store }
    }

    fn path(collection: &str, id: Uuid) -> String {
        format!("{collection}/{id}")
    }

    /// Reads a whole collection. Records that no longer match the schema are skipped so
    /// one hand-edited node cannot take a listing down.
    async fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, StoreError> {
        let Some(Value::Object(records)) = self.store.get(collection).await? else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::with_capacity(records.len());
        for (key, record) in records {
            match serde_json::from_value(record) {
                Ok(row) => rows.push(row),
                Err(e) => tracing::warn!(collection, key = %key, error = %e, "skipping malformed record"),
            }
        }
        Ok(rows)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<T>, StoreError> {
        let path = Self::path(collection, id);
        match self.store.get(&path).await? {
            Some(record) => serde_json::from_value(record)
                .map(Some)
                .map_err(|source| StoreError::Malformed { path, source }),
            None => Ok(None),
        }
    }

    async fn save<T: Serialize + Sync>(
        &self,
        collection: &str,
        id: Uuid,
        record: &T,
    ) -> Result<(), StoreError> {
        let path = Self::path(collection, id);
        let value = serde_json::to_value(record)
            .map_err(|source| StoreError::Malformed { path: path.clone(), source })?;
        self.store.put(&path, value).await
    }

    async fn remove(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let path = Self::path(collection, id);
        if self.store.get(&path).await?.is_none() {
            return Ok(false);
        }
        self.store.delete(&path).await?;
        Ok(true)
    }

    async fn bump(&self, collection: &str, id: Uuid, field: &str) -> Result<u64, StoreError> {
        let path = Self::path(collection, id);
        let value = self.store.increment(&path, field, 1).await?;

        // A record deleted between the read and the bump comes back as a bare counter
        // node; drop it so listings and fetches never see it.
        if self.store.get(&format!("{path}/id")).await?.is_none() {
            tracing::debug!(collection, %id, field, "dropping counter of a deleted record");
            self.store.delete(&path).await?;
        }
        Ok(u64::try_from(value).unwrap_or(0))
    }
}

#[async_trait]
impl Repository for RealtimeRepository {
    async fn list_articles(&self) -> Result<Vec<Article>, StoreError> {
        self.list(ARTICLES).await
    }

    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, StoreError> {
        self.fetch(ARTICLES, id).await
    }

    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError> {
        Ok(self
            .list_articles()
            .await?
            .into_iter()
            .find(|article| article.slug == slug))
    }

    async fn save_article(&self, article: &Article) -> Result<(), StoreError> {
        let path = Self::path(ARTICLES, article.id);
        let mut fields = match serde_json::to_value(article) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => Map::new(),
            Err(source) => return Err(StoreError::Malformed { path, source }),
        };
        fields.remove("views");
        fields.remove("likes");
        self.store.patch(&path, fields).await
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool, StoreError> {
        self.remove(ARTICLES, id).await
    }

    async fn increment_article_views(&self, id: Uuid) -> Result<u64, StoreError> {
        self.bump(ARTICLES, id, "views").await
    }

    async fn increment_article_likes(&self, id: Uuid) -> Result<u64, StoreError> {
        self.bump(ARTICLES, id, "likes").await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.list(CATEGORIES).await
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        self.fetch(CATEGORIES, id).await
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        Ok(self
            .list_categories()
            .await?
            .into_iter()
            .find(|category| category.slug == slug))
    }

    async fn save_category(&self, category: &Category) -> Result<(), StoreError> {
        self.save(CATEGORIES, category.id, category).await
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        self.remove(CATEGORIES, id).await
    }

    async fn set_category_article_count(&self, id: Uuid, count: u64) -> Result<(), StoreError> {
        let mut fields = Map::new();
        fields.insert("article_count".to_string(), json!(count));
        self.store.patch(&Self::path(CATEGORIES, id), fields).await
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.list(USERS).await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.fetch(USERS, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .list_users()
            .await?
            .into_iter()
            .find(|user| user.email.to_lowercase() == email))
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        self.save(USERS, user.id, user).await
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        self.remove(USERS, id).await
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut fields = Map::new();
        fields.insert("last_login_at".to_string(), json!(at));
        self.store.patch(&Self::path(USERS, id), fields).await
    }
}
