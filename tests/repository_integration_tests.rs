use chrono::{TimeZone, Utc};
use culinary_cms::{
    DocumentStore, MemoryStore, RealtimeRepository, Repository,
    models::{Article, ArticleStatus, Category, Role, User},
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

// --- Fixtures ---

fn repo_over(store: Arc<MemoryStore>) -> RealtimeRepository {
    RealtimeRepository::new(store)
}

fn article(slug: &str) -> Article {
    let now = Utc::now();
    Article {
        id: Uuid::new_v4(),
        title: slug.replace('-', " "),
        slug: slug.to_string(),
        body: "Stir until glossy.".to_string(),
        category_id: Uuid::new_v4(),
        author_id: Uuid::new_v4(),
        reading_time: 1,
        created_at: now,
        updated_at: now,
        ..Default::default()
    }
}

fn user(email: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: "Pastry Chef".to_string(),
        password_hash: "hash".to_string(),
        role: Role::Editor,
        is_active: true,
        created_at: now,
        updated_at: now,
        last_login_at: None,
    }
}

// --- Articles ---

#[tokio::test]
async fn test_save_and_fetch_article() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo_over(store.clone());
    let saved = article("risotto-milanese");

    repo.save_article(&saved).await.unwrap();

    let fetched = repo.get_article(saved.id).await.unwrap().unwrap();
    assert_eq!(fetched.slug, "risotto-milanese");
    assert_eq!(fetched.body, saved.body);

    let by_slug = repo.find_article_by_slug("risotto-milanese").await.unwrap().unwrap();
    assert_eq!(by_slug.id, saved.id);

    assert!(repo.get_article(Uuid::new_v4()).await.unwrap().is_none());
    assert!(repo.find_article_by_slug("missing").await.unwrap().is_none());

    // Stored under articles/{id}.
    let raw = store.get(&format!("articles/{}", saved.id)).await.unwrap().unwrap();
    assert_eq!(raw["title"], "risotto milanese");
}

#[tokio::test]
async fn test_save_article_never_overwrites_counters() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo_over(store.clone());
    let mut saved = article("osso-buco");
    repo.save_article(&saved).await.unwrap();

    assert_eq!(repo.increment_article_views(saved.id).await.unwrap(), 1);
    assert_eq!(repo.increment_article_views(saved.id).await.unwrap(), 2);
    assert_eq!(repo.increment_article_likes(saved.id).await.unwrap(), 1);

    // A stale copy (counters at zero) is saved back.
    saved.title = "Osso Buco alla Milanese".to_string();
    saved.status = ArticleStatus::Published;
    repo.save_article(&saved).await.unwrap();

    let fetched = repo.get_article(saved.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Osso Buco alla Milanese");
    assert_eq!(fetched.status, ArticleStatus::Published);
    assert_eq!(fetched.views, 2);
    assert_eq!(fetched.likes, 1);
}

#[tokio::test]
async fn test_counter_bump_on_deleted_article_leaves_nothing_behind() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo_over(store.clone());
    let gone = article("tiramisu");
    repo.save_article(&gone).await.unwrap();
    repo.delete_article(gone.id).await.unwrap();

    repo.increment_article_views(gone.id).await.unwrap();
    repo.increment_article_likes(gone.id).await.unwrap();

    assert!(store.get(&format!("articles/{}", gone.id)).await.unwrap().is_none());
    assert!(repo.get_article(gone.id).await.unwrap().is_none());
    assert!(repo.list_articles().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_save_article_clears_removed_optional_fields() {
    let repo = repo_over(Arc::new(MemoryStore::new()));
    let mut saved = Article {
        cover_image_url: Some("https://cdn.example.com/a.jpg".to_string()),
        tags: vec!["italian".to_string()],
        ..article("panna-cotta")
    };
    repo.save_article(&saved).await.unwrap();

    saved.cover_image_url = None;
    saved.tags.clear();
    repo.save_article(&saved).await.unwrap();

    let fetched = repo.get_article(saved.id).await.unwrap().unwrap();
    assert!(fetched.cover_image_url.is_none());
    assert!(fetched.tags.is_empty());
}

#[tokio::test]
async fn test_delete_article_reports_existence() {
    let repo = repo_over(Arc::new(MemoryStore::new()));
    let saved = article("focaccia");
    repo.save_article(&saved).await.unwrap();

    assert!(repo.delete_article(saved.id).await.unwrap());
    assert!(!repo.delete_article(saved.id).await.unwrap());
    assert!(repo.list_articles().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_skips_malformed_records() {
    let good = article("minestrone");
    let store = Arc::new(MemoryStore::with_tree(json!({
        "articles": {
            good.id.to_string(): serde_json::to_value(&good).unwrap(),
            "hand-edited": { "title": "no ids here" }
        }
    })));
    let repo = repo_over(store);

    let listed = repo.list_articles().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, good.id);
}

#[tokio::test]
async fn test_fetching_a_malformed_record_is_an_error() {
    let id = Uuid::new_v4();
    let store = Arc::new(MemoryStore::with_tree(json!({
        "articles": { id.to_string(): { "title": 42 } }
    })));
    let repo = repo_over(store);

    assert!(repo.get_article(id).await.is_err());
}

// --- Categories ---

#[tokio::test]
async fn test_category_crud_and_count() {
    let repo = repo_over(Arc::new(MemoryStore::new()));
    let now = Utc::now();
    let category = Category {
        id: Uuid::new_v4(),
        name: "Fermentation".to_string(),
        slug: "fermentation".to_string(),
        color: "#336699".to_string(),
        created_at: now,
        updated_at: now,
        ..Default::default()
    };

    repo.save_category(&category).await.unwrap();
    repo.set_category_article_count(category.id, 4).await.unwrap();

    let fetched = repo.find_category_by_slug("fermentation").await.unwrap().unwrap();
    assert_eq!(fetched.article_count, 4);
    assert_eq!(fetched.name, "Fermentation");
    assert_eq!(repo.list_categories().await.unwrap().len(), 1);

    assert!(repo.delete_category(category.id).await.unwrap());
    assert!(repo.get_category(category.id).await.unwrap().is_none());
}

// --- Users ---

#[tokio::test]
async fn test_find_user_by_email_ignores_case() {
    let repo = repo_over(Arc::new(MemoryStore::new()));
    let saved = user("pastry@example.com");
    repo.save_user(&saved).await.unwrap();

    let found = repo.find_user_by_email(" Pastry@EXAMPLE.com ").await.unwrap().unwrap();
    assert_eq!(found.id, saved.id);
    assert!(repo.find_user_by_email("baker@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_touch_last_login_only_updates_timestamp() {
    let repo = repo_over(Arc::new(MemoryStore::new()));
    let saved = user("sommelier@example.com");
    repo.save_user(&saved).await.unwrap();

    let at = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();
    repo.touch_last_login(saved.id, at).await.unwrap();

    let fetched = repo.get_user(saved.id).await.unwrap().unwrap();
    assert_eq!(fetched.last_login_at, Some(at));
    assert_eq!(fetched.email, saved.email);
    assert_eq!(fetched.password_hash, saved.password_hash);
}

#[tokio::test]
async fn test_delete_user() {
    let repo = repo_over(Arc::new(MemoryStore::new()));
    let saved = user("runner@example.com");
    repo.save_user(&saved).await.unwrap();

    assert!(repo.delete_user(saved.id).await.unwrap());
    assert!(!repo.delete_user(saved.id).await.unwrap());
    assert!(repo.list_users().await.unwrap().is_empty());
}
