use chrono::Utc;
use culinary_cms::models::{
    Article, ArticleStatus, ArticleSummary, Category, CreateArticleRequest, Role, UpdateArticleRequest,
    User, UserProfile,
};
use serde_json::json;
use uuid::Uuid;

#[test]
fn test_enums_serialize_lowercase() {
    assert_eq!(json!(ArticleStatus::Published), json!("published"));
    assert_eq!(json!(Role::Editor), json!("editor"));

    let status: ArticleStatus = serde_json::from_value(json!("archived")).unwrap();
    assert_eq!(status, ArticleStatus::Archived);
    assert_eq!(status.as_str(), "archived");

    assert!(serde_json::from_value::<ArticleStatus>(json!("Published")).is_err());
    assert!(serde_json::from_value::<Role>(json!("owner")).is_err());
}

#[test]
fn test_defaults() {
    assert_eq!(ArticleStatus::default(), ArticleStatus::Draft);
    assert_eq!(Role::default(), Role::Author);
}

#[test]
fn test_role_capabilities() {
    assert!(Role::Admin.can_moderate());
    assert!(Role::Admin.can_manage_users());
    assert!(Role::Editor.can_moderate());
    assert!(Role::Editor.can_manage_categories());
    assert!(!Role::Editor.can_manage_users());
    assert!(!Role::Author.can_moderate());
    assert!(!Role::Author.can_manage_categories());
}

#[test]
fn test_article_tolerates_pruned_fields() {
    // The database drops empty lists and null values; counters appear on first use.
    let stored = json!({
        "id": Uuid::new_v4(),
        "title": "Gazpacho",
        "slug": "gazpacho",
        "body": "Cold tomato soup.",
        "category_id": Uuid::new_v4(),
        "author_id": Uuid::new_v4(),
        "reading_time": 1,
        "created_at": Utc::now(),
        "updated_at": Utc::now()
    });

    let article: Article = serde_json::from_value(stored).unwrap();
    assert!(article.tags.is_empty());
    assert_eq!(article.status, ArticleStatus::Draft);
    assert_eq!(article.views, 0);
    assert_eq!(article.likes, 0);
    assert!(!article.featured);
    assert!(article.excerpt.is_empty());
    assert!(article.cover_image_url.is_none());
    assert!(article.published_at.is_none());
    assert!(!article.is_published());
}

#[test]
fn test_summary_has_no_body() {
    let article = Article {
        id: Uuid::new_v4(),
        title: "Mole".to_string(),
        body: "A very long recipe".to_string(),
        views: 12,
        ..Default::default()
    };

    let summary = ArticleSummary::from(&article);
    assert_eq!(summary.id, article.id);
    assert_eq!(summary.views, 12);

    let value = serde_json::to_value(&summary).unwrap();
    assert!(value.get("body").is_none());
    assert_eq!(value["title"], "Mole");
}

#[test]
fn test_user_profile_hides_password_hash() {
    let user = User {
        id: Uuid::new_v4(),
        email: "chef@example.com".to_string(),
        name: "Chef".to_string(),
        password_hash: "$2b$04$secret".to_string(),
        role: Role::Admin,
        is_active: true,
        ..Default::default()
    };

    let value = serde_json::to_value(UserProfile::from(&user)).unwrap();
    assert!(value.get("password_hash").is_none());
    assert_eq!(value["role"], "admin");
    assert_eq!(value["email"], "chef@example.com");
}

#[test]
fn test_user_is_active_by_default() {
    let stored = json!({
        "id": Uuid::new_v4(),
        "email": "imported@example.com",
        "name": "Imported",
        "password_hash": "x",
        "created_at": Utc::now(),
        "updated_at": Utc::now()
    });

    let user: User = serde_json::from_value(stored).unwrap();
    assert!(user.is_active);
    assert_eq!(user.role, Role::Author);
    assert!(user.last_login_at.is_none());
}

#[test]
fn test_create_article_request_minimal_payload() {
    let request: CreateArticleRequest = serde_json::from_value(json!({
        "title": "Ceviche",
        "body": "Lime, fish, chili.",
        "category_id": Uuid::new_v4()
    }))
    .unwrap();

    assert!(request.tags.is_empty());
    assert!(request.status.is_none());
    assert!(request.slug.is_none());
    assert!(!request.featured);

    let missing_category = serde_json::from_value::<CreateArticleRequest>(json!({
        "title": "Ceviche",
        "body": "Lime, fish, chili."
    }));
    assert!(missing_category.is_err());
}

#[test]
fn test_update_request_distinguishes_absent_fields() {
    let request: UpdateArticleRequest =
        serde_json::from_value(json!({ "featured": false, "excerpt": "" })).unwrap();

    assert_eq!(request.featured, Some(false));
    assert_eq!(request.excerpt.as_deref(), Some(""));
    assert!(request.title.is_none());
    assert!(request.tags.is_none());
}

#[test]
fn test_category_count_defaults_to_zero() {
    let category: Category = serde_json::from_value(json!({
        "id": Uuid::new_v4(),
        "name": "Tapas",
        "slug": "tapas",
        "description": null,
        "color": "#E4572E",
        "icon": null,
        "created_at": Utc::now(),
        "updated_at": Utc::now()
    }))
    .unwrap();

    assert_eq!(category.article_count, 0);
}
