#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]

//! Store behavior against a live PostgreSQL instance.
//!
//! These are gated behind `--ignored` because they need a real database:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/atelier_test cargo test -- --ignored
//! ```
//!
//! Each test uses unique titles so runs do not collide, and deletes what it
//! created.

use atelier_daemon::{builtin_content_types, db, ContentStore};
use serde_json::{json, Map, Value};
use uuid::Uuid;

async fn connect_store() -> ContentStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = db::connect(&url, 4).await.expect("connect");
    db::ensure_schema(&pool, &builtin_content_types())
        .await
        .expect("schema");
    ContentStore::new(pool, builtin_content_types())
}

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object payload")
}

fn unique_title(stem: &str) -> String {
    format!("{stem} {}", Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL (set DATABASE_URL)"]
async fn test_duplicate_titles_get_suffixed_slugs() {
    let store = connect_store().await;
    let title = unique_title("Oak Chair");

    let first = store
        .create("products", &payload(json!({ "title": title, "price": 10.0 })))
        .await
        .expect("first create");
    let second = store
        .create("products", &payload(json!({ "title": title, "price": 12.0 })))
        .await
        .expect("second create");

    let base = first.slug.clone().expect("first slug");
    assert_eq!(second.slug.as_deref(), Some(format!("{base}-1").as_str()));

    // A record probing against its own slug keeps it.
    let config = store.registry().get("products").expect("config").clone();
    let kept = store
        .ensure_unique_slug(&config, &base, Some(first.id))
        .await
        .expect("probe");
    assert_eq!(kept, base);

    for id in [first.id, second.id] {
        assert!(store.delete("products", id).await.expect("cleanup"));
    }
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL (set DATABASE_URL)"]
async fn test_update_on_missing_id_is_a_noop() {
    let store = connect_store().await;

    let result = store
        .update(
            "projects",
            i64::MAX,
            &payload(json!({ "title": "Ghost Record" })),
        )
        .await
        .expect("update");
    assert!(result.is_none());
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL (set DATABASE_URL)"]
async fn test_delete_is_idempotent() {
    let store = connect_store().await;

    let record = store
        .create(
            "articles",
            &payload(json!({ "title": unique_title("Disposable") })),
        )
        .await
        .expect("create");

    assert!(store.delete("articles", record.id).await.expect("first delete"));
    assert!(!store
        .delete("articles", record.id)
        .await
        .expect("second delete"));
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL (set DATABASE_URL)"]
async fn test_publish_stamps_and_clears_published_at() {
    let store = connect_store().await;

    let record = store
        .create(
            "articles",
            &payload(json!({ "title": unique_title("Lifecycle"), "status": "draft" })),
        )
        .await
        .expect("create");
    assert!(record.published_at.is_none());

    let published = store
        .update(
            "articles",
            record.id,
            &payload(json!({ "status": "published" })),
        )
        .await
        .expect("publish")
        .expect("record exists");
    let first_stamp = published.published_at.expect("stamped on publish");

    let unpublished = store
        .update("articles", record.id, &payload(json!({ "status": "draft" })))
        .await
        .expect("unpublish")
        .expect("record exists");
    assert!(unpublished.published_at.is_none());

    let republished = store
        .update(
            "articles",
            record.id,
            &payload(json!({ "status": "published" })),
        )
        .await
        .expect("republish")
        .expect("record exists");
    let second_stamp = republished.published_at.expect("stamped again");
    assert!(second_stamp >= first_stamp);

    assert!(store.delete("articles", record.id).await.expect("cleanup"));
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL (set DATABASE_URL)"]
async fn test_blank_slug_update_keeps_existing_slug() {
    let store = connect_store().await;

    let record = store
        .create(
            "projects",
            &payload(json!({ "title": unique_title("Keeps Slug"), "excerpt": "before" })),
        )
        .await
        .expect("create");
    let slug = record.slug.clone().expect("slug derived");

    let updated = store
        .update(
            "projects",
            record.id,
            &payload(json!({ "excerpt": "after", "slug": "" })),
        )
        .await
        .expect("update")
        .expect("record exists");
    assert_eq!(updated.slug.as_deref(), Some(slug.as_str()));

    assert!(store.delete("projects", record.id).await.expect("cleanup"));
}
