//! Nested writes through one-to-one relations.
//!
//! `User.profile` / `Profile.user` is bidirectional and owned by `Profile`
//! (key `userId`). `User.avatar` is unidirectional (key `avatarId` on `User`).

mod common;

use common::{RecordingDataSource, ctx, record};
use nestlink::{Field, MemoryDataSource, Model, ModelRelation, RelationEngine};
use serde_json::{Value, json};
use std::sync::Arc;

struct Accounts {
    engine: RelationEngine,
    users: Arc<RecordingDataSource>,
    profiles: Arc<RecordingDataSource>,
    images: Arc<RecordingDataSource>,
}

fn accounts(users: Vec<Value>, profiles: Vec<Value>, images: Vec<Value>) -> Accounts {
    let source = |name: &str, rows: Vec<Value>| {
        Arc::new(RecordingDataSource::new(
            MemoryDataSource::new(name).with_records(rows.into_iter().map(record)),
        ))
    };
    let users = source("User", users);
    let profiles = source("Profile", profiles);
    let images = source("Image", images);

    let engine = RelationEngine::builder()
        .model(
            Model::new("User").field(Field::scalar("email", "String")),
            users.clone(),
        )
        .model(
            Model::new("Profile").field(Field::scalar("bio", "String")),
            profiles.clone(),
        )
        .model(
            Model::new("Image").field(Field::scalar("url", "String")),
            images.clone(),
        )
        .relation(ModelRelation::bi_one_to_one("User", "profile", "Profile", "user").owned_by("Profile"))
        .relation(ModelRelation::uni_one_to_one("User", "avatar", "Image"))
        .build()
        .unwrap();

    Accounts {
        engine,
        users,
        profiles,
        images,
    }
}

fn profile_of(accounts: &Accounts, user_id: &str) -> Option<nestlink::Record> {
    accounts
        .profiles
        .inner
        .records()
        .into_iter()
        .find(|p| p.get("userId") == Some(&json!(user_id)))
}

#[test]
fn test_owning_side_holds_key() {
    let accounts = accounts(vec![], vec![], vec![]);
    let bi = &accounts.engine.relations()[0];
    assert_eq!(bi.foreign_key_owner(), Some("Profile"));
    assert_eq!(bi.foreign_key(), Some("userId"));

    let uni = &accounts.engine.relations()[1];
    assert_eq!(uni.foreign_key_owner(), Some("User"));
    assert_eq!(uni.foreign_key(), Some("avatarId"));
}

// ============================================
// Owning side
// ============================================

#[tokio::test]
async fn test_owning_side_connect_is_one_write() {
    let accounts = accounts(vec![json!({"id": "u1"})], vec![], vec![]);
    let profile = accounts
        .engine
        .create(
            "Profile",
            record(json!({"bio": "hi", "user": {"connect": {"id": "u1"}}})),
            ctx(),
        )
        .await
        .unwrap();

    assert_eq!(profile["userId"], json!("u1"));
    assert_eq!(
        accounts.profiles.writes(),
        vec![("create", record(json!({"bio": "hi", "userId": "u1"})))]
    );
    assert!(accounts.users.writes().is_empty());
}

#[tokio::test]
async fn test_owning_side_delete() {
    let accounts = accounts(
        vec![json!({"id": "u1"})],
        vec![json!({"id": "p1", "userId": "u1"})],
        vec![],
    );
    let profile = accounts
        .engine
        .update(
            "Profile",
            record(json!({"id": "p1"})),
            record(json!({"user": {"delete": true}})),
            ctx(),
        )
        .await
        .unwrap();
    assert_eq!(profile["userId"], Value::Null);
    assert!(accounts.users.inner.is_empty());
}

// ============================================
// Referenced side
// ============================================

#[tokio::test]
async fn test_ref_side_create_writes_through_to_owner() {
    let accounts = accounts(vec![], vec![], vec![]);
    let user = accounts
        .engine
        .create(
            "User",
            record(json!({"email": "a@b.c", "profile": {"create": {"bio": "hi"}}})),
            ctx(),
        )
        .await
        .unwrap();

    // the user write carries no key; the profile is created pointing back
    assert_eq!(
        accounts.users.writes(),
        vec![("create", record(json!({"email": "a@b.c"})))]
    );
    let user_id = user["id"].as_str().unwrap();
    let profile = profile_of(&accounts, user_id).unwrap();
    assert_eq!(profile["bio"], json!("hi"));

    let resolved = accounts
        .engine
        .resolve_field("User", "profile", &user, &ctx())
        .await
        .unwrap();
    assert_eq!(resolved, Value::Object(profile.clone()));

    let back = accounts
        .engine
        .resolve_field("Profile", "user", &profile, &ctx())
        .await
        .unwrap();
    assert_eq!(back, Value::Object(user));
}

#[tokio::test]
async fn test_nested_create_cannot_link_back() {
    let accounts = accounts(vec![json!({"id": "u1"})], vec![], vec![]);
    let err = accounts
        .engine
        .create(
            "User",
            record(json!({
                "email": "a@b.c",
                "profile": {"create": {"bio": "hi", "user": {"connect": {"id": "u1"}}}}
            })),
            ctx(),
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(accounts.users.writes().is_empty());
    assert!(accounts.profiles.inner.is_empty());
}

#[tokio::test]
async fn test_ref_side_connect_updates_owner() {
    let accounts = accounts(
        vec![json!({"id": "u1"})],
        vec![json!({"id": "p1"})],
        vec![],
    );
    accounts
        .engine
        .update(
            "User",
            record(json!({"id": "u1"})),
            record(json!({"profile": {"connect": {"id": "p1"}}})),
            ctx(),
        )
        .await
        .unwrap();
    assert_eq!(profile_of(&accounts, "u1").unwrap()["id"], json!("p1"));
}

#[tokio::test]
async fn test_ref_side_disconnect_vs_delete() {
    let accounts = accounts(
        vec![json!({"id": "u1"}), json!({"id": "u2"})],
        vec![
            json!({"id": "p1", "userId": "u1"}),
            json!({"id": "p2", "userId": "u2"}),
        ],
        vec![],
    );

    accounts
        .engine
        .update(
            "User",
            record(json!({"id": "u1"})),
            record(json!({"profile": {"disconnect": true}})),
            ctx(),
        )
        .await
        .unwrap();
    assert!(profile_of(&accounts, "u1").is_none());
    assert_eq!(accounts.profiles.inner.len(), 2);

    accounts
        .engine
        .update(
            "User",
            record(json!({"id": "u2"})),
            record(json!({"profile": {"delete": true}})),
            ctx(),
        )
        .await
        .unwrap();
    assert_eq!(accounts.profiles.inner.len(), 1);

    // u1 has no profile any more
    let err = accounts
        .engine
        .update(
            "User",
            record(json!({"id": "u1"})),
            record(json!({"profile": {"disconnect": true}})),
            ctx(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_ref_side_connect_wins_over_disconnect() {
    let accounts = accounts(
        vec![json!({"id": "u1"})],
        vec![json!({"id": "p1"}), json!({"id": "p2", "userId": "u1"})],
        vec![],
    );
    accounts
        .engine
        .update(
            "User",
            record(json!({"id": "u1"})),
            record(json!({"profile": {"connect": {"id": "p1"}, "disconnect": true}})),
            ctx(),
        )
        .await
        .unwrap();

    let linked: Vec<_> = accounts
        .profiles
        .inner
        .records()
        .into_iter()
        .filter(|p| p.get("userId") == Some(&json!("u1")))
        .map(|p| p["id"].clone())
        .collect();
    // connect ran, disconnect was dropped; uniqueness is left to storage
    assert!(linked.contains(&json!("p1")));
    assert!(linked.contains(&json!("p2")));
}

// ============================================
// Unidirectional
// ============================================

#[tokio::test]
async fn test_uni_create_then_delete() {
    let accounts = accounts(vec![], vec![], vec![]);
    let user = accounts
        .engine
        .create(
            "User",
            record(json!({"email": "a@b.c", "avatar": {"create": {"url": "/a.png"}}})),
            ctx(),
        )
        .await
        .unwrap();

    let image = accounts.images.inner.records().remove(0);
    assert_eq!(user["avatarId"], image["id"]);

    let avatar = accounts
        .engine
        .resolve_field("User", "avatar", &user, &ctx())
        .await
        .unwrap();
    assert_eq!(avatar["url"], json!("/a.png"));

    let user = accounts
        .engine
        .update(
            "User",
            record(json!({"id": user["id"].clone()})),
            record(json!({"avatar": {"delete": true}})),
            ctx(),
        )
        .await
        .unwrap();
    assert_eq!(user["avatarId"], Value::Null);
    assert!(accounts.images.inner.is_empty());
    assert!(accounts.engine.hooks().hook("Image", "user").is_none());
}

#[tokio::test]
async fn test_disconnect_false_is_not_requested() {
    let accounts = accounts(vec![json!({"id": "u1", "avatarId": "i1"})], vec![], vec![json!({"id": "i1"})]);
    let user = accounts
        .engine
        .update(
            "User",
            record(json!({"id": "u1"})),
            record(json!({"avatar": {"disconnect": false}})),
            ctx(),
        )
        .await
        .unwrap();
    assert_eq!(user["avatarId"], json!("i1"));
}
