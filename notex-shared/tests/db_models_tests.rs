//! Model tests against a real PostgreSQL
//!
//! Run with: DATABASE_URL=... cargo test -p notex-shared --test db_models_tests -- --ignored

mod common;

use chrono::{Duration, Utc};
use notex_shared::auth::password::hash_password;
use notex_shared::auth::reset_token::generate_reset_token;
use notex_shared::db::pool::health_check;
use notex_shared::db::seed::{ensure_admin, AdminSeed};
use notex_shared::models::note::{CreateNote, Note, UpdateNote};
use notex_shared::models::shared_note::{
    CreateSharedNote, ShareStatus, ShareTransitionError, SharedNote,
};
use notex_shared::models::user::{CreateUser, UpdateUser, User};

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_pool_health_check() {
    let pool = common::setup_pool().await;
    assert!(health_check(&pool).await.is_ok());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_username_is_case_insensitive() {
    let pool = common::setup_pool().await;
    let username = common::unique_username("Case");

    let user = User::create(
        &pool,
        CreateUser {
            name: "Case".to_string(),
            username: username.to_uppercase(),
            password_hash: hash_password("password123").unwrap(),
            profile_picture: None,
            is_admin: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(user.username, username.to_lowercase());

    let found = User::find_by_username(&pool, &username.to_uppercase())
        .await
        .unwrap()
        .expect("lookup should ignore case");
    assert_eq!(found.id, user.id);

    let duplicate = User::create(
        &pool,
        CreateUser {
            name: "Dup".to_string(),
            username: username.to_lowercase(),
            password_hash: hash_password("password123").unwrap(),
            profile_picture: None,
            is_admin: false,
        },
    )
    .await;
    assert!(duplicate.is_err(), "usernames differing only in case must collide");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_admin_cannot_be_banned() {
    let pool = common::setup_pool().await;
    let admin = common::create_user(&pool, "adm", true).await;
    let regular = common::create_user(&pool, "reg", false).await;

    assert!(!User::set_banned(&pool, admin.id, true).await.unwrap());
    assert!(!User::find_by_id(&pool, admin.id).await.unwrap().unwrap().is_banned);

    assert!(User::set_banned(&pool, regular.id, true).await.unwrap());
    assert!(User::find_by_id(&pool, regular.id).await.unwrap().unwrap().is_banned);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_partial_user_update() {
    let pool = common::setup_pool().await;
    let user = common::create_user(&pool, "upd", false).await;

    let updated = User::update(
        &pool,
        user.id,
        UpdateUser {
            default_note_name: Some("Scratch".to_string()),
            profile_picture: Some(Some("data:image/png;base64,AAAA".to_string())),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.default_note_name, "Scratch");
    assert_eq!(updated.name, user.name);
    assert!(updated.profile_picture.is_some());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_reset_token_lifecycle() {
    let pool = common::setup_pool().await;
    let user = common::create_user(&pool, "rst", false).await;

    let issued = generate_reset_token();
    User::set_reset_token(&pool, user.id, &issued.hash, issued.expires_at)
        .await
        .unwrap();

    let found = User::find_by_reset_token(&pool, &issued.hash).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));

    User::reset_password(&pool, user.id, &hash_password("new-password").unwrap())
        .await
        .unwrap();
    assert!(User::find_by_reset_token(&pool, &issued.hash).await.unwrap().is_none());

    // Expired tokens are not found
    let stale = generate_reset_token();
    User::set_reset_token(&pool, user.id, &stale.hash, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();
    assert!(User::find_by_reset_token(&pool, &stale.hash).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_lock_hash_can_be_cleared() {
    let pool = common::setup_pool().await;
    let user = common::create_user(&pool, "lck", false).await;

    let note = Note::create(
        &pool,
        CreateNote {
            author_id: user.id,
            title: "Secret".to_string(),
            content: "hidden".to_string(),
        },
    )
    .await
    .unwrap();

    let locked = Note::update(
        &pool,
        note.id,
        UpdateNote {
            is_locked: Some(true),
            lock_hash: Some(Some(hash_password("pin").unwrap())),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert!(locked.is_locked);
    assert!(locked.verify_lock("pin").unwrap());
    assert!(!locked.verify_lock("PIN").unwrap());

    let unlocked = Note::update(
        &pool,
        note.id,
        UpdateNote {
            is_locked: Some(false),
            lock_hash: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!unlocked.is_locked);
    assert!(unlocked.lock_hash.is_none());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_accept_share_copies_without_mutating_original() {
    let pool = common::setup_pool().await;
    let sender = common::create_user(&pool, "snd", false).await;
    let receiver = common::create_user(&pool, "rcv", false).await;

    let original = Note::create(
        &pool,
        CreateNote {
            author_id: sender.id,
            title: "Recipe".to_string(),
            content: "flour, water".to_string(),
        },
    )
    .await
    .unwrap();

    let share = SharedNote::create(
        &pool,
        CreateSharedNote {
            note_id: original.id,
            sender_id: sender.id,
            receiver_id: receiver.id,
        },
    )
    .await
    .unwrap();
    assert_eq!(share.status, ShareStatus::Pending);

    let pending = SharedNote::list_pending_for_receiver(&pool, receiver.id).await.unwrap();
    assert!(pending.iter().any(|n| n.id == share.id && n.sender.id == sender.id));

    let copy = SharedNote::accept(&pool, share.id, receiver.id).await.unwrap();
    assert_ne!(copy.id, original.id);
    assert_eq!(copy.author_id, receiver.id);
    assert_eq!(copy.title, original.title);
    assert_eq!(copy.content, original.content);
    assert!(!copy.is_locked);

    let original_after = Note::find_by_id(&pool, original.id).await.unwrap().unwrap();
    assert_eq!(original_after.author_id, sender.id);
    assert_eq!(original_after.content, original.content);

    let settled = SharedNote::find_by_id(&pool, share.id).await.unwrap().unwrap();
    assert_eq!(settled.status, ShareStatus::Accepted);

    // A settled share is inert
    assert!(matches!(
        SharedNote::accept(&pool, share.id, receiver.id).await,
        Err(ShareTransitionError::NotPending(ShareStatus::Accepted))
    ));
    assert!(matches!(
        SharedNote::reject(&pool, share.id, receiver.id).await,
        Err(ShareTransitionError::NotPending(ShareStatus::Accepted))
    ));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_reject_share_and_duplicate_pending() {
    let pool = common::setup_pool().await;
    let sender = common::create_user(&pool, "snd", false).await;
    let receiver = common::create_user(&pool, "rcv", false).await;

    let note = Note::create(
        &pool,
        CreateNote {
            author_id: sender.id,
            title: "Plan".to_string(),
            content: String::new(),
        },
    )
    .await
    .unwrap();

    let data = CreateSharedNote {
        note_id: note.id,
        sender_id: sender.id,
        receiver_id: receiver.id,
    };
    let share = SharedNote::create(&pool, data.clone()).await.unwrap();
    assert!(SharedNote::create(&pool, data.clone()).await.is_err());

    assert!(matches!(
        SharedNote::reject(&pool, share.id, sender.id).await,
        Err(ShareTransitionError::NotReceiver)
    ));
    SharedNote::reject(&pool, share.id, receiver.id).await.unwrap();

    // Once settled, the same note can be offered again
    assert!(SharedNote::create(&pool, data).await.is_ok());
    assert_eq!(Note::list_by_author(&pool, receiver.id).await.unwrap().len(), 0);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_ensure_admin_is_idempotent() {
    let pool = common::setup_pool().await;
    let seed = AdminSeed {
        username: common::unique_username("root"),
        password: "changeme".to_string(),
        name: "Administrator".to_string(),
    };

    let created = ensure_admin(&pool, &seed).await.unwrap().expect("first run creates");
    assert!(created.is_admin);

    assert!(ensure_admin(&pool, &seed).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_delete_user_cascades() {
    let pool = common::setup_pool().await;
    let user = common::create_user(&pool, "del", false).await;
    let note = Note::create(
        &pool,
        CreateNote {
            author_id: user.id,
            title: "Gone".to_string(),
            content: String::new(),
        },
    )
    .await
    .unwrap();

    assert!(User::delete(&pool, user.id).await.unwrap());
    assert!(Note::find_by_id(&pool, note.id).await.unwrap().is_none());
}
