//! End-to-end API tests against a real database
//!
//! Requires PostgreSQL at `DATABASE_URL`; run with `cargo test -- --ignored`.

mod common;

use axum::http::StatusCode;
use common::{unique_username, TestContext, TEST_PASSWORD};
use serde_json::json;

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_signup_is_case_insensitive() {
    let mut ctx = TestContext::new().await.unwrap();
    let username = unique_username("Case");

    let (status, body) = ctx
        .send(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({ "name": "Case", "username": username, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], username.to_lowercase());
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["access_token"].is_string());

    let (status, _) = ctx
        .send(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({ "name": "Other", "username": username.to_uppercase(), "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": username.to_uppercase(), "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["refresh_token"].is_string());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_ban_blocks_login_and_existing_tokens() {
    let mut ctx = TestContext::new().await.unwrap();
    let (admin, admin_token) = ctx.user("admin", true).await.unwrap();
    let (user, user_token) = ctx.user("target", false).await.unwrap();

    let (status, _) = ctx
        .send(
            "POST",
            "/api/admin/ban",
            Some(&admin_token),
            Some(json!({ "user_id": user.id, "ban": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": user.username, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.send("GET", "/api/notes", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admins are never bannable
    let (status, _) = ctx
        .send(
            "POST",
            "/api/admin/ban",
            Some(&admin_token),
            Some(json!({ "user_id": admin.id, "ban": true })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_admin_routes_reject_regular_users() {
    let mut ctx = TestContext::new().await.unwrap();
    let (_, token) = ctx.user("regular", false).await.unwrap();

    let (status, _) = ctx.send("GET", "/api/admin/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_share_accept_creates_independent_copy() {
    let mut ctx = TestContext::new().await.unwrap();
    let (_, sender_token) = ctx.user("sender", false).await.unwrap();
    let (receiver, receiver_token) = ctx.user("receiver", false).await.unwrap();

    let (status, body) = ctx
        .send(
            "POST",
            "/api/notes",
            Some(&sender_token),
            Some(json!({ "title": "Groceries", "content": "milk" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let note_id = body["note"]["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(
            "POST",
            &format!("/api/notes/{}/share", note_id),
            Some(&sender_token),
            Some(json!({ "receiver_id": receiver.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx
        .send("GET", "/api/notifications", Some(&receiver_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    let share_id = notifications[0]["id"].as_str().unwrap().to_string();

    // The sender cannot act on the receiver's notification
    let (status, _) = ctx
        .send(
            "POST",
            &format!("/api/notifications/{}", share_id),
            Some(&sender_token),
            Some(json!({ "action": "accept" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(
            "POST",
            &format!("/api/notifications/{}", share_id),
            Some(&receiver_token),
            Some(json!({ "action": "accept" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.send("GET", "/api/notes", Some(&receiver_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let notes = body["notes"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["title"], "Groceries");
    assert_ne!(notes[0]["id"], note_id.as_str());

    // Editing the copy leaves the original alone
    let copy_id = notes[0]["id"].as_str().unwrap().to_string();
    let (status, _) = ctx
        .send(
            "PUT",
            &format!("/api/notes/{}", copy_id),
            Some(&receiver_token),
            Some(json!({ "content": "eggs" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx
        .send("GET", &format!("/api/notes/{}", note_id), Some(&sender_token), None)
        .await;
    assert_eq!(body["note"]["content"], "milk");

    // Accepted shares cannot be acted on again
    let (status, _) = ctx
        .send(
            "POST",
            &format!("/api/notifications/{}", share_id),
            Some(&receiver_token),
            Some(json!({ "action": "reject" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_locked_note_hides_content_until_unlocked() {
    let mut ctx = TestContext::new().await.unwrap();
    let (_, token) = ctx.user("locker", false).await.unwrap();
    let (_, stranger_token) = ctx.user("stranger", false).await.unwrap();

    let (_, body) = ctx
        .send(
            "POST",
            "/api/notes",
            Some(&token),
            Some(json!({ "title": "Diary", "content": "secret" })),
        )
        .await;
    let note_id = body["note"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/notes/{}", note_id);

    let (status, body) = ctx
        .send("PUT", &uri, Some(&token), Some(json!({ "is_locked": true, "password": "hunter2" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"]["is_locked"], true);
    assert!(body["note"]["content"].is_null());

    let unlock = format!("{}/unlock", uri);
    let (status, _) = ctx
        .send("POST", &unlock, Some(&token), Some(json!({ "password": "wrong" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = ctx
        .send("POST", &unlock, Some(&token), Some(json!({ "password": "hunter2" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"]["content"], "secret");

    // Content edits on a locked note need the current password
    let (status, _) = ctx
        .send("PUT", &uri, Some(&token), Some(json!({ "content": "changed" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Other users cannot even see that the note exists
    let (status, _) = ctx.send("GET", &uri, Some(&stranger_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_admin_reset_token_flow() {
    let mut ctx = TestContext::new().await.unwrap();
    let (_, admin_token) = ctx.user("resetadmin", true).await.unwrap();
    let (user, _) = ctx.user("forgetful", false).await.unwrap();

    let (status, body) = ctx
        .send(
            "POST",
            &format!("/api/admin/users/{}/reset-token", user.id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let reset_token = body["reset_token"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(
            "POST",
            "/api/auth/reset-password",
            None,
            Some(json!({ "reset_token": reset_token, "new_password": "brand-new-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Tokens are single use
    let (status, _) = ctx
        .send(
            "POST",
            "/api/auth/reset-password",
            None,
            Some(json!({ "reset_token": reset_token, "new_password": "another-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": user.username, "password": "brand-new-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_search_excludes_self_and_banned() {
    let mut ctx = TestContext::new().await.unwrap();
    let (me, token) = ctx.user("searcher", false).await.unwrap();
    ctx.user("searchee", false).await.unwrap();

    let (status, body) = ctx
        .send("GET", "/api/search/users?q=search", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|u| u["id"].as_str())
        .collect();
    assert!(!ids.contains(&me.id.to_string().as_str()));
    assert!(!ids.is_empty());
    assert!(ids.len() <= 10);

    let (status, body) = ctx.send("GET", "/api/search/users?q=", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["users"].as_array().unwrap().is_empty());
}
