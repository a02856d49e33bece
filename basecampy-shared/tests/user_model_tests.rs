/// Integration tests for user token flows
///
/// Skipped unless DATABASE_URL is set.

mod common;

use basecampy_shared::auth::tokens::{generate_temporary_token, hash_token};
use basecampy_shared::models::user::{Avatar, CreateUser, User};
use chrono::{Duration, Utc};

#[tokio::test]
async fn test_identifiers_are_case_insensitive() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let username = common::unique("Mixed");
    let user = User::create(
        &pool,
        CreateUser {
            username: username.clone(),
            email: format!("{}@Example.COM", username),
            full_name: None,
            password_hash: "hash".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(user.username, username.to_lowercase());
    assert!(User::find_by_email(&pool, &format!("{}@example.com", username))
        .await
        .unwrap()
        .is_some());
    assert!(User::exists_by_username_or_email(&pool, &username.to_uppercase(), "nobody@example.com")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_duplicate_email_violates_constraint() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let user = common::create_user(&pool).await;
    let err = User::create(
        &pool,
        CreateUser {
            username: common::unique("other"),
            email: user.email.clone(),
            full_name: None,
            password_hash: "hash".to_string(),
        },
    )
    .await
    .expect_err("duplicate email must fail");

    let constraint = err.as_database_error().and_then(|e| e.constraint().map(str::to_string));
    assert_eq!(constraint.as_deref(), Some("users_email_key"));
}

#[tokio::test]
async fn test_email_verification_is_single_use() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let user = common::create_user(&pool).await;
    let issued = generate_temporary_token();
    User::set_email_verification_token(&pool, user.id, &issued.hash, issued.expires_at)
        .await
        .unwrap();

    let verified = User::verify_email(&pool, &hash_token(&issued.token))
        .await
        .unwrap()
        .expect("token should match");
    assert!(verified.email_verified);
    assert!(verified.email_verification_token_hash.is_none());

    assert!(User::verify_email(&pool, &issued.hash).await.unwrap().is_none());
}

#[tokio::test]
async fn test_expired_reset_token_is_rejected() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let user = common::create_user(&pool).await;
    let issued = generate_temporary_token();
    User::set_forgot_password_token(&pool, user.id, &issued.hash, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();

    assert!(User::reset_password(&pool, &issued.hash, "new-hash")
        .await
        .unwrap()
        .is_none());

    User::set_forgot_password_token(&pool, user.id, &issued.hash, issued.expires_at)
        .await
        .unwrap();
    let reset = User::reset_password(&pool, &issued.hash, "new-hash")
        .await
        .unwrap()
        .expect("fresh token should work");
    assert_eq!(reset.password_hash, "new-hash");
    assert!(reset.forgot_password_token_hash.is_none());
}

#[tokio::test]
async fn test_refresh_token_and_avatar_updates() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let user = common::create_user(&pool).await;
    let digest = hash_token("refresh-token");

    assert!(User::set_refresh_token_hash(&pool, user.id, Some(&digest)).await.unwrap());
    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token_hash.as_deref(), Some(digest.as_str()));

    assert!(User::set_refresh_token_hash(&pool, user.id, None).await.unwrap());
    let cleared = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(cleared.refresh_token_hash.is_none());

    let avatar = Avatar {
        url: "http://localhost:8080/images/a.png".to_string(),
        local_path: "public/images/a.png".to_string(),
    };
    let updated = User::update_avatar(&pool, user.id, &avatar).await.unwrap().unwrap();
    assert_eq!(updated.avatar(), avatar);

    let summaries = User::summaries_by_ids(&pool, &[user.id]).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].avatar_url, avatar.url);
}
