mod common;

use axum::Router;
use axum::http::StatusCode;
use serde_json::json;

use common::*;
use warbler_api::auth::AppState;

struct Fixture {
    app: Router,
    state: AppState,
    tester: i64,
    u1: i64,
    u2: i64,
    u3: i64,
}

fn fixture() -> Fixture {
    let (app, state) = app();
    let tester = seed_user(&state, "tester", "tester@gmail.com", "apassword");
    let u1 = seed_user(&state, "iamtest1", "test1@gmail.com", "testpassword");
    let u2 = seed_user(&state, "iamtest2", "test2@yahoo.com", "testpassword");
    let u3 = seed_user(&state, "iamtest3", "test3@mail.com", "testpassword");
    seed_user(&state, "iamtest4", "test4@gmail.com", "testpassword");
    Fixture {
        app,
        state,
        tester,
        u1,
        u2,
        u3,
    }
}

/// tester follows iamtest1 and iamtest2; iamtest1 follows tester.
fn create_followers(f: &Fixture) {
    f.state.db.follow(f.tester, f.u1).unwrap();
    f.state.db.follow(f.tester, f.u2).unwrap();
    f.state.db.follow(f.u1, f.tester).unwrap();
}

#[tokio::test]
async fn user_index_lists_everyone() {
    let f = fixture();
    let (status, body) = get(&f.app, "/users", None).await;

    assert_eq!(status, StatusCode::OK);
    let names = usernames(&body);
    for expected in ["tester", "iamtest1", "iamtest2", "iamtest3", "iamtest4"] {
        assert!(names.contains(&expected.to_string()), "missing {expected}");
    }
}

#[tokio::test]
async fn user_search_filters_by_username() {
    let f = fixture();
    let (status, body) = get(&f.app, "/users?q=iam", None).await;

    assert_eq!(status, StatusCode::OK);
    let names = usernames(&body);
    assert_eq!(
        names,
        vec!["iamtest1", "iamtest2", "iamtest3", "iamtest4"]
    );
}

#[tokio::test]
async fn show_user_profile() {
    let f = fixture();
    let (status, body) = get(&f.app, &format!("/users/{}", f.tester), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["username"], "tester");
    assert_eq!(body["account"]["email"], "tester@gmail.com");
}

#[tokio::test]
async fn show_unknown_user_is_404() {
    let f = fixture();
    let (status, _) = get(&f.app, "/users/9999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_stats_reflect_graph() {
    let f = fixture();
    create_followers(&f);

    let (status, body) = get(&f.app, &format!("/users/{}", f.tester), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["messages"], 0);
    assert_eq!(body["stats"]["following"], 2);
    assert_eq!(body["stats"]["followers"], 1);
}

#[tokio::test]
async fn following_view_lists_followed_accounts() {
    let f = fixture();
    create_followers(&f);
    let cookie = session_for(f.tester, "tester");

    let (status, body) = get(
        &f.app,
        &format!("/users/{}/following", f.tester),
        Some(&cookie),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names = usernames(&body);
    assert!(names.contains(&"iamtest1".to_string()));
    assert!(names.contains(&"iamtest2".to_string()));
    assert!(!names.contains(&"iamtest3".to_string()));
}

#[tokio::test]
async fn followers_view_lists_only_followers() {
    let f = fixture();
    create_followers(&f);
    let cookie = session_for(f.tester, "tester");

    let (status, body) = get(
        &f.app,
        &format!("/users/{}/followers", f.tester),
        Some(&cookie),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names = usernames(&body);
    assert_eq!(names, vec!["iamtest1"]);
}

#[tokio::test]
async fn following_view_requires_session() {
    let f = fixture();
    create_followers(&f);

    let (status, body) = get(&f.app, &format!("/users/{}/following", f.tester), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&body), "Access unauthorized");
}

#[tokio::test]
async fn followers_view_requires_session() {
    let f = fixture();
    create_followers(&f);

    let (status, body) = get(&f.app, &format!("/users/{}/followers", f.tester), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&body), "Access unauthorized");
}

#[tokio::test]
async fn follow_and_unfollow_endpoints() {
    let f = fixture();
    let cookie = session_for(f.tester, "tester");

    let (status, body) = post(&f.app, &format!("/users/follow/{}", f.u3), Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["following"], true);
    assert!(f.state.db.is_following(f.tester, f.u3).unwrap());

    // Second follow of the same account violates edge uniqueness
    let (status, _) = post(&f.app, &format!("/users/follow/{}", f.u3), Some(&cookie)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = post(
        &f.app,
        &format!("/users/stop-following/{}", f.u3),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["following"], false);
    assert!(!f.state.db.is_following(f.tester, f.u3).unwrap());
}

#[tokio::test]
async fn follow_unknown_user_is_404() {
    let f = fixture();
    let cookie = session_for(f.tester, "tester");

    let (status, _) = post(&f.app, "/users/follow/9999999", Some(&cookie)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn likes_view_lists_liked_messages() {
    let f = fixture();
    let mid = f.state.db.insert_message(f.u1, "likeable").unwrap();
    f.state.db.toggle_like(f.tester, mid).unwrap();
    let cookie = session_for(f.tester, "tester");

    let (status, body) = get(&f.app, &format!("/users/{}/likes", f.tester), Some(&cookie)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["text"], "likeable");
}

#[tokio::test]
async fn signup_applies_profile_defaults() {
    let (app, state) = app();

    let (status, body) = post_json(
        &app,
        "/signup",
        json!({
            "username": "tester",
            "email": "tester@gmail.com",
            "password": "iamapassword",
        }),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["account"]["username"], "tester");
    assert_eq!(body["account"]["email"], "tester@gmail.com");
    assert_eq!(
        body["account"]["image_url"],
        "/static/images/default-pic.png"
    );
    assert_eq!(
        body["account"]["header_image_url"],
        "/static/images/warbler-hero.jpg"
    );
    assert!(body["account"]["bio"].is_null());
    assert!(body["account"]["location"].is_null());
    assert!(!body["token"].as_str().unwrap().is_empty());

    // The stored credential is a hash, never the plaintext
    let row = state.db.get_user_by_username("tester").unwrap().unwrap();
    assert_ne!(row.password, "iamapassword");
}

#[tokio::test]
async fn signup_rejects_taken_username_and_email() {
    let (app, _state) = app();

    let (status, _) = post_json(
        &app,
        "/signup",
        json!({"username": "tester", "email": "tester@gmail.com", "password": "iamapassword"}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = post_json(
        &app,
        "/signup",
        json!({"username": "tester", "email": "other@gmail.com", "password": "iamapassword"}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post_json(
        &app,
        "/signup",
        json!({"username": "other", "email": "tester@gmail.com", "password": "iamapassword"}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn signup_rejects_empty_password() {
    let (app, state) = app();

    let (status, _) = post_json(
        &app,
        "/signup",
        json!({"username": "tester", "email": "tester@gmail.com", "password": ""}),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    // Nothing reached storage
    assert!(state.db.get_user_by_username("tester").unwrap().is_none());
}

#[tokio::test]
async fn login_succeeds_with_correct_credentials() {
    let f = fixture();

    let (status, body) = post_json(
        &f.app,
        "/login",
        json!({"username": "tester", "password": "apassword"}),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["id"], f.tester);
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn login_failure_does_not_leak_which_field_was_wrong() {
    let f = fixture();

    let (status, wrong_pass) = post_json(
        &f.app,
        "/login",
        json!({"username": "tester", "password": "wrongpassword"}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, wrong_user) = post_json(
        &f.app,
        "/login",
        json!({"username": "badaccountuser", "password": "apassword"}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(wrong_pass, wrong_user);
}

#[tokio::test]
async fn delete_account_cascades_and_clears_session() {
    let f = fixture();
    let cookie = session_for(f.tester, "tester");
    f.state.db.insert_message(f.tester, "to be removed").unwrap();
    create_followers(&f);

    let (status, _) = post(&f.app, "/users/delete", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&f.app, &format!("/users/{}", f.tester), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(f.state.db.user_messages(f.tester).unwrap().is_empty());
    assert!(f.state.db.followers_of(f.u1).unwrap().is_empty());

    // The old session now names a missing account and fails the gate
    let (status, body) = post(&f.app, "/messages/new", Some(&cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&body), "Access unauthorized");
}
