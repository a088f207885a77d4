mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{test_config, TestApp, USER_AGENT};

#[tokio::test]
async fn test_refresh_rotates_and_is_single_use() {
    let app = TestApp::spawn();
    let signup = app.signup("ada@example.com", "secret1").await;
    let original_refresh = signup.cookie("refreshToken").unwrap();

    let first = app
        .post_cookies("/api/auth/refresh-tokens", Some(&signup.cookie_header()))
        .await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["message"], "Token was successfully refreshed");
    assert!(first.body["refreshTokenExpireIn"].as_i64().is_some());
    assert!(first.body["accessTokenExpireIn"].as_i64().is_some());
    let rotated = first.cookie("refreshToken").unwrap();
    assert_ne!(rotated, original_refresh);

    let replay = app
        .post_cookies("/api/auth/refresh-tokens", Some(&signup.cookie_header()))
        .await;

    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    assert_eq!(replay.body["error"], "User wasn't authenticated");
    assert!(replay.clears("accessToken"));
    assert!(replay.clears("refreshToken"));

    // The rotated token still works.
    let next = app
        .post_cookies(
            "/api/auth/refresh-tokens",
            Some(&format!("refreshToken={}", rotated)),
        )
        .await;
    assert_eq!(next.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let app = TestApp::spawn();

    let res = app.post_cookies("/api/auth/refresh-tokens", None).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "User wasn't authenticated");
}

#[tokio::test]
async fn test_refresh_with_expired_session_is_rejected() {
    let app = TestApp::spawn();
    let signup = app.signup("ada@example.com", "secret1").await;
    let refresh = signup.cookie("refreshToken").unwrap();
    app.store
        .set_session_expiry(&refresh, Utc::now() - Duration::seconds(1));

    let res = app
        .post_cookies("/api/auth/refresh-tokens", Some(&signup.cookie_header()))
        .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.clears("refreshToken"));
    assert_eq!(app.store.session_count(), 0);
}

#[tokio::test]
async fn test_refresh_from_another_client_revokes_session() {
    let app = TestApp::spawn();
    let signup = app.signup("ada@example.com", "secret1").await;

    let res = app
        .post_cookies_as(
            "/api/auth/refresh-tokens",
            Some(&signup.cookie_header()),
            "stolen-cookie-client/2.0",
        )
        .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "User wasn't authenticated");
    assert!(res.clears("refreshToken"));
    assert_eq!(app.store.session_count(), 0);
}

#[tokio::test]
async fn test_refresh_with_different_accept_headers_keeps_session() {
    let app = TestApp::spawn();
    let signup = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signup")
                .header(header::USER_AGENT, USER_AGENT)
                .header(header::ACCEPT, "application/json")
                .header(header::ACCEPT_ENCODING, "gzip")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "firstName": "Ada",
                        "surname": "Lovelace",
                        "email": "ada@example.com",
                        "password": "secret1",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(signup.status, StatusCode::OK);

    let res = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh-tokens")
                .header(header::USER_AGENT, USER_AGENT)
                .header(header::ACCEPT, "*/*")
                .header(header::ACCEPT_ENCODING, "gzip, deflate, br")
                .header(header::COOKIE, signup.cookie_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.cookie("refreshToken").is_some());
    assert_eq!(app.store.session_count(), 1);
}

#[tokio::test]
async fn test_refresh_from_another_client_allowed_when_unbound() {
    let mut config = test_config();
    config.session.bind_fingerprint = false;
    let app = TestApp::with_config(config);
    let signup = app.signup("ada@example.com", "secret1").await;

    let res = app
        .post_cookies_as(
            "/api/auth/refresh-tokens",
            Some(&signup.cookie_header()),
            "another-browser/1.0",
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_without_tokens() {
    let app = TestApp::spawn();

    let res = app.post_cookies("/api/auth", None).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "No tokens provided");
}

#[tokio::test]
async fn test_verify_with_valid_access_token() {
    let app = TestApp::spawn();
    let signup = app.signup("ada@example.com", "secret1").await;

    let res = app
        .post_cookies("/api/auth", Some(&signup.cookie_header()))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "User was authenticated");
    assert_eq!(res.body["user"]["email"], "ada@example.com");
    assert!(res.body.get("refreshTokenExpireIn").is_none());
    assert!(res.set_cookies.is_empty());
    assert_eq!(
        app.store.refresh_tokens_of(signup.body["user"]["id"].as_i64().unwrap()),
        vec![signup.cookie("refreshToken").unwrap()]
    );
}

#[tokio::test]
async fn test_verify_with_expired_access_token_falls_back_to_refresh() {
    let app = TestApp::spawn();
    let signup = app.signup("ada@example.com", "secret1").await;
    let user_id = signup.body["user"]["id"].as_i64().unwrap();
    let stale = app
        .state
        .auth_service
        .jwt()
        .issue_access_token_at(user_id, Utc::now() - Duration::minutes(16))
        .unwrap();

    let cookies = format!(
        "accessToken={}; refreshToken={}",
        stale.token,
        signup.cookie("refreshToken").unwrap()
    );
    let res = app.post_cookies("/api/auth", Some(&cookies)).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "User was authenticated");
    assert_eq!(res.body["user"]["id"], user_id);
    assert!(res.body["accessTokenExpireIn"].as_i64().is_some());
    assert_ne!(res.cookie("refreshToken"), signup.cookie("refreshToken"));
    assert_ne!(res.cookie("accessToken").unwrap(), stale.token);
}

#[tokio::test]
async fn test_verify_with_only_refresh_cookie_rotates() {
    let app = TestApp::spawn();
    let signup = app.signup("ada@example.com", "secret1").await;

    let cookies = format!("refreshToken={}", signup.cookie("refreshToken").unwrap());
    let res = app.post_cookies("/api/auth", Some(&cookies)).await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.cookie("accessToken").is_some());
}

#[tokio::test]
async fn test_verify_with_forged_access_and_unknown_refresh() {
    let app = TestApp::spawn();

    let res = app
        .post_cookies(
            "/api/auth",
            Some("accessToken=forged.token.value; refreshToken=deadbeef"),
        )
        .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.clears("accessToken"));
    assert!(res.clears("refreshToken"));
}

#[tokio::test]
async fn test_logout_revokes_session_and_clears_cookies() {
    let app = TestApp::spawn();
    let signup = app.signup("ada@example.com", "secret1").await;

    let res = app
        .post_cookies("/api/auth/logout", Some(&signup.cookie_header()))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Logged out");
    assert!(res.clears("accessToken"));
    assert!(res.clears("refreshToken"));
    assert_eq!(app.store.session_count(), 0);

    let refresh = app
        .post_cookies("/api/auth/refresh-tokens", Some(&signup.cookie_header()))
        .await;
    assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_private_route_requires_access_cookie() {
    let app = TestApp::spawn();
    let signup = app.signup("ada@example.com", "secret1").await;

    let anonymous = app.get("/private/users/me", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let me = app
        .get("/private/users/me", Some(&signup.cookie_header()))
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["email"], "ada@example.com");
    assert!(me.body.get("password").is_none());
}
