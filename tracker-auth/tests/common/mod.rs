//! Test harness for tracker-auth integration tests.
//!
//! Drives the real router over an in-memory store; no database required.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use secrecy::Secret;
use serde_json::Value;
use service_core::config::Config;
use std::sync::Arc;
use tower::util::ServiceExt;
use tracker_auth::{
    build_router,
    config::{
        AuthConfig, CookieConfig, DatabaseConfig, Environment, JwtConfig, ObservabilityConfig,
        RateLimitConfig, SecurityConfig, SessionConfig, SwaggerConfig, SwaggerMode, UserDefaults,
    },
    services::InMemoryStore,
    AppState,
};

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const USER_AGENT: &str = "tracker-tests/1.0";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: Config::default(),
        environment: Environment::Dev,
        service_name: "tracker-auth".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        observability: ObservabilityConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/tracker_test".to_string(),
            max_connections: 5,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: Secret::new(TEST_SECRET.to_string()),
            access_token_expiry_minutes: 15,
        },
        session: SessionConfig::default(),
        cookies: CookieConfig { secure: false },
        users: UserDefaults { default_role_id: 1 },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Public,
        },
        rate_limit: RateLimitConfig {
            login_attempts: 1000,
            login_window_seconds: 60,
            signup_attempts: 1000,
            signup_window_seconds: 60,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(config, store.clone(), store.clone())
            .expect("Failed to build app state");
        let router = build_router(state.clone()).expect("Failed to build router");
        Self {
            router,
            state,
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");

        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            set_cookies,
            body,
        }
    }

    /// POST a JSON body with an optional `Cookie` header.
    pub async fn post_json(&self, uri: &str, body: Value, cookies: Option<&str>) -> TestResponse {
        let mut builder = request_builder("POST", uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// POST with no body, carrying only cookies.
    pub async fn post_cookies(&self, uri: &str, cookies: Option<&str>) -> TestResponse {
        self.post_cookies_as(uri, cookies, USER_AGENT).await
    }

    pub async fn post_cookies_as(
        &self,
        uri: &str,
        cookies: Option<&str>,
        user_agent: &str,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::USER_AGENT, user_agent);
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn get(&self, uri: &str, cookies: Option<&str>) -> TestResponse {
        let mut builder = request_builder("GET", uri);
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn signup(&self, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/auth/signup",
            serde_json::json!({
                "firstName": "Ada",
                "surname": "Lovelace",
                "email": email,
                "password": password,
            }),
            None,
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": password }),
            None,
        )
        .await
    }
}

fn request_builder(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::USER_AGENT, USER_AGENT)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookies: Vec<String>,
    pub body: Value,
}

impl TestResponse {
    /// Value of a cookie set by this response, ignoring removals.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookie_line(name)
            .map(cookie_value)
            .filter(|value| !value.is_empty())
    }

    /// Whether this response expires the named cookie.
    pub fn clears(&self, name: &str) -> bool {
        self.set_cookie_line(name)
            .map(|line| cookie_value(line).is_empty() && line.contains("Max-Age=0"))
            .unwrap_or(false)
    }

    pub fn set_cookie_line(&self, name: &str) -> Option<&str> {
        let prefix = format!("{}=", name);
        self.set_cookies
            .iter()
            .map(String::as_str)
            .find(|line| line.starts_with(&prefix))
    }

    /// `Cookie` request header carrying both credentials from this response.
    pub fn cookie_header(&self) -> String {
        format!(
            "accessToken={}; refreshToken={}",
            self.cookie("accessToken").unwrap_or_default(),
            self.cookie("refreshToken").unwrap_or_default()
        )
    }
}

fn cookie_value(line: &str) -> String {
    line.split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value.trim().to_string())
        .unwrap_or_default()
}
