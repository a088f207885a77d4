pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AuthConfig, Environment, SwaggerMode};
use crate::services::{AuthService, CredentialStore, JwtService, SessionRepository, SessionStore};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::registration::signup,
        handlers::auth::session::login,
        handlers::auth::session::refresh_tokens,
        handlers::auth::session::verify,
        handlers::auth::session::logout,
        handlers::user::get_me,
    ),
    components(
        schemas(
            dtos::auth::SignupRequest,
            dtos::auth::LoginRequest,
            dtos::auth::AuthResponse,
            dtos::auth::RefreshResponse,
            dtos::auth::VerifyResponse,
            dtos::MessageResponse,
            dtos::ErrorResponse,
            models::PublicUser,
        )
    ),
    tags(
        (name = "Authentication", description = "Signup, login and cookie session lifecycle"),
        (name = "User", description = "Authenticated user profile"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub auth_service: AuthService,
    pub login_rate_limiter: IpRateLimiter,
    pub signup_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the coordinator and rate limiters over the given stores.
    pub fn new(
        config: AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Result<Self, AppError> {
        let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;
        let session_store = SessionStore::new(sessions, config.session.clone());
        let auth_service = AuthService::new(
            credentials,
            session_store,
            jwt,
            config.users.default_role_id,
        );

        let limits = &config.rate_limit;
        let login_rate_limiter =
            create_ip_rate_limiter(limits.login_attempts, limits.login_window_seconds);
        let signup_rate_limiter =
            create_ip_rate_limiter(limits.signup_attempts, limits.signup_window_seconds);
        let ip_rate_limiter =
            create_ip_rate_limiter(limits.global_ip_limit, limits.global_ip_window_seconds);

        Ok(Self {
            config,
            auth_service,
            login_rate_limiter,
            signup_rate_limiter,
            ip_rate_limiter,
        })
    }
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let login_route = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let signup_route = Router::new()
        .route("/api/auth/signup", post(handlers::auth::signup))
        .layer(from_fn_with_state(
            state.signup_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let private_routes = Router::new()
        .route("/private/users/me", get(handlers::user::get_me))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::access_cookie_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    let swagger_enabled = state.config.environment == Environment::Dev
        || state.config.swagger.enabled == SwaggerMode::Public;

    if swagger_enabled {
        app = app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let app = app
        .merge(login_route)
        .merge(signup_route)
        .route("/api/auth", post(handlers::auth::verify))
        .route("/api/auth/refresh-tokens", post(handlers::auth::refresh_tokens))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .merge(private_routes)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn(middleware::metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config));

    Ok(app)
}

/// CORS for the browser client. Cookies need credentials, which rules out `*`.
fn cors_layer(config: &AuthConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            if origin == "*" {
                tracing::warn!("Ignoring wildcard CORS origin; credentials require explicit origins");
                return None;
            }
            origin
                .parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}", origin, e))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Store unreachable", body = dtos::ErrorResponse)
    ),
    tag = "Observability"
)]
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.auth_service.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
