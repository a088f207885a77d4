use axum_extra::extract::cookie::CookieJar;
use service_core::{
    axum::{extract::State, Json},
    error::AppError,
};

use crate::{
    dtos::{
        auth::{AuthResponse, LoginRequest, RefreshResponse, VerifyResponse},
        MessageResponse,
    },
    handlers::cookies::{auth_cookie_values, clear_auth_cookies, reject, AuthCookies},
    middleware::Fingerprint,
    services::Verification,
    utils::ValidatedJson,
    AppState,
};

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; access and refresh cookies set", body = AuthResponse),
        (status = 400, description = "Invalid body or incorrect email or password", body = crate::dtos::ErrorResponse),
        (status = 429, description = "Too many login attempts", body = crate::dtos::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    fingerprint: Fingerprint,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let outcome = state.auth_service.login(req, fingerprint.as_str()).await?;

    let jar = AuthCookies::from_config(&state.config).set(jar, &outcome.tokens);
    Ok((
        jar,
        Json(AuthResponse {
            message: "Logged in".to_string(),
            refresh_token_expire_in: outcome.tokens.refresh_expires_at.timestamp_millis(),
            access_token_expire_in: outcome.tokens.access_expires_at.timestamp_millis(),
            user: outcome.user,
        }),
    ))
}

/// Rotate the refresh cookie and mint a new access cookie
#[utoipa::path(
    post,
    path = "/api/auth/refresh-tokens",
    responses(
        (status = 200, description = "Session rotated; cookies replaced", body = RefreshResponse),
        (status = 401, description = "Session missing, expired or already rotated; cookies cleared", body = crate::dtos::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh_tokens(
    State(state): State<AppState>,
    jar: CookieJar,
    fingerprint: Fingerprint,
) -> Result<(CookieJar, Json<RefreshResponse>), (CookieJar, AppError)> {
    let (_, refresh_token) = auth_cookie_values(&jar);

    let refreshed = match state
        .auth_service
        .refresh(refresh_token.as_deref(), fingerprint.as_str())
        .await
    {
        Ok(refreshed) => refreshed,
        Err(e) => return Err(reject(jar, e)),
    };

    let jar = AuthCookies::from_config(&state.config).set(jar, &refreshed.tokens);
    Ok((
        jar,
        Json(RefreshResponse {
            message: "Token was successfully refreshed".to_string(),
            refresh_token_expire_in: refreshed.tokens.refresh_expires_at.timestamp_millis(),
            access_token_expire_in: refreshed.tokens.access_expires_at.timestamp_millis(),
        }),
    ))
}

/// Check the caller's cookies, rotating the session when the access token is unusable
#[utoipa::path(
    post,
    path = "/api/auth",
    responses(
        (status = 200, description = "User was authenticated; expiries present when the session was rotated", body = VerifyResponse),
        (status = 400, description = "No tokens provided", body = crate::dtos::ErrorResponse),
        (status = 401, description = "Session invalid; cookies cleared", body = crate::dtos::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify(
    State(state): State<AppState>,
    jar: CookieJar,
    fingerprint: Fingerprint,
) -> Result<(CookieJar, Json<VerifyResponse>), (CookieJar, AppError)> {
    let (access_token, refresh_token) = auth_cookie_values(&jar);

    let verification = match state
        .auth_service
        .verify(
            access_token.as_deref(),
            refresh_token.as_deref(),
            fingerprint.as_str(),
        )
        .await
    {
        Ok(verification) => verification,
        Err(e) => return Err(reject(jar, e)),
    };

    let message = "User was authenticated".to_string();
    match verification {
        Verification::Authenticated(user) => Ok((
            jar,
            Json(VerifyResponse {
                message,
                user,
                refresh_token_expire_in: None,
                access_token_expire_in: None,
            }),
        )),
        Verification::Refreshed(refreshed) => {
            let jar = AuthCookies::from_config(&state.config).set(jar, &refreshed.tokens);
            Ok((
                jar,
                Json(VerifyResponse {
                    message,
                    user: refreshed.user,
                    refresh_token_expire_in: Some(
                        refreshed.tokens.refresh_expires_at.timestamp_millis(),
                    ),
                    access_token_expire_in: Some(
                        refreshed.tokens.access_expires_at.timestamp_millis(),
                    ),
                }),
            ))
        }
    }
}

/// Revoke the current session and clear both cookies
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 500, description = "Internal server error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    let (_, refresh_token) = auth_cookie_values(&jar);
    state.auth_service.logout(refresh_token.as_deref()).await?;

    Ok((
        clear_auth_cookies(jar),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}
