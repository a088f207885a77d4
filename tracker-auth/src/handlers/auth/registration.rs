use axum_extra::extract::cookie::CookieJar;
use service_core::{
    axum::{extract::State, Json},
    error::AppError,
};

use crate::{
    dtos::auth::{AuthResponse, SignupRequest},
    handlers::cookies::AuthCookies,
    middleware::Fingerprint,
    utils::ValidatedJson,
    AppState,
};

/// Create an account and open its first session
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Signed up; access and refresh cookies set", body = AuthResponse),
        (status = 400, description = "Invalid body or email already registered", body = crate::dtos::ErrorResponse),
        (status = 429, description = "Too many signup attempts", body = crate::dtos::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    fingerprint: Fingerprint,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let outcome = state.auth_service.signup(req, fingerprint.as_str()).await?;

    let jar = AuthCookies::from_config(&state.config).set(jar, &outcome.tokens);
    Ok((
        jar,
        Json(AuthResponse {
            message: "Signed Up".to_string(),
            refresh_token_expire_in: outcome.tokens.refresh_expires_at.timestamp_millis(),
            access_token_expire_in: outcome.tokens.access_expires_at.timestamp_millis(),
            user: outcome.user,
        }),
    ))
}
