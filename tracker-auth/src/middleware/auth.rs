use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::{
    handlers::cookies::ACCESS_TOKEN_COOKIE,
    services::{error::NOT_AUTHENTICATED, AccessTokenClaims},
    AppState,
};

/// Guard for `/private` routes: requires a valid `accessToken` cookie.
///
/// Unlike the verify endpoint this never falls back to the refresh token;
/// clients call `POST /api/auth` to rotate and then retry.
pub async fn access_cookie_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(req.headers());

    let claims = jar
        .get(ACCESS_TOKEN_COOKIE)
        .and_then(|cookie| state.auth_service.jwt().verify_access_token(cookie.value()))
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!(NOT_AUTHENTICATED)))?;

    // Store claims in request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Claims of the caller authenticated by [`access_cookie_middleware`].
pub struct AuthUser(pub AccessTokenClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<AccessTokenClaims>()
            .cloned()
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Auth claims missing from request extensions"
                ))
            })?;

        Ok(AuthUser(claims))
    }
}
