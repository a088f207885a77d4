//! Auth cookie helpers.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    config::AuthConfig,
    services::{IssuedTokens, ServiceError},
};
use service_core::error::AppError;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Cookie attributes derived from configuration.
#[derive(Debug, Clone)]
pub struct AuthCookies {
    secure: bool,
    access_max_age: time::Duration,
    refresh_max_age: time::Duration,
}

impl AuthCookies {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            secure: config.cookies.secure,
            access_max_age: time::Duration::minutes(config.jwt.access_token_expiry_minutes),
            refresh_max_age: time::Duration::milliseconds(config.session.max_age_ms),
        }
    }

    /// Add both credentials to the jar.
    pub fn set(&self, jar: CookieJar, tokens: &IssuedTokens) -> CookieJar {
        jar.add(self.build(
            REFRESH_TOKEN_COOKIE,
            tokens.refresh_token.clone(),
            self.refresh_max_age,
        ))
        .add(self.build(
            ACCESS_TOKEN_COOKIE,
            tokens.access_token.clone(),
            self.access_max_age,
        ))
    }

    fn build(&self, name: &'static str, value: String, max_age: time::Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build()
    }
}

/// Expire both credentials on the client.
pub fn clear_auth_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/"))
}

/// Turn a service failure into a response, clearing cookies for session rejections.
pub fn reject(jar: CookieJar, err: ServiceError) -> (CookieJar, AppError) {
    let jar = if err.clears_cookies() {
        clear_auth_cookies(jar)
    } else {
        jar
    };
    (jar, err.into())
}

/// Values of the access and refresh cookies, when present and non-empty.
pub fn auth_cookie_values(jar: &CookieJar) -> (Option<String>, Option<String>) {
    let value = |name: &str| {
        jar.get(name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    };
    (value(ACCESS_TOKEN_COOKIE), value(REFRESH_TOKEN_COOKIE))
}
