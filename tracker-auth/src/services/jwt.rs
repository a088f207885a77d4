use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;

/// Signs and verifies short-lived access tokens (HS256).
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_lifetime: Duration,
}

/// Access token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User id
    pub id: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// A freshly signed access token and the instant it stops verifying.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let secret = config.secret.expose_secret();
        if secret.is_empty() {
            return Err(anyhow::anyhow!("JWT secret must not be empty"));
        }

        tracing::info!(
            expiry_minutes = config.access_token_expiry_minutes,
            "JWT service initialized with HS256 secret"
        );

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_lifetime: Duration::minutes(config.access_token_expiry_minutes),
        })
    }

    pub fn access_token_lifetime(&self) -> Duration {
        self.access_token_lifetime
    }

    pub fn issue_access_token(&self, user_id: i64) -> Result<IssuedAccessToken, anyhow::Error> {
        self.issue_access_token_at(user_id, Utc::now())
    }

    /// Sign a token as if it had been issued at `issued_at`.
    pub fn issue_access_token_at(
        &self,
        user_id: i64,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedAccessToken, anyhow::Error> {
        let expires_at = issued_at + self.access_token_lifetime;

        let claims = AccessTokenClaims {
            id: user_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))?;

        Ok(IssuedAccessToken { token, expires_at })
    }

    /// Decode a token; `None` covers expiry, a foreign signature and malformed input alike.
    pub fn verify_access_token(&self, token: &str) -> Option<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        match decode::<AccessTokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "Access token rejected");
                None
            }
        }
    }
}
