use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    dtos::auth::{LoginRequest, SignupRequest},
    models::{user::normalize_email, NewUser, PublicUser, Session},
    services::{
        metrics::{record_auth_event, AuthEvent},
        CredentialStore, JwtService, ServiceError, SessionStore,
    },
    utils::{hash_password, verify_against_placeholder, verify_password, Password},
};

/// Access and refresh credentials handed to the client.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Result of signup or login.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: PublicUser,
    pub tokens: IssuedTokens,
}

/// Result of a successful refresh rotation.
#[derive(Debug, Clone)]
pub struct SessionRefresh {
    pub user: PublicUser,
    pub tokens: IssuedTokens,
}

#[derive(Debug, Clone)]
pub enum Verification {
    /// The access token was valid; nothing was rotated.
    Authenticated(PublicUser),
    /// The access token was unusable and the refresh token was rotated.
    Refreshed(SessionRefresh),
}

#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    sessions: SessionStore,
    jwt: JwtService,
    default_role_id: i32,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: SessionStore,
        jwt: JwtService,
        default_role_id: i32,
    ) -> Self {
        Self {
            credentials,
            sessions,
            jwt,
            default_role_id,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn signup(
        &self,
        req: SignupRequest,
        fingerprint: &str,
    ) -> Result<AuthOutcome, ServiceError> {
        let email = normalize_email(&req.email);

        if self.credentials.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::EmailAlreadyRegistered(email));
        }

        let password_hash = hash_password(&Password::new(req.password)).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;

        let user = self
            .credentials
            .create_user(NewUser {
                first_name: req.first_name.trim().to_string(),
                surname: req.surname.trim().to_string(),
                middle_name: req
                    .middle_name
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty()),
                email,
                password_hash,
                role_id: self.default_role_id,
            })
            .await?;

        tracing::info!(user_id = user.id, "User signed up");
        record_auth_event(AuthEvent::Signup);

        let tokens = self.open_session(user.id, fingerprint).await?;
        Ok(AuthOutcome {
            user: user.public(),
            tokens,
        })
    }

    pub async fn login(
        &self,
        req: LoginRequest,
        fingerprint: &str,
    ) -> Result<AuthOutcome, ServiceError> {
        let email = normalize_email(&req.email);

        let Some(user) = self.credentials.find_by_email(&email).await? else {
            verify_against_placeholder(&Password::new(req.password));
            tracing::info!("Login rejected: unknown email");
            record_auth_event(AuthEvent::LoginFailed);
            return Err(ServiceError::InvalidCredentials);
        };

        let matches = verify_password(&Password::new(req.password), &user.password_hash())
            .map_err(|e| {
                ServiceError::Internal(anyhow::anyhow!("Stored password hash unreadable: {}", e))
            })?;
        if !matches {
            tracing::info!(user_id = user.id, "Login rejected: wrong password");
            record_auth_event(AuthEvent::LoginFailed);
            return Err(ServiceError::InvalidCredentials);
        }

        if self.sessions.enforce_capacity(user.id).await? > 0 {
            record_auth_event(AuthEvent::Eviction);
        }

        let tokens = self.open_session(user.id, fingerprint).await?;

        tracing::info!(user_id = user.id, "User logged in");
        record_auth_event(AuthEvent::Login);

        Ok(AuthOutcome {
            user: user.public(),
            tokens,
        })
    }

    /// Authenticate by access token, falling back to refresh rotation.
    pub async fn verify(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        fingerprint: &str,
    ) -> Result<Verification, ServiceError> {
        if access_token.is_none() && refresh_token.is_none() {
            return Err(ServiceError::NoTokensProvided);
        }

        if let Some(claims) = access_token.and_then(|t| self.jwt.verify_access_token(t)) {
            if let Some(user) = self.credentials.find_by_id(claims.id).await? {
                return Ok(Verification::Authenticated(user));
            }
            tracing::warn!(user_id = claims.id, "Access token names an unknown user");
        }

        self.refresh(refresh_token, fingerprint)
            .await
            .map(Verification::Refreshed)
    }

    /// Rotate the session behind `refresh_token` and mint a new access token.
    pub async fn refresh(
        &self,
        refresh_token: Option<&str>,
        fingerprint: &str,
    ) -> Result<SessionRefresh, ServiceError> {
        let result = self.rotate(refresh_token, fingerprint).await;
        match &result {
            Ok(_) => record_auth_event(AuthEvent::Refresh),
            Err(e) if e.clears_cookies() => record_auth_event(AuthEvent::RefreshRejected),
            Err(_) => {}
        }
        result
    }

    /// Revoke the session behind `refresh_token`, if any.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), ServiceError> {
        if let Some(token) = refresh_token {
            if self.sessions.delete_by_refresh_token(token).await? {
                tracing::info!("Session revoked on logout");
            }
        }
        record_auth_event(AuthEvent::Logout);
        Ok(())
    }

    pub async fn current_user(&self, user_id: i64) -> Result<PublicUser, ServiceError> {
        self.credentials
            .find_by_id(user_id)
            .await?
            .ok_or(ServiceError::SessionInvalid)
    }

    pub async fn health_check(&self) -> Result<(), anyhow::Error> {
        self.credentials.health_check().await
    }

    async fn rotate(
        &self,
        refresh_token: Option<&str>,
        fingerprint: &str,
    ) -> Result<SessionRefresh, ServiceError> {
        let token = refresh_token.ok_or(ServiceError::SessionInvalid)?;

        let Some(found) = self.sessions.find_by_refresh_token(token).await? else {
            return Err(ServiceError::SessionInvalid);
        };

        if !found.session.is_valid() {
            tracing::info!(user_id = found.user.id, "Refresh rejected: session expired");
            self.sessions.delete_by_refresh_token(token).await?;
            return Err(ServiceError::SessionInvalid);
        }

        if self.sessions.config().bind_fingerprint && found.session.fingerprint != fingerprint {
            tracing::warn!(
                user_id = found.user.id,
                "Refresh rejected: fingerprint mismatch, revoking session"
            );
            self.sessions.delete_by_refresh_token(token).await?;
            return Err(ServiceError::FingerprintMismatch);
        }

        let Some(successor) = self.sessions.replace(&found.session).await? else {
            tracing::info!(user_id = found.user.id, "Refresh rejected: token already rotated");
            return Err(ServiceError::SessionInvalid);
        };

        let access = self.jwt.issue_access_token(successor.user_id)?;

        Ok(SessionRefresh {
            user: found.user,
            tokens: tokens_for(access, &successor),
        })
    }

    async fn open_session(
        &self,
        user_id: i64,
        fingerprint: &str,
    ) -> Result<IssuedTokens, ServiceError> {
        let access = self.jwt.issue_access_token(user_id)?;
        let session = self.sessions.create(user_id, fingerprint).await?;
        Ok(tokens_for(access, &session))
    }
}

fn tokens_for(access: crate::services::IssuedAccessToken, session: &Session) -> IssuedTokens {
    IssuedTokens {
        access_token: access.token,
        access_expires_at: access.expires_at,
        refresh_token: session.refresh_token.clone(),
        refresh_expires_at: session.expires_at,
    }
}
