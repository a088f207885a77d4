//! Persistence seams for users and sessions.
//!
//! [`Database`](super::Database) backs both traits with PostgreSQL;
//! [`InMemoryStore`] backs them with dashmaps for tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use super::ServiceError;
use crate::models::{NewSession, NewUser, PublicUser, Session, SessionWithUser, User};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by email (already normalized by the caller).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    /// Insert a user; a taken email yields `EmailAlreadyRegistered`.
    async fn create_user(&self, user: NewUser) -> Result<User, ServiceError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<PublicUser>, ServiceError>;

    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a session; refresh tokens are unique.
    async fn insert_session(&self, session: NewSession) -> Result<Session, ServiceError>;

    async fn find_session_with_user(
        &self,
        refresh_token: &str,
    ) -> Result<Option<SessionWithUser>, ServiceError>;

    /// Sessions of `user_id` still valid at `now`.
    async fn count_active_sessions(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError>;

    async fn delete_sessions_for_user(&self, user_id: i64) -> Result<u64, ServiceError>;

    /// Delete the oldest sessions of `user_id` until at most `keep` remain.
    async fn delete_oldest_sessions(&self, user_id: i64, keep: u64) -> Result<u64, ServiceError>;

    /// Atomically remove the session holding `refresh_token` and return it.
    ///
    /// Of two concurrent callers with the same token, exactly one gets `Some`.
    async fn take_session(&self, refresh_token: &str) -> Result<Option<Session>, ServiceError>;
}

/// Process-local store. Ids are assigned from counters starting at 1.
#[derive(Default)]
pub struct InMemoryStore {
    users: DashMap<i64, User>,
    user_ids_by_email: DashMap<String, i64>,
    sessions: DashMap<String, Session>,
    next_user_id: AtomicI64,
    next_session_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Refresh tokens currently held by `user_id`, oldest first.
    pub fn refresh_tokens_of(&self, user_id: i64) -> Vec<String> {
        let mut sessions = self.sessions_of(user_id);
        sessions.sort_by_key(|s| (s.created_at, s.id));
        sessions.into_iter().map(|s| s.refresh_token).collect()
    }

    /// Overwrite a session's expiry, e.g. to simulate elapsed time.
    pub fn set_session_expiry(&self, refresh_token: &str, expires_at: DateTime<Utc>) -> bool {
        match self.sessions.get_mut(refresh_token) {
            Some(mut session) => {
                session.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    fn sessions_of(&self, user_id: i64) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn remove_all(&self, tokens: Vec<String>) -> u64 {
        tokens
            .into_iter()
            .filter(|token| self.sessions.remove(token).is_some())
            .count() as u64
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let Some(id) = self.user_ids_by_email.get(email).map(|entry| *entry) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, ServiceError> {
        // The email index entry is the uniqueness lock.
        match self.user_ids_by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(ServiceError::EmailAlreadyRegistered(user.email)),
            Entry::Vacant(slot) => {
                let id = self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
                let created = User {
                    id,
                    first_name: user.first_name,
                    surname: user.surname,
                    middle_name: user.middle_name,
                    email: user.email,
                    password_hash: user.password_hash.into_string(),
                    photo_link: None,
                    role_id: user.role_id,
                };
                self.users.insert(id, created.clone());
                slot.insert(id);
                Ok(created)
            }
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PublicUser>, ServiceError> {
        Ok(self.users.get(&id).map(|user| user.public()))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn insert_session(&self, session: NewSession) -> Result<Session, ServiceError> {
        match self.sessions.entry(session.refresh_token.clone()) {
            Entry::Occupied(_) => Err(ServiceError::Internal(anyhow::anyhow!(
                "Refresh token collision"
            ))),
            Entry::Vacant(slot) => {
                let created = Session {
                    id: self.next_session_id.fetch_add(1, Ordering::SeqCst) + 1,
                    user_id: session.user_id,
                    refresh_token: session.refresh_token,
                    fingerprint: session.fingerprint,
                    expires_at: session.expires_at,
                    created_at: Utc::now(),
                };
                slot.insert(created.clone());
                Ok(created)
            }
        }
    }

    async fn find_session_with_user(
        &self,
        refresh_token: &str,
    ) -> Result<Option<SessionWithUser>, ServiceError> {
        let Some(session) = self.sessions.get(refresh_token).map(|s| s.clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&session.user_id).map(|user| SessionWithUser {
            session,
            user: user.public(),
        }))
    }

    async fn count_active_sessions(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError> {
        Ok(self
            .sessions
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.is_valid_at(now))
            .count() as u64)
    }

    async fn delete_sessions_for_user(&self, user_id: i64) -> Result<u64, ServiceError> {
        let tokens = self.refresh_tokens_of(user_id);
        Ok(self.remove_all(tokens))
    }

    async fn delete_oldest_sessions(&self, user_id: i64, keep: u64) -> Result<u64, ServiceError> {
        let tokens = self.refresh_tokens_of(user_id);
        let excess = tokens.len().saturating_sub(keep as usize);
        Ok(self.remove_all(tokens.into_iter().take(excess).collect()))
    }

    async fn take_session(&self, refresh_token: &str) -> Result<Option<Session>, ServiceError> {
        Ok(self.sessions.remove(refresh_token).map(|(_, session)| session))
    }
}
