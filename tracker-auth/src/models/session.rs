//! Session model - one row per active login, keyed by its refresh token.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::PublicUser;

#[derive(Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub refresh_token: String,
    pub fingerprint: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A session is usable only while `now < expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Row to insert; the store assigns `id` and `created_at`.
#[derive(Clone)]
pub struct NewSession {
    pub user_id: i64,
    pub refresh_token: String,
    pub fingerprint: String,
    pub expires_at: DateTime<Utc>,
}

/// Session joined with the owner's public projection.
#[derive(Debug, Clone)]
pub struct SessionWithUser {
    pub session: Session,
    pub user: PublicUser,
}
