use chrono::Utc;
use rand::RngCore;
use std::sync::Arc;

use super::store::SessionRepository;
use super::ServiceError;
use crate::config::{EvictionPolicy, SessionConfig};
use crate::models::{NewSession, Session, SessionWithUser};

/// Refresh tokens are this many random bytes, hex-encoded.
const REFRESH_TOKEN_BYTES: usize = 32;

/// Session lifecycle on top of a [`SessionRepository`]: creation, lookup,
/// capacity eviction and single-use rotation.
#[derive(Clone)]
pub struct SessionStore {
    repo: Arc<dyn SessionRepository>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(repo: Arc<dyn SessionRepository>, config: SessionConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub async fn create(&self, user_id: i64, fingerprint: &str) -> Result<Session, ServiceError> {
        self.repo
            .insert_session(NewSession {
                user_id,
                refresh_token: generate_refresh_token(),
                fingerprint: fingerprint.to_string(),
                expires_at: Utc::now() + self.config.max_age(),
            })
            .await
    }

    /// Session for `refresh_token` joined with its owner. Expired rows are returned
    /// too; validity is the caller's check.
    pub async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<SessionWithUser>, ServiceError> {
        self.repo.find_session_with_user(refresh_token).await
    }

    pub async fn count_active(&self, user_id: i64) -> Result<u64, ServiceError> {
        self.repo.count_active_sessions(user_id, Utc::now()).await
    }

    pub async fn delete_all_for(&self, user_id: i64) -> Result<u64, ServiceError> {
        self.repo.delete_sessions_for_user(user_id).await
    }

    pub async fn evict_oldest(&self, user_id: i64, keep: u64) -> Result<u64, ServiceError> {
        self.repo.delete_oldest_sessions(user_id, keep).await
    }

    /// Make room for one more session when the user is at the configured maximum.
    ///
    /// Returns the number of sessions removed.
    pub async fn enforce_capacity(&self, user_id: i64) -> Result<u64, ServiceError> {
        let max_count = u64::from(self.config.max_count);
        let active = self.count_active(user_id).await?;
        if active < max_count {
            return Ok(0);
        }

        let evicted = match self.config.eviction {
            EvictionPolicy::All => self.delete_all_for(user_id).await?,
            EvictionPolicy::Oldest => self.evict_oldest(user_id, max_count - 1).await?,
        };

        tracing::info!(
            user_id,
            active,
            evicted,
            policy = ?self.config.eviction,
            "Session limit reached, evicted sessions"
        );
        Ok(evicted)
    }

    /// Consume `old` and create its successor for the same user and fingerprint.
    ///
    /// `None` means another request already consumed the token.
    pub async fn replace(&self, old: &Session) -> Result<Option<Session>, ServiceError> {
        match self.repo.take_session(&old.refresh_token).await? {
            Some(taken) => Ok(Some(self.create(taken.user_id, &taken.fingerprint).await?)),
            None => Ok(None),
        }
    }

    pub async fn delete_by_refresh_token(&self, refresh_token: &str) -> Result<bool, ServiceError> {
        Ok(self.repo.take_session(refresh_token).await?.is_some())
    }
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::services::store::{CredentialStore, InMemoryStore};
    use crate::utils::PasswordHashString;
    use chrono::Duration;

    async fn store_with_user(config: SessionConfig) -> (Arc<InMemoryStore>, SessionStore, i64) {
        let backing = Arc::new(InMemoryStore::new());
        let user = backing
            .create_user(NewUser {
                first_name: "Ada".to_string(),
                surname: "Lovelace".to_string(),
                middle_name: None,
                email: "a@x.com".to_string(),
                password_hash: PasswordHashString::new("hash".to_string()),
                role_id: 1,
            })
            .await
            .unwrap();
        let sessions = SessionStore::new(backing.clone(), config);
        (backing, sessions, user.id)
    }

    #[test]
    fn test_refresh_tokens_are_random_hex() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_eq!(a.len(), REFRESH_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_create_sets_expiry_from_config() {
        let (_, sessions, user_id) = store_with_user(SessionConfig::default()).await;
        let session = sessions.create(user_id, "fp").await.unwrap();

        let lifetime = session.expires_at - session.created_at;
        assert!((lifetime - Duration::days(60)).num_seconds().abs() <= 1);
    }

    #[tokio::test]
    async fn test_replace_is_single_use() {
        let (_, sessions, user_id) = store_with_user(SessionConfig::default()).await;
        let original = sessions.create(user_id, "fp").await.unwrap();

        let successor = sessions.replace(&original).await.unwrap().unwrap();
        assert_ne!(successor.refresh_token, original.refresh_token);
        assert_eq!(successor.fingerprint, "fp");
        assert!(sessions.replace(&original).await.unwrap().is_none());
        assert!(sessions
            .find_by_refresh_token(&original.refresh_token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_concurrent_replace_has_one_winner() {
        let (backing, sessions, user_id) = store_with_user(SessionConfig::default()).await;
        let original = sessions.create(user_id, "fp").await.unwrap();

        let (a, b) = tokio::join!(sessions.replace(&original), sessions.replace(&original));
        let winners = [a.unwrap(), b.unwrap()].iter().filter(|r| r.is_some()).count();

        assert_eq!(winners, 1);
        assert_eq!(backing.session_count(), 1);
    }

    #[tokio::test]
    async fn test_capacity_evict_all() {
        let config = SessionConfig {
            max_count: 3,
            ..SessionConfig::default()
        };
        let (_, sessions, user_id) = store_with_user(config).await;
        for _ in 0..3 {
            sessions.create(user_id, "fp").await.unwrap();
        }

        assert_eq!(sessions.enforce_capacity(user_id).await.unwrap(), 3);
        assert_eq!(sessions.count_active(user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_capacity_evict_oldest_leaves_room_for_one() {
        let config = SessionConfig {
            max_count: 3,
            eviction: EvictionPolicy::Oldest,
            ..SessionConfig::default()
        };
        let (backing, sessions, user_id) = store_with_user(config).await;
        let mut created = Vec::new();
        for _ in 0..3 {
            created.push(sessions.create(user_id, "fp").await.unwrap().refresh_token);
        }

        assert_eq!(sessions.enforce_capacity(user_id).await.unwrap(), 1);
        assert_eq!(backing.refresh_tokens_of(user_id), created[1..].to_vec());
    }

    #[tokio::test]
    async fn test_capacity_below_limit_is_noop() {
        let (_, sessions, user_id) = store_with_user(SessionConfig::default()).await;
        sessions.create(user_id, "fp").await.unwrap();

        assert_eq!(sessions.enforce_capacity(user_id).await.unwrap(), 0);
        assert_eq!(sessions.count_active(user_id).await.unwrap(), 1);
    }
}
