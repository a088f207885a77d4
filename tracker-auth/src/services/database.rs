//! PostgreSQL implementation of the credential and session stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument};

use super::store::{CredentialStore, SessionRepository};
use super::ServiceError;
use crate::config::DatabaseConfig;
use crate::models::{NewSession, NewUser, PublicUser, Session, SessionWithUser, User};

const USER_COLUMNS: &str =
    "id, first_name, surname, middle_name, email, password_hash, photo_link, role_id";
const PUBLIC_USER_COLUMNS: &str =
    "id, first_name, surname, middle_name, email, photo_link, role_id";
const SESSION_COLUMNS: &str = "id, user_id, refresh_token, fingerprint, expires_at, created_at";

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// Session joined with its owner in a single row.
#[derive(FromRow)]
struct SessionUserRow {
    session_id: i64,
    user_id: i64,
    refresh_token: String,
    fingerprint: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    first_name: String,
    surname: String,
    middle_name: Option<String>,
    email: String,
    photo_link: Option<String>,
    role_id: i32,
}

impl From<SessionUserRow> for SessionWithUser {
    fn from(row: SessionUserRow) -> Self {
        SessionWithUser {
            session: Session {
                id: row.session_id,
                user_id: row.user_id,
                refresh_token: row.refresh_token,
                fingerprint: row.fingerprint,
                expires_at: row.expires_at,
                created_at: row.created_at,
            },
            user: PublicUser {
                id: row.user_id,
                first_name: row.first_name,
                surname: row.surname,
                middle_name: row.middle_name,
                email: row.email,
                photo_link: row.photo_link,
                role_id: row.role_id,
            },
        }
    }
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool.
    #[instrument(skip(config), fields(service = "tracker-auth"))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for Database {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: NewUser) -> Result<User, ServiceError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (first_name, surname, middle_name, email, password_hash, role_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.first_name)
        .bind(&user.surname)
        .bind(&user.middle_name)
        .bind(&user.email)
        .bind(user.password_hash.as_str())
        .bind(user.role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                ServiceError::EmailAlreadyRegistered(user.email.clone())
            }
            _ => ServiceError::Database(e),
        })?;

        info!(user_id = created.id, "User created");
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PublicUser>, ServiceError> {
        let user = sqlx::query_as::<_, PublicUser>(&format!(
            "SELECT {PUBLIC_USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                anyhow::anyhow!("Database health check failed: {}", e)
            })?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for Database {
    async fn insert_session(&self, session: NewSession) -> Result<Session, ServiceError> {
        let created = sqlx::query_as::<_, Session>(&format!(
            r#"
            INSERT INTO sessions (user_id, refresh_token, fingerprint, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session.user_id)
        .bind(&session.refresh_token)
        .bind(&session.fingerprint)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_session_with_user(
        &self,
        refresh_token: &str,
    ) -> Result<Option<SessionWithUser>, ServiceError> {
        let row = sqlx::query_as::<_, SessionUserRow>(
            r#"
            SELECT s.id AS session_id, s.user_id, s.refresh_token, s.fingerprint,
                   s.expires_at, s.created_at,
                   u.first_name, u.surname, u.middle_name, u.email, u.photo_link, u.role_id
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.refresh_token = $1
            "#,
        )
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SessionWithUser::from))
    }

    async fn count_active_sessions(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE user_id = $1 AND expires_at > $2",
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn delete_sessions_for_user(&self, user_id: i64) -> Result<u64, ServiceError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_oldest_sessions(&self, user_id: i64, keep: u64) -> Result<u64, ServiceError> {
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE id IN (
                SELECT id FROM sessions
                WHERE user_id = $1
                ORDER BY created_at DESC, id DESC
                OFFSET $2
            )
            "#,
        )
        .bind(user_id)
        .bind(keep)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn take_session(&self, refresh_token: &str) -> Result<Option<Session>, ServiceError> {
        // Row-level delete: a concurrent taker sees zero rows.
        let taken = sqlx::query_as::<_, Session>(&format!(
            "DELETE FROM sessions WHERE refresh_token = $1 RETURNING {SESSION_COLUMNS}"
        ))
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(taken)
    }
}
