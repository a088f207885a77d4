//! Business logic: the auth coordinator and the stores it drives.

mod auth;
mod database;
pub mod error;
mod jwt;
pub mod metrics;
mod session;
pub mod store;

pub use auth::{AuthOutcome, AuthService, IssuedTokens, SessionRefresh, Verification};
pub use database::Database;
pub use error::ServiceError;
pub use jwt::{AccessTokenClaims, IssuedAccessToken, JwtService};
pub use session::SessionStore;
pub use store::{CredentialStore, InMemoryStore, SessionRepository};
