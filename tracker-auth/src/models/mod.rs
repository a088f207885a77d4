//! Persistent entities owned or consulted by the auth service.

pub mod session;
pub mod user;

pub use session::{NewSession, Session, SessionWithUser};
pub use user::{NewUser, PublicUser, User};
