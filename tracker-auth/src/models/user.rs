//! User model - identity records checked by signup and login.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::utils::PasswordHashString;

/// Full user row, including the password hash.
///
/// Never serialized; use [`User::public`] for anything leaving the service.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub surname: String,
    pub middle_name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub photo_link: Option<String>,
    pub role_id: i32,
}

impl User {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            first_name: self.first_name.clone(),
            surname: self.surname.clone(),
            middle_name: self.middle_name.clone(),
            email: self.email.clone(),
            photo_link: self.photo_link.clone(),
            role_id: self.role_id,
        }
    }

    pub fn password_hash(&self) -> PasswordHashString {
        PasswordHashString::new(self.password_hash.clone())
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role_id", &self.role_id)
            .finish_non_exhaustive()
    }
}

/// User projection returned by the API (no password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "Ada")]
    pub first_name: String,
    #[schema(example = "Lovelace")]
    pub surname: String,
    pub middle_name: Option<String>,
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub photo_link: Option<String>,
    #[schema(example = 1)]
    pub role_id: i32,
}

/// Fields required to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub surname: String,
    pub middle_name: Option<String>,
    pub email: String,
    pub password_hash: PasswordHashString,
    pub role_id: i32,
}

/// Emails are stored and compared lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
