use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::PublicUser;

/// Names are trimmed on the way in so length checks see what gets stored.
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 64, message = "First name is required"))]
    #[schema(example = "Ada")]
    pub first_name: String,

    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 64, message = "Surname is required"))]
    #[schema(example = "Lovelace")]
    pub surname: String,

    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(max = 64, message = "Middle name is too long"))]
    pub middle_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "ada@example.com")]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "Password must be 6 to 128 characters"))]
    #[schema(example = "secret1", min_length = 6)]
    pub password: String,
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "ada@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "secret1")]
    pub password: String,
}

/// Signup and login response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[schema(example = "Logged in")]
    pub message: String,
    /// Refresh cookie expiry, epoch milliseconds.
    #[schema(example = 1767225600000_i64)]
    pub refresh_token_expire_in: i64,
    /// Access cookie expiry, epoch milliseconds.
    #[schema(example = 1762042500000_i64)]
    pub access_token_expire_in: i64,
    pub user: PublicUser,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[schema(example = "Token was successfully refreshed")]
    pub message: String,
    pub refresh_token_expire_in: i64,
    pub access_token_expire_in: i64,
}

/// Verify response; expiries are present only when the call rotated the session.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    #[schema(example = "User was authenticated")]
    pub message: String,
    pub user: PublicUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_expire_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_expire_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            first_name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            middle_name: None,
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_signup_accepts_camel_case_body() {
        let req: SignupRequest = serde_json::from_str(
            r#"{"firstName":"Ada","surname":"Lovelace","email":"a@x.com","password":"secret1"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(req.middle_name.is_none());
    }

    #[test]
    fn test_signup_rejects_short_password() {
        assert!(signup("a@x.com", "12345").validate().is_err());
    }

    #[test]
    fn test_signup_rejects_bad_email() {
        assert!(signup("not-an-email", "secret1").validate().is_err());
    }

    #[test]
    fn test_signup_rejects_blank_names() {
        let mut req = signup("a@x.com", "secret1");
        req.first_name = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_signup_rejects_whitespace_only_names() {
        let req: SignupRequest = serde_json::from_str(
            r#"{"firstName":"   ","surname":" Lovelace ","middleName":"  ","email":"a@x.com","password":"secret1"}"#,
        )
        .unwrap();
        assert_eq!(req.first_name, "");
        assert_eq!(req.surname, "Lovelace");
        assert!(req.middle_name.is_none());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_login_requires_password() {
        let req = LoginRequest {
            email: "a@x.com".to_string(),
            password: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
