use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;

#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

/// Verifications run against the placeholder hash.
#[cfg(test)]
pub(crate) static PLACEHOLDER_VERIFICATIONS: AtomicUsize = AtomicUsize::new(0);

/// Plaintext password; never printed.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// PHC-formatted hash as stored in `users.password_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(password_hash))
}

/// Check a candidate password against a stored hash.
///
/// Returns `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<bool, anyhow::Error> {
    let parsed_hash = PasswordHash::new(password_hash.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .is_ok())
}

/// Spend one Argon2 verification for a login whose account does not exist.
///
/// The placeholder hash is built once with the default parameters, so this
/// costs the same as checking a real stored hash.
pub fn verify_against_placeholder(password: &Password) {
    static PLACEHOLDER_HASH: OnceLock<Option<PasswordHashString>> = OnceLock::new();

    let placeholder = PLACEHOLDER_HASH.get_or_init(|| {
        hash_password(&Password::new("placeholder-never-matches".to_string()))
            .map_err(|e| tracing::error!(error = %e, "Failed to build placeholder hash"))
            .ok()
    });

    if let Some(hash) = placeholder {
        let _ = verify_password(password, hash);
        #[cfg(test)]
        PLACEHOLDER_VERIFICATIONS.fetch_add(1, Ordering::SeqCst);
    }
}
