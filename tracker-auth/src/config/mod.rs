use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

/// Minimum HS256 secret length accepted in production.
const MIN_PROD_SECRET_BYTES: usize = 32;
/// Ten years.
const MAX_SESSION_AGE_MS: i64 = 315_360_000_000;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub observability: ObservabilityConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub cookies: CookieConfig,
    pub users: UserDefaults,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub access_token_expiry_minutes: i64,
}

/// What to do with a user's existing sessions once they hold `max_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Drop every session the user has.
    All,
    /// Drop only the oldest sessions, leaving room for exactly one more.
    Oldest,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Absolute session lifetime in milliseconds.
    pub max_age_ms: i64,
    pub max_count: u32,
    pub eviction: EvictionPolicy,
    /// Reject refreshes whose fingerprint differs from the one stored at login.
    pub bind_fingerprint: bool,
}

impl SessionConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.max_age_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_ms: 5_184_000_000,
            max_count: 5,
            eviction: EvictionPolicy::All,
            bind_fingerprint: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub secure: bool,
}

#[derive(Debug, Clone)]
pub struct UserDefaults {
    pub default_role_id: i32,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub enabled: SwaggerMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwaggerMode {
    Public,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub signup_attempts: u32,
    pub signup_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AuthConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("tracker-auth"), false)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            observability: ObservabilityConfig {
                otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            },
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_parsed("DATABASE_MAX_CONNECTIONS", "10", false)?,
                min_connections: get_parsed("DATABASE_MIN_CONNECTIONS", "1", false)?,
            },
            jwt: JwtConfig {
                secret: Secret::new(get_env("JWT_SECRET", None, is_prod)?),
                access_token_expiry_minutes: get_parsed(
                    "JWT_ACCESS_TOKEN_EXPIRY_MINUTES",
                    "15",
                    false,
                )?,
            },
            session: SessionConfig {
                max_age_ms: get_parsed("SESSION_MAX_AGE", "5184000000", is_prod)?,
                max_count: get_parsed("SESSION_MAX_COUNT", "5", is_prod)?,
                eviction: get_parsed("SESSION_EVICTION_POLICY", "all", false)?,
                bind_fingerprint: get_parsed("SESSION_BIND_FINGERPRINT", "true", false)?,
            },
            cookies: CookieConfig {
                secure: get_parsed("COOKIE_SECURE", if is_prod { "true" } else { "false" }, false)?,
            },
            users: UserDefaults {
                default_role_id: get_parsed("DEFAULT_ROLE_ID", "1", false)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            swagger: SwaggerConfig {
                enabled: get_parsed(
                    "ENABLE_SWAGGER",
                    if is_prod { "disabled" } else { "public" },
                    false,
                )?,
            },
            rate_limit: RateLimitConfig {
                login_attempts: get_parsed("RATE_LIMIT_LOGIN_ATTEMPTS", "5", false)?,
                login_window_seconds: get_parsed("RATE_LIMIT_LOGIN_WINDOW_SECONDS", "900", false)?,
                signup_attempts: get_parsed("RATE_LIMIT_SIGNUP_ATTEMPTS", "3", false)?,
                signup_window_seconds: get_parsed(
                    "RATE_LIMIT_SIGNUP_WINDOW_SECONDS",
                    "3600",
                    false,
                )?,
                global_ip_limit: get_parsed("RATE_LIMIT_GLOBAL_IP_LIMIT", "100", false)?,
                global_ip_window_seconds: get_parsed(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    "60",
                    false,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.access_token_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.jwt.secret.expose_secret().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET must not be empty"
            )));
        }

        if self.session.max_age_ms <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_MAX_AGE must be positive"
            )));
        }

        if self.session.max_age_ms > MAX_SESSION_AGE_MS {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_MAX_AGE must not exceed {} ms",
                MAX_SESSION_AGE_MS
            )));
        }

        if self.session.max_count == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_MAX_COUNT must be at least 1"
            )));
        }

        if self.environment == Environment::Prod {
            if self.jwt.secret.expose_secret().len() < MIN_PROD_SECRET_BYTES {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT_SECRET must be at least {} bytes in production",
                    MIN_PROD_SECRET_BYTES
                )));
            }

            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if !self.cookies.secure {
                tracing::warn!("COOKIE_SECURE is off in production; auth cookies will be sent over plain HTTP");
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_parsed<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e)))
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(EvictionPolicy::All),
            "oldest" => Ok(EvictionPolicy::Oldest),
            _ => Err(format!("Invalid eviction policy: {}", s)),
        }
    }
}

impl FromStr for SwaggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(SwaggerMode::Public),
            "disabled" => Ok(SwaggerMode::Disabled),
            _ => Err(format!("Invalid swagger mode: {}", s)),
        }
    }
}
