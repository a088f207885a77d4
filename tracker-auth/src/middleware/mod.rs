pub mod auth;
pub mod fingerprint;
pub mod metrics;

pub use auth::{access_cookie_middleware, AuthUser};
pub use fingerprint::Fingerprint;
pub use metrics::metrics_middleware;
