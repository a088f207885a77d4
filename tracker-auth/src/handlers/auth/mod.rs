pub mod registration;
pub mod session;

pub use registration::signup;
pub use session::{login, logout, refresh_tokens, verify};
