//! HTTP handlers for tracker-auth.

pub mod auth;
pub mod cookies;
pub mod metrics;
pub mod user;
