use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{Mutex, OnceLock};

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static AUTH_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Auth lifecycle events counted under `auth_events_total{event}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    Signup,
    Login,
    LoginFailed,
    Refresh,
    RefreshRejected,
    Eviction,
    Logout,
}

impl AuthEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::Signup => "signup",
            AuthEvent::Login => "login",
            AuthEvent::LoginFailed => "login_failed",
            AuthEvent::Refresh => "refresh",
            AuthEvent::RefreshRejected => "refresh_rejected",
            AuthEvent::Eviction => "eviction",
            AuthEvent::Logout => "logout",
        }
    }
}

/// Register collectors. Safe to call more than once; only the first call wins.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )?;
    let request_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "path", "status"],
    )?;
    let auth_events = IntCounterVec::new(
        Opts::new("auth_events_total", "Authentication lifecycle events"),
        &["event"],
    )?;

    registry.register(Box::new(requests_total.clone()))?;
    registry.register(Box::new(request_duration.clone()))?;
    registry.register(Box::new(auth_events.clone()))?;

    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(request_duration);
    let _ = AUTH_EVENTS_TOTAL.set(auth_events);
    Ok(())
}

pub fn record_auth_event(event: AuthEvent) {
    if let Some(counter) = AUTH_EVENTS_TOTAL.get() {
        counter.with_label_values(&[event.as_str()]).inc();
    }
}

pub fn get_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        tracing::error!("Metrics registry not initialized");
        return "# Metrics registry not initialized\n".to_string();
    };

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to UTF-8: {}", e);
        format!("# Failed to convert metrics to UTF-8: {}\n", e)
    })
}
