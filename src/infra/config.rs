use std::env;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use secrecy::SecretString;

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub cors_origin: HeaderValue,
    pub stripe_secret_key: SecretString,
    pub stripe_webhook_secret: SecretString,
    /// Single pinned provider API version. Every outbound call sends this
    /// exact version; it must never be hardcoded per call site.
    pub stripe_api_version: String,
    /// Allowed clock skew for webhook signature timestamps, in seconds.
    pub signature_tolerance_secs: i64,
    /// Consecutive payment failures tolerated before member entitlement is
    /// demoted.
    pub grace_period_failures: i32,
    /// Upper bound on persistence work for one webhook event.
    pub persistence_timeout_ms: u64,
    pub entitlement_cache_ttl_ms: u64,
    pub entitlement_cache_skip: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = env::var("BIND_ADDR")
            .unwrap_or("127.0.0.1:3001".to_string())
            .parse()
            .expect("BIND_ADDR must be a valid socket address");

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let cors_origin: HeaderValue = env::var("CORS_ORIGIN")
            .unwrap_or("http://localhost:3000".to_string())
            .parse()
            .expect("CORS_ORIGIN must be a valid header value");

        let stripe_secret_key = SecretString::new(
            env::var("STRIPE_SECRET_KEY")
                .expect("STRIPE_SECRET_KEY must be set")
                .into(),
        );
        let stripe_webhook_secret = SecretString::new(
            env::var("STRIPE_WEBHOOK_SECRET")
                .expect("STRIPE_WEBHOOK_SECRET must be set")
                .into(),
        );
        let stripe_api_version =
            env::var("STRIPE_API_VERSION").unwrap_or("2024-06-20".to_string());

        let signature_tolerance_secs: i64 = env::var("SIGNATURE_TOLERANCE_SECS")
            .unwrap_or("300".to_string())
            .parse()
            .expect("SIGNATURE_TOLERANCE_SECS must be a valid number");

        let grace_period_failures: i32 = env::var("GRACE_PERIOD_FAILURES")
            .unwrap_or("3".to_string())
            .parse()
            .expect("GRACE_PERIOD_FAILURES must be a valid number");

        let persistence_timeout_ms: u64 = env::var("PERSISTENCE_TIMEOUT_MS")
            .unwrap_or("5000".to_string())
            .parse()
            .expect("PERSISTENCE_TIMEOUT_MS must be a valid number");

        let entitlement_cache_ttl_ms: u64 = env::var("ENTITLEMENT_CACHE_TTL_MS")
            .unwrap_or("2000".to_string())
            .parse()
            .expect("ENTITLEMENT_CACHE_TTL_MS must be a valid number");

        let entitlement_cache_skip: bool = env::var("ENTITLEMENT_CACHE_SKIP")
            .unwrap_or("false".to_string())
            .parse()
            .expect("ENTITLEMENT_CACHE_SKIP must be true or false");

        Self {
            bind_addr,
            database_url,
            cors_origin,
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_api_version,
            signature_tolerance_secs,
            grace_period_failures,
            persistence_timeout_ms,
            entitlement_cache_ttl_ms,
            entitlement_cache_skip,
        }
    }
}
