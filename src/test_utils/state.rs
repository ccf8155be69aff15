//! Pre-wired application state for HTTP route tests.

use axum::http::HeaderValue;
use secrecy::SecretString;
use std::sync::Arc;

use crate::{
    adapters::http::app_state::AppState,
    application::ports::webhook_verifier::WebhookVerifier,
    application::use_cases::{
        billing::{BillingSettings, BillingUseCases},
        checkout::CheckoutUseCases,
        entitlement::{CachePolicy, EntitlementUseCases},
    },
    infra::{config::AppConfig, stripe_webhook_verifier::StripeWebhookVerifier},
    test_utils::{InMemoryBillingStore, StubPaymentProvider},
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

pub struct TestApp {
    pub state: AppState,
    pub store: InMemoryBillingStore,
    pub provider: Arc<StubPaymentProvider>,
}

/// Application state backed by in-memory stores, a stub payment provider and
/// a real signature verifier keyed with `TEST_WEBHOOK_SECRET`.
pub fn test_app() -> TestApp {
    let store = InMemoryBillingStore::new();
    let provider = Arc::new(StubPaymentProvider::new());

    let billing_use_cases = BillingUseCases::new(
        Arc::new(store.clone()),
        BillingSettings {
            grace_period_failures: 3,
            persistence_timeout: std::time::Duration::from_secs(5),
        },
    );
    let entitlement_use_cases = EntitlementUseCases::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        CachePolicy::disabled("entitlement"),
    );
    let checkout_use_cases = CheckoutUseCases::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        provider.clone(),
    );
    let webhook_verifier: Arc<dyn WebhookVerifier> = Arc::new(StripeWebhookVerifier::new(
        SecretString::new(TEST_WEBHOOK_SECRET.into()),
        300,
    ));

    let state = AppState {
        config: Arc::new(test_config()),
        billing_use_cases: Arc::new(billing_use_cases),
        entitlement_use_cases: Arc::new(entitlement_use_cases),
        checkout_use_cases: Arc::new(checkout_use_cases),
        webhook_verifier,
    };

    TestApp {
        state,
        store,
        provider,
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://localhost/workboard_test".to_string(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        stripe_secret_key: SecretString::new("sk_test_xxx".into()),
        stripe_webhook_secret: SecretString::new(TEST_WEBHOOK_SECRET.into()),
        stripe_api_version: "2024-06-20".to_string(),
        signature_tolerance_secs: 300,
        grace_period_failures: 3,
        persistence_timeout_ms: 5000,
        entitlement_cache_ttl_ms: 2000,
        entitlement_cache_skip: true,
    }
}
