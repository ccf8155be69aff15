use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::ports::{
        payment_provider::PaymentProviderPort, webhook_verifier::WebhookVerifier,
    },
    application::use_cases::{
        billing::{BillingSettings, BillingStore, BillingUseCases},
        checkout::{CheckoutUseCases, CompanyRepo},
        entitlement::{CachePolicy, EntitlementUseCases, MemberRepo, SubscriptionRepo},
    },
    infra::{
        config::AppConfig, postgres_persistence, stripe_client::StripeClient,
        stripe_webhook_verifier::StripeWebhookVerifier,
    },
};

use secrecy::{ExposeSecret, SecretString};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres = Arc::new(postgres_persistence(&config.database_url).await?);

    let store = postgres.clone() as Arc<dyn BillingStore>;
    let subscription_repo = postgres.clone() as Arc<dyn SubscriptionRepo>;
    let member_repo = postgres.clone() as Arc<dyn MemberRepo>;
    let company_repo = postgres.clone() as Arc<dyn CompanyRepo>;

    let webhook_verifier: Arc<dyn WebhookVerifier> = Arc::new(StripeWebhookVerifier::new(
        SecretString::new(config.stripe_webhook_secret.expose_secret().into()),
        config.signature_tolerance_secs,
    ));
    let payment_provider: Arc<dyn PaymentProviderPort> = Arc::new(StripeClient::new(
        SecretString::new(config.stripe_secret_key.expose_secret().into()),
        config.stripe_api_version.clone(),
    ));

    let billing_use_cases = BillingUseCases::new(
        store,
        BillingSettings {
            grace_period_failures: config.grace_period_failures,
            persistence_timeout: std::time::Duration::from_millis(config.persistence_timeout_ms),
        },
    );

    let entitlement_use_cases = EntitlementUseCases::new(
        subscription_repo.clone(),
        member_repo,
        CachePolicy {
            ttl_ms: config.entitlement_cache_ttl_ms,
            key: "entitlement".to_string(),
            skip: config.entitlement_cache_skip,
        },
    );

    let checkout_use_cases =
        CheckoutUseCases::new(company_repo, subscription_repo, payment_provider);

    Ok(AppState {
        config: Arc::new(config),
        billing_use_cases: Arc::new(billing_use_cases),
        entitlement_use_cases: Arc::new(entitlement_use_cases),
        checkout_use_cases: Arc::new(checkout_use_cases),
        webhook_verifier,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "workboard_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
