use std::sync::Arc;

use crate::{
    application::ports::webhook_verifier::WebhookVerifier,
    application::use_cases::{
        billing::BillingUseCases, checkout::CheckoutUseCases, entitlement::EntitlementUseCases,
    },
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub billing_use_cases: Arc<BillingUseCases>,
    pub entitlement_use_cases: Arc<EntitlementUseCases>,
    pub checkout_use_cases: Arc<CheckoutUseCases>,
    pub webhook_verifier: Arc<dyn WebhookVerifier>,
}
