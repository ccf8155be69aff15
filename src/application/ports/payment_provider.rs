use async_trait::async_trait;
use uuid::Uuid;

use crate::app_error::AppResult;

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub company_id: Uuid,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub trial_days: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PortalSession {
    pub url: String,
}

/// Outbound payment-provider operations used by the checkout flow.
///
/// Constructed once at startup and passed in as a dependency so tests can
/// substitute a fake without touching the network.
#[async_trait]
pub trait PaymentProviderPort: Send + Sync {
    /// Start a hosted checkout session for a company. The implementation must
    /// stamp the company id onto the provider subscription metadata so webhook
    /// events can be attributed back to the company.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSession>;

    /// Open a billing portal session for an existing customer.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<PortalSession>;
}
