use crate::app_error::AppResult;
use crate::domain::entities::billing_event::BillingEvent;

/// Authenticates an inbound billing event byte stream.
///
/// Implementations must verify over the exact bytes as received - the body is
/// never parsed or re-serialized before the check. The production
/// implementation is HMAC-based (`infra::stripe_webhook_verifier`); tests
/// substitute their own.
pub trait WebhookVerifier: Send + Sync {
    fn verify(&self, payload: &[u8], signature_header: &str) -> AppResult<BillingEvent>;
}
