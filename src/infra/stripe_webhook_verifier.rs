use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::webhook_verifier::WebhookVerifier,
    domain::entities::billing_event::BillingEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 verification of the provider's signed-timestamp scheme.
///
/// The signature header has the form `t=<unix secs>,v1=<hex digest>[,v1=...]`
/// where the digest is computed over `<timestamp>.<raw body bytes>`. The MAC
/// runs over the bytes exactly as received; the JSON payload is decoded only
/// after the signature and the timestamp tolerance both check out.
pub struct StripeWebhookVerifier {
    secret: SecretString,
    tolerance_secs: i64,
}

impl StripeWebhookVerifier {
    pub fn new(secret: SecretString, tolerance_secs: i64) -> Self {
        Self {
            secret,
            tolerance_secs,
        }
    }

    fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now_ts: i64,
    ) -> AppResult<BillingEvent> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let kv: Vec<&str> = part.splitn(2, '=').collect();
            if kv.len() != 2 {
                continue;
            }
            match kv[0] {
                "t" => timestamp = Some(kv[1]),
                "v1" => signatures.push(kv[1]),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(AppError::InvalidSignature)?;
        if signatures.is_empty() {
            return Err(AppError::InvalidSignature);
        }
        let ts: i64 = timestamp.parse().map_err(|_| AppError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| AppError::Internal("HMAC key setup failed".into()))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        if !signatures
            .iter()
            .any(|sig| constant_time_compare(sig, &expected))
        {
            return Err(AppError::InvalidSignature);
        }

        if (now_ts - ts).abs() > self.tolerance_secs {
            return Err(AppError::InvalidSignature);
        }

        serde_json::from_slice(payload)
            .map_err(|e| AppError::InvalidPayload(format!("undecodable billing event: {e}")))
    }
}

impl WebhookVerifier for StripeWebhookVerifier {
    fn verify(&self, payload: &[u8], signature_header: &str) -> AppResult<BillingEvent> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
