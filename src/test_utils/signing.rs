//! Webhook signing helper mirroring the provider's signature scheme.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Produce a `stripe-signature` header value over the exact body bytes.
pub fn sign_webhook_payload(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={},v1={}", timestamp, signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic() {
        let sig1 = sign_webhook_payload("whsec_test_secret", 1706500000, br#"{"id":"evt_1"}"#);
        let sig2 = sign_webhook_payload("whsec_test_secret", 1706500000, br#"{"id":"evt_1"}"#);
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn signature_changes_with_secret_timestamp_or_body() {
        let base = sign_webhook_payload("whsec_test_secret", 1706500000, br#"{"id":"evt_1"}"#);
        assert_ne!(
            base,
            sign_webhook_payload("whsec_other", 1706500000, br#"{"id":"evt_1"}"#)
        );
        assert_ne!(
            base,
            sign_webhook_payload("whsec_test_secret", 1706500001, br#"{"id":"evt_1"}"#)
        );
        assert_ne!(
            base,
            sign_webhook_payload("whsec_test_secret", 1706500000, br#"{"id":"evt_2"}"#)
        );
    }

    #[test]
    fn signature_has_expected_format() {
        let sig = sign_webhook_payload("whsec_test_secret", 1706500000, br#"{"id":"evt_1"}"#);
        assert!(sig.starts_with("t=1706500000,v1="));
        let hex_part = sig.strip_prefix("t=1706500000,v1=").unwrap();
        assert_eq!(hex_part.len(), 64);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
