//! HMAC signature calculation and verification for the payment gateway.
//!
//! Two schemes are in play:
//! * Client-confirmed payments: the browser hands back `{gateway_order_id, gateway_payment_id, signature}`
//!   where the signature is hex HMAC-SHA256 over `"<order_id>|<payment_id>"` with the shared secret.
//! * Webhook deliveries: the `X-Signature` header is hex HMAC-SHA256 over the raw, unparsed request body.
//!
//! Verification is constant-time via [`Mac::verify_slice`] and must happen before any JSON parsing of the
//! payload so that canonicalization differences cannot be exploited.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex signature the gateway expects for a client-confirmed payment.
pub fn payment_signature(gateway_order_id: &str, gateway_payment_id: &str, secret: &str) -> String {
    let payload = format!("{gateway_order_id}|{gateway_payment_id}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Check a client-supplied payment signature. Returns `false` on any mismatch or malformed signature; never
/// errors, and never reveals which part failed.
pub fn verify_payment_signature(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
    secret: &str,
) -> bool {
    let payload = format!("{gateway_order_id}|{gateway_payment_id}");
    verify_hex_hmac(payload.as_bytes(), signature, secret)
}

/// Compute the hex signature for a webhook body. The gateway does this on delivery; we use it when
/// exercising our own ingest.
pub fn webhook_signature(raw_body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a webhook delivery signature against the raw request body.
pub fn verify_webhook_signature(raw_body: &[u8], signature: &str, secret: &str) -> bool {
    verify_hex_hmac(raw_body, signature, secret)
}

fn verify_hex_hmac(data: &[u8], signature: &str, secret: &str) -> bool {
    let expected = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    #[test]
    fn payment_signature_round_trip() {
        let sig = payment_signature("gord_001", "pay_001", SECRET);
        assert!(verify_payment_signature("gord_001", "pay_001", &sig, SECRET));
    }

    #[test]
    fn payment_signature_wrong_secret() {
        let sig = payment_signature("gord_001", "pay_001", "wrong_secret");
        assert!(!verify_payment_signature("gord_001", "pay_001", &sig, SECRET));
    }

    #[test]
    fn payment_signature_swapped_ids() {
        let sig = payment_signature("gord_001", "pay_001", SECRET);
        assert!(!verify_payment_signature("pay_001", "gord_001", &sig, SECRET));
    }

    #[test]
    fn webhook_signature_detects_tampering() {
        let body = br#"{"event":"payment.captured"}"#;
        let tampered = br#"{"event":"payment.captured","hacked":true}"#;
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());
        assert!(verify_webhook_signature(body, &sig, SECRET));
        assert!(!verify_webhook_signature(tampered, &sig, SECRET));
    }

    #[test]
    fn malformed_signature_is_rejected_not_an_error() {
        assert!(!verify_webhook_signature(b"{}", "not-hex!!", SECRET));
        assert!(!verify_webhook_signature(b"{}", "", SECRET));
    }
}
