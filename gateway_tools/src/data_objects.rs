use chrono::{DateTime, Utc};
use nvd_common::Paise;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The gateway's server-side representation of a checkout session. This is distinct from (and linked to) the
/// marketplace's own order record via the `receipt` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub status: String,
    #[serde(default)]
    pub notes: Value,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewGatewayOrder {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Envelope of an asynchronous webhook delivery: `{"event": "...", "payload": {"payment": {"entity": {...}}}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    pub payload: WebhookPayload,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<WebhookEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntity {
    pub entity: GatewayPayment,
}

/// A webhook delivery decoded once at the boundary. Raw gateway payloads never travel beyond this point as
/// untyped maps; anything we do not model is carried as `Other` so the ingest can acknowledge it without
/// acting on it.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Captured { order_id: String, payment_id: String, amount: Paise, method: Option<String> },
    Failed { order_id: String, payment_id: String, reason: Option<String> },
    Other(String),
}

impl GatewayEvent {
    /// Decode a verified webhook body. The signature MUST have been checked against the raw bytes before
    /// calling this.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: WebhookEnvelope = serde_json::from_slice(body)?;
        Ok(Self::from(envelope))
    }

    pub fn event_type(&self) -> &str {
        match self {
            GatewayEvent::Captured { .. } => "payment.captured",
            GatewayEvent::Failed { .. } => "payment.failed",
            GatewayEvent::Other(t) => t.as_str(),
        }
    }
}

impl From<WebhookEnvelope> for GatewayEvent {
    fn from(envelope: WebhookEnvelope) -> Self {
        let payment = envelope.payload.payment.map(|p| p.entity);
        match (envelope.event.as_str(), payment) {
            ("payment.captured", Some(p)) => GatewayEvent::Captured {
                order_id: p.order_id,
                payment_id: p.id,
                amount: Paise::from(p.amount),
                method: p.method,
            },
            ("payment.failed", Some(p)) => {
                GatewayEvent::Failed { order_id: p.order_id, payment_id: p.id, reason: p.error_description }
            },
            (other, _) => GatewayEvent::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: i64,
    pub status: String,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod test {
    use super::*;

    const CAPTURED: &str = r#"{
        "event": "payment.captured",
        "payload": { "payment": { "entity": {
            "id": "pay_00000000000001",
            "order_id": "gord_00000000000001",
            "amount": 250000,
            "currency": "INR",
            "status": "captured",
            "method": "upi"
        }}},
        "created_at": 1718000000
    }"#;

    #[test]
    fn decode_captured_event() {
        let event = GatewayEvent::from_slice(CAPTURED.as_bytes()).unwrap();
        match event {
            GatewayEvent::Captured { order_id, payment_id, amount, method } => {
                assert_eq!(order_id, "gord_00000000000001");
                assert_eq!(payment_id, "pay_00000000000001");
                assert_eq!(amount, Paise::from(250000));
                assert_eq!(method.as_deref(), Some("upi"));
            },
            other => panic!("Expected Captured, got {other:?}"),
        }
    }

    #[test]
    fn decode_unknown_event() {
        let body = r#"{"event": "payment.authorized", "payload": {}}"#;
        let event = GatewayEvent::from_slice(body.as_bytes()).unwrap();
        match event {
            GatewayEvent::Other(t) => assert_eq!(t, "payment.authorized"),
            other => panic!("Expected Other, got {other:?}"),
        }
    }
}
