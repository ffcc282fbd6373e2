use std::fmt::Display;

use navdrishti_engine::db_types::{Order, OrderStatusType, Payment, ShippingDetail, TrackingEvent};
use serde::{Deserialize, Serialize};

use crate::integrations::carrier::ShipmentBooking;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub item_id: i64,
    pub quantity: i64,
    pub shipping_address: String,
    #[serde(default)]
    pub billing_address: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderResponse {
    pub order_number: String,
    pub gateway_order_id: String,
    /// Amount in paise, as issued to the gateway.
    pub amount: i64,
    pub currency: String,
}

/// The browser hands this back after completing checkout. The signature covers
/// `gateway_order_id|gateway_payment_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderUpdateRequest {
    pub status: OrderStatusType,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Refund amount in paise. Defaults to the full captured amount.
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShipmentRequest {
    pub order_number: String,
    #[serde(flatten)]
    pub booking: ShipmentBooking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    pub order: Order,
    pub payment: Payment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentResponse {
    pub order: Order,
    pub shipment: ShippingDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingResponse {
    pub shipment: ShippingDetail,
    pub events: Vec<TrackingEvent>,
}
