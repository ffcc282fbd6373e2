use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use nvd_common::{Paise, INR_CURRENCY_CODE};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// The public order number, e.g. `NVD-3fa94c01d2`. The internal row id never leaves the database layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// The order lifecycle. `PaymentPending` is the creation state; `Delivered`, `Cancelled` and `Refunded` are
/// terminal. Every transition anywhere in the system must pass [`OrderStatusType::can_transition_to`]; the
/// SQL that applies a transition repeats the source-state guard so concurrent writers resolve in the
/// database, not in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order exists and a gateway order has been issued, but no capture has been recorded.
    PaymentPending,
    /// Payment captured and inventory decremented.
    Confirmed,
    /// The seller has acknowledged the order and is preparing it.
    Processing,
    /// A shipment with a carrier waybill exists.
    Shipped,
    /// The carrier reported delivery.
    Delivered,
    /// Annulled before fulfilment. Captured funds, if any, have been returned.
    Cancelled,
    /// Captured funds returned after confirmation.
    Refunded,
}

impl OrderStatusType {
    /// The transition table. Everything not listed here is an [`InvalidStateTransition`] at the call site.
    pub fn can_transition_to(self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, next),
            (PaymentPending, Confirmed)
                | (PaymentPending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Confirmed, Refunded)
                | (Processing, Shipped)
                | (Processing, Refunded)
                | (Shipped, Delivered)
                | (Shipped, Refunded)
        )
    }

    pub fn is_terminal(self) -> bool {
        use OrderStatusType::*;
        matches!(self, Delivered | Cancelled | Refunded)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::PaymentPending => write!(f, "PaymentPending"),
            OrderStatusType::Confirmed => write!(f, "Confirmed"),
            OrderStatusType::Processing => write!(f, "Processing"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
            OrderStatusType::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PaymentPending" => Ok(Self::PaymentPending),
            "Confirmed" => Ok(Self::Confirmed),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to PaymentPending");
            OrderStatusType::PaymentPending
        })
    }
}

//--------------------------------------  PaymentStatusType    -------------------------------------------------------
/// Lifecycle of a single gateway payment attempt. Exactly one payment per order ever reaches `Captured` or
/// `Refunded`; the upsert that records a capture is keyed on the gateway payment id so replays are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatusType {
    /// Row created alongside the order; a gateway order exists but the buyer has not paid.
    Created,
    /// The gateway has signalled an in-flight attempt.
    Pending,
    Captured,
    Failed,
    Refunded,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Created => write!(f, "Created"),
            PaymentStatusType::Pending => write!(f, "Pending"),
            PaymentStatusType::Captured => write!(f, "Captured"),
            PaymentStatusType::Failed => write!(f, "Failed"),
            PaymentStatusType::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "Pending" => Ok(Self::Pending),
            "Captured" => Ok(Self::Captured),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Created");
            PaymentStatusType::Created
        })
    }
}

//--------------------------------------      ItemStatus       -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ItemStatus {
    Active,
    /// Quantity reached zero through at least one completed sale. Restoring stock flips the item back to
    /// `Active`.
    Sold,
    /// Withdrawn by the seller. Never set by the engine.
    Inactive,
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Active => write!(f, "Active"),
            ItemStatus::Sold => write!(f, "Sold"),
            ItemStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

impl FromStr for ItemStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Sold" => Ok(Self::Sold),
            "Inactive" => Ok(Self::Inactive),
            s => Err(ConversionError(format!("Invalid item status: {s}"))),
        }
    }
}

impl From<String> for ItemStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid item status: {value}. But this conversion cannot fail. Defaulting to Inactive");
            ItemStatus::Inactive
        })
    }
}

//--------------------------------------         Role          -------------------------------------------------------
/// Roles carried in the identity token. Authorization for order transitions is centralised in
/// [`crate::api::guards`]; routes only gate on coarse role membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Seller,
    Admin,
}

pub type Roles = Vec<Role>;

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Seller => write!(f, "Seller"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------    InventoryItem      -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub seller_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Paise,
    pub quantity: i64,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub seller_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Paise,
    pub quantity: i64,
}

impl NewInventoryItem {
    pub fn new<S: Into<String>>(seller_id: S, name: S, price: Paise, quantity: i64) -> Self {
        Self { seller_id: seller_id.into(), name: name.into(), description: None, price, quantity }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub buyer_id: String,
    pub seller_id: String,
    pub status: OrderStatusType,
    pub total_amount: Paise,
    pub currency: String,
    pub shipping_address: String,
    pub billing_address: Option<String>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a new order, before prices have been resolved against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemQuantity {
    pub item_id: i64,
    pub quantity: i64,
}

/// A buyer-initiated purchase, handed to the engine after the gateway order has been issued. Prices are
/// resolved and snapshotted inside the creation transaction; `expected_total` is what the gateway order was
/// issued for and must match the resolved total.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub buyer_id: String,
    pub items: Vec<ItemQuantity>,
    pub shipping_address: String,
    pub billing_address: Option<String>,
    pub memo: Option<String>,
    pub currency: String,
    pub gateway_order_id: String,
    pub expected_total: Paise,
}

impl NewOrder {
    pub fn new(order_id: OrderId, buyer_id: String, items: Vec<ItemQuantity>) -> Self {
        Self {
            order_id,
            buyer_id,
            items,
            shipping_address: String::default(),
            billing_address: None,
            memo: None,
            currency: INR_CURRENCY_CODE.to_string(),
            gateway_order_id: String::default(),
            expected_total: Paise::default(),
        }
    }

    pub fn with_shipping_address<S: Into<String>>(mut self, address: S) -> Self {
        self.shipping_address = address.into();
        self
    }

    pub fn with_billing_address<S: Into<String>>(mut self, address: S) -> Self {
        self.billing_address = Some(address.into());
        self
    }

    pub fn with_memo<S: Into<String>>(mut self, memo: S) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_gateway_order<S: Into<String>>(mut self, gateway_order_id: S, expected_total: Paise) -> Self {
        self.gateway_order_id = gateway_order_id.into();
        self.expected_total = expected_total;
        self
    }
}

//--------------------------------------      OrderItem        -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    pub unit_price: Paise,
    pub total_price: Paise,
    /// JSON copy of the catalog row at purchase time. Later catalog edits never touch historical orders.
    pub item_snapshot: String,
}

//--------------------------------------       Payment         -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount: Paise,
    pub status: PaymentStatusType,
    pub method: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_amount: Option<Paise>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   ShippingDetail      -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ShippingDetail {
    pub id: i64,
    pub order_id: i64,
    pub waybill: String,
    pub carrier: String,
    /// Last carrier-reported status, verbatim. The carrier vocabulary is open-ended; only
    /// [`DELIVERED_TRACKING_STATUS`] has engine-level meaning.
    pub tracking_status: String,
    pub pickup_date: Option<DateTime<Utc>>,
    pub expected_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The carrier status string that drives the `Shipped → Delivered` transition.
pub const DELIVERED_TRACKING_STATUS: &str = "Delivered";

#[derive(Debug, Clone)]
pub struct NewShipment {
    pub carrier: String,
    pub waybill: String,
    pub pickup_date: Option<DateTime<Utc>>,
    pub expected_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: i64,
    pub waybill: String,
    pub status: String,
    pub location: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrackingEvent {
    pub status: String,
    pub location: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl NewTrackingEvent {
    pub fn is_delivery(&self) -> bool {
        self.status == DELIVERED_TRACKING_STATUS
    }
}

//--------------------------------------    StatusChange       -------------------------------------------------------
/// Append-only audit row. Every order transition writes exactly one of these in the same transaction that
/// applies the transition.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: i64,
    pub order_id: i64,
    pub previous_status: Option<OrderStatusType>,
    pub new_status: OrderStatusType,
    pub changed_by: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transition_table_matches_lifecycle() {
        use OrderStatusType::*;
        assert!(PaymentPending.can_transition_to(Confirmed));
        assert!(PaymentPending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Shipped.can_transition_to(Refunded));
        // no resurrection of settled orders
        assert!(!Delivered.can_transition_to(Refunded));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Refunded.can_transition_to(PaymentPending));
        // delivery only from shipped
        assert!(!PaymentPending.can_transition_to(Delivered));
        assert!(!Confirmed.can_transition_to(Delivered));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in ["PaymentPending", "Confirmed", "Processing", "Shipped", "Delivered", "Cancelled", "Refunded"] {
            let status: OrderStatusType = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("Unknown".parse::<OrderStatusType>().is_err());
    }
}
