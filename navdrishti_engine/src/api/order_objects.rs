use std::fmt::Display;

use chrono::{DateTime, Utc};
use nvd_common::Paise;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, OrderItem, OrderStatusType, Payment, ShippingDetail, StatusChange, TrackingEvent};

/// Search criteria for orders. All fields are optional and AND-ed together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
    pub status: Option<Vec<OrderStatusType>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn is_empty(&self) -> bool {
        self.order_id.is_none()
            && self.buyer_id.is_none()
            && self.seller_id.is_none()
            && self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
            && self.since.is_none()
            && self.until.is_none()
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_buyer_id<S: Into<String>>(mut self, buyer_id: S) -> Self {
        self.buyer_id = Some(buyer_id.into());
        self
    }

    pub fn with_seller_id<S: Into<String>>(mut self, seller_id: S) -> Self {
        self.seller_id = Some(seller_id.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = vec![];
        if let Some(o) = &self.order_id {
            parts.push(format!("order_id={o}"));
        }
        if let Some(b) = &self.buyer_id {
            parts.push(format!("buyer={b}"));
        }
        if let Some(s) = &self.seller_id {
            parts.push(format!("seller={s}"));
        }
        if let Some(statuses) = &self.status {
            let s = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("|");
            parts.push(format!("status={s}"));
        }
        if let Some(t) = self.since {
            parts.push(format!("since={t}"));
        }
        if let Some(t) = self.until {
            parts.push(format!("until={t}"));
        }
        write!(f, "{}", parts.join(","))
    }
}

/// A list of orders plus their running total, as returned to buyers and sellers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub total_amount: Paise,
    pub orders: Vec<Order>,
}

impl From<Vec<Order>> for OrderResult {
    fn from(orders: Vec<Order>) -> Self {
        let total_amount = orders.iter().map(|o| o.total_amount).sum();
        Self { total_amount, orders }
    }
}

/// Everything hanging off a single order: line items, the payment record, shipment and tracking if they
/// exist, and the full audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
    pub shipment: Option<ShippingDetail>,
    pub tracking_events: Vec<TrackingEvent>,
    pub history: Vec<StatusChange>,
}
