use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType, ShippingDetail};

/// Emitted once per order when a payment capture confirms it. Replayed webhooks do not re-emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmedEvent {
    pub order: Order,
}

impl OrderConfirmedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when an order is cancelled or refunded. `status` carries which of the two it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatusType,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        let status = order.status;
        Self { order, status }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderShippedEvent {
    pub order: Order,
    pub shipment: ShippingDetail,
}

impl OrderShippedEvent {
    pub fn new(order: Order, shipment: ShippingDetail) -> Self {
        Self { order, shipment }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDeliveredEvent {
    pub order: Order,
}

impl OrderDeliveredEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
