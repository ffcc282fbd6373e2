use thiserror::Error;

use crate::{
    api::order_objects::OrderQueryFilter,
    db_types::{Order, OrderId, OrderItem, Payment, ShippingDetail, StatusChange, TrackingEvent},
};

/// Read-side access to orders and everything hanging off them. Nothing here mutates state.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order_by_number(&self, order_id: &OrderId) -> Result<Option<Order>, OrderQueryError>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderQueryError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderQueryError>;

    async fn fetch_payment_for_order(&self, order_id: i64) -> Result<Option<Payment>, OrderQueryError>;

    async fn fetch_payment_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, OrderQueryError>;

    async fn fetch_shipment_for_order(&self, order_id: i64) -> Result<Option<ShippingDetail>, OrderQueryError>;

    async fn fetch_shipment_by_waybill(&self, waybill: &str) -> Result<Option<ShippingDetail>, OrderQueryError>;

    async fn fetch_tracking_events(&self, waybill: &str) -> Result<Vec<TrackingEvent>, OrderQueryError>;

    async fn fetch_status_history(&self, order_id: i64) -> Result<Vec<StatusChange>, OrderQueryError>;

    /// Fetches orders according to the criteria in the filter, ordered by `created_at` ascending.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderQueryError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderDoesNotExist(OrderId),
}

impl From<sqlx::Error> for OrderQueryError {
    fn from(e: sqlx::Error) -> Self {
        OrderQueryError::DatabaseError(e.to_string())
    }
}
