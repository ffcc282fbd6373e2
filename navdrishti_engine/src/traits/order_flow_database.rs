use chrono::Duration;
use nvd_common::Paise;
use thiserror::Error;

use crate::{
    db_types::{NewOrder, NewShipment, NewTrackingEvent, Order, OrderId, OrderStatusType, Payment, ShippingDetail},
    traits::{CancelResult, ConfirmOutcome, FailOutcome, InventoryError, InventoryManagement, OrderManagement, OrderQueryError},
};

/// The write side of the engine: every order state transition in the system goes through an implementation
/// of this trait, and each method is atomic with respect to its side effects — the status change, the
/// inventory mutation, the payment update and the audit row commit together or not at all.
///
/// Idempotency contract: [`confirm_payment`](Self::confirm_payment) and
/// [`fail_payment`](Self::fail_payment) may be invoked any number of times with the same gateway payment
/// id, in any order relative to each other and to the client verify path. Implementations must resolve the
/// winner with conditional updates in the datastore, never with in-memory checks.
#[allow(async_fn_in_trait)]
pub trait OrderFlowDatabase: Clone + OrderManagement + InventoryManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Persist a buyer-initiated order in a single transaction: the order row, one line item per catalog
    /// entry (with a JSON snapshot of the catalog row), the payment row in `Created`, and the first audit
    /// entry. Stock is checked but NOT decremented here; the decrement happens at capture.
    ///
    /// Fails with [`OrderFlowError::AmountMismatch`] if the catalog price moved between the gateway order
    /// being issued and this call.
    async fn create_order(&self, order: NewOrder) -> Result<(Order, Payment), OrderFlowError>;

    /// Record a captured payment and confirm its order. See [`ConfirmOutcome`] for the three ways this can
    /// land. Inventory is decremented exactly once across all invocations for a given gateway payment id.
    async fn confirm_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        method: Option<&str>,
    ) -> Result<ConfirmOutcome, OrderFlowError>;

    /// Record a failed payment attempt. Cancels the order only if it is still `PaymentPending`; a failure
    /// arriving after a successful capture is stale and ignored.
    async fn fail_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        reason: Option<&str>,
    ) -> Result<FailOutcome, OrderFlowError>;

    /// `Confirmed → Processing`. The seller has picked up the order.
    async fn mark_processing(&self, order_id: &OrderId, actor: &str) -> Result<Order, OrderFlowError>;

    /// Persist the carrier waybill and transition `Confirmed`/`Processing` → `Shipped`.
    async fn create_shipment(
        &self,
        order_id: &OrderId,
        shipment: NewShipment,
        actor: &str,
    ) -> Result<(Order, ShippingDetail), OrderFlowError>;

    /// Append a carrier tracking event. A `Delivered` event drives `Shipped → Delivered` and stamps the
    /// actual delivery time; the updated order is returned when that happens. Replayed events (same
    /// status + timestamp) are skipped.
    async fn record_tracking_event(
        &self,
        waybill: &str,
        event: NewTrackingEvent,
    ) -> Result<(ShippingDetail, Option<Order>), OrderFlowError>;

    /// Annul an order from `PaymentPending` or `Confirmed`. Reverses a captured payment in full and
    /// restores inventory if the order had been confirmed.
    async fn cancel_order(&self, order_id: &OrderId, actor: &str, reason: &str) -> Result<CancelResult, OrderFlowError>;

    /// Seller-initiated refund from `Confirmed`, `Processing` or `Shipped`. Requires a captured payment;
    /// `amount` defaults to the full captured amount and may not exceed it. Restores inventory and moves
    /// the order to `Refunded`.
    async fn refund_order(
        &self,
        order_id: &OrderId,
        actor: &str,
        amount: Option<Paise>,
    ) -> Result<(Order, Payment), OrderFlowError>;

    /// Cancel `PaymentPending` orders that have not been touched for longer than `older_than`. This is the
    /// reconciliation pass for the window in which stock was promised at creation but never captured.
    async fn expire_stale_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderFlowError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    Inventory(#[from] InventoryError),
    #[error("{0}")]
    Query(#[from] OrderQueryError),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("No payment exists for gateway order {0}")]
    PaymentNotFound(String),
    #[error("Cannot insert payment, it already exists for gateway order {0}")]
    PaymentAlreadyExists(String),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidStateTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("A buyer cannot purchase their own listing")]
    BuyerIsSeller,
    #[error("An order must contain at least one line item")]
    EmptyOrder,
    #[error("All items in an order must belong to the same seller")]
    MixedSellers,
    #[error("Refund amount must be positive, not {0}")]
    InvalidRefundAmount(Paise),
    #[error("Order total {expected} does not match the gateway order amount {actual}")]
    AmountMismatch { expected: Paise, actual: Paise },
    #[error("Order {0} has no captured payment to refund")]
    PaymentNotCaptured(OrderId),
    #[error("Refund of {requested} exceeds the captured amount {captured}")]
    RefundExceedsCapture { requested: Paise, captured: Paise },
    #[error("A shipment already exists for order {0}")]
    ShipmentAlreadyExists(OrderId),
    #[error("No shipment exists for waybill {0}")]
    ShipmentNotFound(String),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}
