use std::fmt::Debug;

use chrono::Duration;
use log::*;
use nvd_common::Paise;

use crate::{
    api::order_objects::FullOrder,
    db_types::{NewOrder, NewShipment, NewTrackingEvent, Order, OrderId, Payment, ShippingDetail},
    events::{EventProducers, OrderAnnulledEvent, OrderConfirmedEvent, OrderDeliveredEvent, OrderShippedEvent},
    traits::{CancelResult, ConfirmOutcome, FailOutcome, OrderFlowDatabase, OrderFlowError},
};

/// `OrderFlowApi` is the primary API for the order lifecycle. It drives every state transition in response
/// to buyer actions, gateway payment signals and carrier tracking updates, and publishes lifecycle events
/// to subscribers after the owning database transaction has committed.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderFlowDatabase
{
    /// Submit a new buyer-initiated order. The gateway order must already have been issued; its id and
    /// amount travel in `order`. Stock is checked but not decremented here.
    pub async fn place_order(&self, order: NewOrder) -> Result<(Order, Payment), OrderFlowError> {
        let (order, payment) = self.db.create_order(order).await?;
        debug!(
            "🔄️📦️ Order {} placed by {} for {} (gateway order {})",
            order.order_id, order.buyer_id, order.total_amount, payment.gateway_order_id
        );
        Ok((order, payment))
    }

    /// Converge on a captured payment. Both the client verify path and the webhook land here; whichever
    /// arrives second observes [`ConfirmOutcome::AlreadyConfirmed`] and changes nothing.
    pub async fn confirm_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        method: Option<&str>,
    ) -> Result<ConfirmOutcome, OrderFlowError> {
        let outcome = self.db.confirm_payment(gateway_order_id, gateway_payment_id, method).await?;
        match &outcome {
            ConfirmOutcome::Confirmed(order) => {
                debug!("🔄️✅️ Payment [{gateway_payment_id}] captured. Order {} is confirmed", order.order_id);
                self.call_order_confirmed_hook(order).await;
            },
            ConfirmOutcome::AlreadyConfirmed(order) => {
                debug!(
                    "🔄️✅️ Payment [{gateway_payment_id}] was already recorded for order {}. No action taken",
                    order.order_id
                );
            },
            ConfirmOutcome::FlaggedForReconciliation(order) => {
                warn!(
                    "🔄️🚩️ Payment [{gateway_payment_id}] was captured but stock for order {} ran out before \
                     confirmation. The order is flagged for manual reconciliation.",
                    order.order_id
                );
            },
        }
        Ok(outcome)
    }

    /// Record a failed payment attempt. Cancels the order if it is still awaiting payment; stale failures
    /// (arriving after a successful capture) are logged and dropped.
    pub async fn fail_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        reason: Option<&str>,
    ) -> Result<FailOutcome, OrderFlowError> {
        let outcome = self.db.fail_payment(gateway_order_id, gateway_payment_id, reason).await?;
        match &outcome {
            FailOutcome::Cancelled(order) => {
                debug!("🔄️❌️ Payment [{gateway_payment_id}] failed. Order {} cancelled", order.order_id);
                self.call_order_annulled_hook(order).await;
            },
            FailOutcome::Stale(order) => {
                warn!(
                    "🔄️❌️ Received a failure for payment [{gateway_payment_id}] but order {} is already {}. \
                     Ignoring the stale event.",
                    order.order_id, order.status
                );
            },
            FailOutcome::AlreadyResolved(order) => {
                debug!("🔄️❌️ Payment [{gateway_payment_id}] was already marked as failed for order {}", order.order_id);
            },
        }
        Ok(outcome)
    }

    /// The seller acknowledges a confirmed order and starts preparing it.
    pub async fn mark_processing(&self, order_id: &OrderId, actor: &str) -> Result<Order, OrderFlowError> {
        let order = self.db.mark_processing(order_id, actor).await?;
        debug!("🔄️📦️ Order {order_id} marked as processing by {actor}");
        Ok(order)
    }

    /// Persist a carrier waybill for the order and mark it shipped.
    pub async fn create_shipment(
        &self,
        order_id: &OrderId,
        shipment: NewShipment,
        actor: &str,
    ) -> Result<(Order, ShippingDetail), OrderFlowError> {
        let (order, detail) = self.db.create_shipment(order_id, shipment, actor).await?;
        debug!("🔄️🚚️ Order {order_id} shipped with waybill {} via {}", detail.waybill, detail.carrier);
        self.call_order_shipped_hook(&order, &detail).await;
        Ok((order, detail))
    }

    /// Ingest a carrier tracking update. A `Delivered` status closes out the order.
    pub async fn record_tracking_event(
        &self,
        waybill: &str,
        event: NewTrackingEvent,
    ) -> Result<(ShippingDetail, Option<Order>), OrderFlowError> {
        let (detail, delivered) = self.db.record_tracking_event(waybill, event).await?;
        if let Some(order) = &delivered {
            debug!("🔄️🏁️ Order {} delivered (waybill {waybill})", order.order_id);
            self.call_order_delivered_hook(order).await;
        }
        Ok((detail, delivered))
    }

    /// Annul an order before fulfilment. A captured payment is refunded in full and stock is restored.
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        actor: &str,
        reason: &str,
    ) -> Result<CancelResult, OrderFlowError> {
        let result = self.db.cancel_order(order_id, actor, reason).await?;
        debug!("🔄️🛑️ Order {order_id} cancelled by {actor}: {reason}");
        self.call_order_annulled_hook(&result.order).await;
        Ok(result)
    }

    /// Seller-initiated refund of a captured payment. Stock is restored and the order closed as refunded.
    pub async fn refund_order(
        &self,
        order_id: &OrderId,
        actor: &str,
        amount: Option<Paise>,
    ) -> Result<(Order, Payment), OrderFlowError> {
        let (order, payment) = self.db.refund_order(order_id, actor, amount).await?;
        debug!(
            "🔄️↩️ Order {order_id} refunded by {actor}: {} returned",
            payment.refund_amount.unwrap_or(payment.amount)
        );
        self.call_order_annulled_hook(&order).await;
        Ok((order, payment))
    }

    /// Cancel orders that were created but never paid within the timeout window. This is the periodic
    /// reconciliation pass for the creation-to-capture gap, during which no stock is held.
    pub async fn expire_stale_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderFlowError> {
        let expired = self.db.expire_stale_orders(older_than).await?;
        for order in &expired {
            self.call_order_annulled_hook(order).await;
        }
        Ok(expired)
    }

    /// Assemble the complete view of an order: line items, payment, shipment, tracking and audit trail.
    pub async fn full_order(&self, order_id: &OrderId) -> Result<Option<FullOrder>, OrderFlowError> {
        let order = match self.db.fetch_order_by_number(order_id).await? {
            Some(o) => o,
            None => return Ok(None),
        };
        let items = self.db.fetch_order_items(order.id).await?;
        let payment = self.db.fetch_payment_for_order(order.id).await?;
        let shipment = self.db.fetch_shipment_for_order(order.id).await?;
        let tracking_events = match &shipment {
            Some(s) => self.db.fetch_tracking_events(&s.waybill).await?,
            None => Vec::new(),
        };
        let history = self.db.fetch_status_history(order.id).await?;
        Ok(Some(FullOrder { order, items, payment, shipment, tracking_events, history }))
    }

    async fn call_order_confirmed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_confirmed_producer {
            trace!("🔄️📬️ Notifying order confirmed hook subscribers");
            emitter.publish_event(OrderConfirmedEvent::new(order.clone())).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            trace!("🔄️📬️ Notifying order annulled hook subscribers");
            emitter.publish_event(OrderAnnulledEvent::new(order.clone())).await;
        }
    }

    async fn call_order_shipped_hook(&self, order: &Order, shipment: &ShippingDetail) {
        for emitter in &self.producers.order_shipped_producer {
            trace!("🔄️📬️ Notifying order shipped hook subscribers");
            emitter.publish_event(OrderShippedEvent::new(order.clone(), shipment.clone())).await;
        }
    }

    async fn call_order_delivered_hook(&self, order: &Order) {
        for emitter in &self.producers.order_delivered_producer {
            trace!("🔄️📬️ Notifying order delivered hook subscribers");
            emitter.publish_event(OrderDeliveredEvent::new(order.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
